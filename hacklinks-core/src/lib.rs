pub mod harvest;
pub mod report;
pub mod store;

use colored::Colorize;

const BANNER: &str = r#"
    __               __   ___       __
   / /_  ____ ______/ /__/ (_)___  / /_______
  / __ \/ __ `/ ___/ //_/ / / __ \/ //_/ ___/
 / / / / /_/ / /__/ ,< / / / / / / ,< (__  )
/_/ /_/\__,_/\___/_/|_/_/_/_/ /_/_/|_/____/
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} v{}",
        "HackerOne link harvester - CVE, CWE and report links".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("  {}\n", "=".repeat(56).bright_blue());
}
