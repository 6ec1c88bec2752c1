use hacklinks::commands::command_argument_builder;
use hacklinks::handlers::{EXIT_FAILURE, handle_harvest, init_logging};
use hacklinks_core::print_banner;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    let log_file = chosen_command.get_one::<PathBuf>("log-file");
    if let Err(e) = init_logging(verbose, quiet, log_file.map(PathBuf::as_path)) {
        eprintln!("{:#}", e);
        std::process::exit(EXIT_FAILURE);
    }

    let code = handle_harvest(&chosen_command).await;
    std::process::exit(code);
}
