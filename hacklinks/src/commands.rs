use clap::arg;
use hacklinks_scanner::config::DEFAULT_SITE;
use std::path::PathBuf;
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("hacklinks")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("hacklinks")
        .about("Harvest CVE, CWE and report links from HackerOne hacktivity")
        .styles(CLAP_STYLING)
        .arg(
            arg!(--"type" <TYPE>)
                .required(false)
                .help("Which links to collect")
                .value_parser(["all", "cve", "cwe", "disclosed", "undisclosed"])
                .default_value("all"),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .conflicts_with("quiet"),
        )
        .arg(arg!(-q --"quiet" "Suppress banner, progress and non-essential output").required(false))
        .arg(
            arg!(-o --"output-dir" <PATH>)
                .required(false)
                .help("Directory holding the link files")
                .default_value("output"),
        )
        .arg(
            arg!(--"backend" <BACKEND>)
                .required(false)
                .help("chrome renders pages in a headless browser, http fetches static HTML")
                .value_parser(["chrome", "http"])
                .default_value("chrome"),
        )
        .arg(
            arg!(--"chrome-path" <PATH>)
                .required(false)
                .help("Chrome/Chromium executable (default: search well-known paths and PATH)")
                .value_parser(clap::value_parser!(PathBuf))
                .conflicts_with("remote-browser"),
        )
        .arg(
            arg!(--"remote-browser" <URL>)
                .required(false)
                .help("Connect to a running browser's DevTools endpoint, e.g. http://127.0.0.1:9222"),
        )
        .arg(arg!(--"headful" "Show the browser window").required(false))
        .arg(
            arg!(--"max-pages" <N>)
                .required(false)
                .help("Maximum pages visited per category")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("1000"),
        )
        .arg(
            arg!(--"site" <URL>)
                .required(false)
                .help("Base URL of the platform")
                .value_parser(clap::value_parser!(Url))
                .default_value(DEFAULT_SITE),
        )
        .arg(arg!(--"dedup" "Drop duplicate links when loading existing files").required(false))
        .arg(
            arg!(--"log-file" <PATH>)
                .required(false)
                .help("Also append logs to this file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"summary-json" <PATH>)
                .required(false)
                .help("Write the run summary as JSON")
                .value_parser(clap::value_parser!(PathBuf)),
        )
}
