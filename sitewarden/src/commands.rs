use clap::{ArgAction, arg, command};

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitewarden")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitewarden")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site, check its links and evaluate its pages for usability \
                problems. Writes a bug report when done.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Base URL of the site to evaluate"),
                )
                .arg(
                    arg!(-o --"output-dir" <PATH>)
                        .required(false)
                        .help("Directory the reports are written to")
                        .default_value("bugs"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown, all")
                        .value_parser(["text", "json", "markdown", "md", "all"])
                        .default_value("all"),
                )
                .arg(
                    arg!(-s --"snapshots" <PATH>)
                        .required(false)
                        .help("Save a snapshot of each evaluated page to this directory"),
                )
                .arg(
                    arg!(--"timeout" <MS>)
                        .required(false)
                        .help("Per-request timeout in milliseconds")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .default_value("15000"),
                )
                .arg(
                    arg!(--"external-limit" <NUM>)
                        .required(false)
                        .help("How many external homepage links to check")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("How many links are checked at once")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--"about-path" <PATH>)
                        .required(false)
                        .help("Path of the about page, relative to the base URL")
                        .default_value("about.html")
                        .conflicts_with("no-about"),
                )
                .arg(
                    arg!(--"no-about")
                        .required(false)
                        .help("Skip the about page checks")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(-v --"verbose")
                        .required(false)
                        .help("Increase log output (-v info, -vv debug)")
                        .action(ArgAction::Count),
                ),
        )
}
