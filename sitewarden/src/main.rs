use colored::Colorize;
use sitewarden::commands::command_argument_builder;
use sitewarden::handlers::{handle_crawl, init_tracing};
use sitewarden_core::crawl::CrawlState;
use sitewarden_core::print_banner;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        // No subcommand provided, just show the banner
        None => ExitCode::SUCCESS,
        Some(("crawl", primary_command)) => {
            init_tracing(primary_command.get_count("verbose"));
            match handle_crawl(primary_command, quiet).await {
                Ok(run) if run.final_state == CrawlState::Aborted => ExitCode::FAILURE,
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("{} {:#}", "✗ Error:".red().bold(), e);
                    ExitCode::FAILURE
                }
            }
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
