use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitewarden_core::config::CrawlConfig;
use sitewarden_core::crawl::{CrawlState, Crawler, FinishedRun};
use sitewarden_core::model::{Issue, LinkCheckResult, Severity};
use sitewarden_core::observer::CrawlObserver;
use sitewarden_core::report::{ReportData, ReportFormat, generate_text_report, write_reports};
use sitewarden_scanner::{HttpPageLoader, Link, SnapshotDirectory};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use url::Url;

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();

    // Try to parse as-is. "localhost:8000" parses with a "localhost" scheme,
    // so only web schemes count.
    if let Ok(url) = Url::parse(line) {
        if matches!(url.scheme(), "http" | "https") {
            return Some(line.to_string());
        }
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some() => Some(with_scheme),
        _ => None,
    }
}

/// Expand `~` and environment variables in a user supplied path
pub fn expand_path(path: &str) -> anyhow::Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| format!("Failed to expand path {}", path))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Build the crawl configuration from `crawl` subcommand arguments
pub fn build_config(args: &ArgMatches) -> anyhow::Result<CrawlConfig> {
    let raw_url = args
        .get_one::<String>("url")
        .context("--url is required")?;
    let Some(base_url) = parse_url_line(raw_url) else {
        bail!("Invalid URL '{}'", raw_url);
    };

    let mut config = CrawlConfig::new(base_url);
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        config = config.with_request_timeout(*timeout);
    }
    if let Some(limit) = args.get_one::<usize>("external-limit") {
        config = config.with_external_link_limit(*limit);
    }
    if let Some(threads) = args.get_one::<usize>("threads") {
        config = config.with_concurrency(*threads);
    }
    let about_path = if args.get_flag("no-about") {
        None
    } else {
        args.get_one::<String>("about-path").cloned()
    };
    config = config.with_about_path(about_path);

    config.validate()?;
    Ok(config)
}

/// `-v` count to the most verbose level logged
pub fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn init_tracing(verbosity: u8) {
    // try_init: a subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn severity_marker(severity: Severity) -> colored::ColoredString {
    let label = format!("[{}]", severity);
    let label = label.as_str();
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.cyan(),
    }
}

/// Drives a spinner from crawl events and prints issues as they are found.
pub struct ConsoleObserver {
    spinner: ProgressBar,
    links_checked: AtomicUsize,
    issues_found: AtomicUsize,
}

impl ConsoleObserver {
    pub fn new(quiet: bool) -> Self {
        let spinner = if quiet {
            ProgressBar::hidden()
        } else {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        };
        Self {
            spinner,
            links_checked: AtomicUsize::new(0),
            issues_found: AtomicUsize::new(0),
        }
    }

    pub fn links_checked(&self) -> usize {
        self.links_checked.load(Ordering::Relaxed)
    }

    pub fn issues_found(&self) -> usize {
        self.issues_found.load(Ordering::Relaxed)
    }

    pub fn finish(&self, run: &FinishedRun) {
        let message = match run.final_state {
            CrawlState::Done => {
                let done = format!(
                    "✓ Crawl complete in {}s: {} links checked, {} issues",
                    run.duration_secs(),
                    run.summary.results.total_links,
                    run.summary.issues.len()
                );
                done.as_str().green().to_string()
            }
            CrawlState::Cancelled => "⚠ Crawl cancelled, reporting partial results".yellow().to_string(),
            _ => "✗ Crawl aborted: the homepage could not be loaded".red().bold().to_string(),
        };
        self.spinner.finish_with_message(message);
    }
}

impl CrawlObserver for ConsoleObserver {
    fn on_state(&self, state: CrawlState) {
        if !state.is_terminal() {
            self.spinner.set_message(format!("Crawl step: {}", state.as_str()));
        }
    }

    fn on_issue(&self, issue: &Issue) {
        self.issues_found.fetch_add(1, Ordering::Relaxed);
        self.spinner.println(format!(
            "{} {} {}",
            severity_marker(issue.severity),
            issue.category.as_str().bright_white(),
            issue.message
        ));
    }

    fn on_link_checked(&self, link: &Link, _result: &LinkCheckResult) {
        let checked = self.links_checked.fetch_add(1, Ordering::Relaxed) + 1;
        self.spinner
            .set_message(format!("[{} checked] {}", checked, link.url));
    }

    fn on_page_evaluated(&self, page_id: &str) {
        self.spinner.set_message(format!("Evaluated {}", page_id));
    }
}

/// Run the `crawl` subcommand: crawl, print the report, write report files.
pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> anyhow::Result<FinishedRun> {
    let config = build_config(args)?;
    let output_dir = expand_path(
        args.get_one::<String>("output-dir")
            .map(String::as_str)
            .unwrap_or("bugs"),
    )?;
    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("all");
    let Some(format) = ReportFormat::from_str(format_name) else {
        bail!("Unknown report format '{}'", format_name);
    };
    let snapshots = args
        .get_one::<String>("snapshots")
        .map(|dir| expand_path(dir))
        .transpose()?;

    if !quiet {
        print_divider();
        println!("{} {}", "Target:".bright_white().bold(), config.base_url.cyan());
        println!(
            "{} {}ms, {} concurrent checks, {} external links",
            "Limits:".bright_white().bold(),
            config.request_timeout_ms,
            config.concurrency,
            config.external_link_limit
        );
        println!("{} {}", "Reports:".bright_white().bold(), output_dir.display());
        if let Some(dir) = &snapshots {
            println!("{} {}", "Snapshots:".bright_white().bold(), dir.display());
        }
        print_divider();
    }

    let loader = HttpPageLoader::with_timeout(config.request_timeout())?
        .with_resource_workers(config.concurrency);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping crawl");
                cancel.cancel();
            }
        })
    };

    let observer = Arc::new(ConsoleObserver::new(quiet));
    let mut crawler = Crawler::new(config, Arc::new(loader))
        .with_observer(observer.clone())
        .with_cancellation(cancel);
    if let Some(dir) = &snapshots {
        crawler = crawler.with_capture(Arc::new(SnapshotDirectory::new(dir)));
    }

    let run = crawler.run().await;
    ctrl_c.abort();
    let run = run?;
    observer.finish(&run);

    let mut data = ReportData::from_run(&run);
    if let Some(dir) = &snapshots {
        data = data.with_snapshot_dir(dir.display().to_string());
    }

    if !quiet {
        println!();
        println!("{}", generate_text_report(&data, true));
    }

    let written = write_reports(&data, &output_dir, format)
        .with_context(|| format!("Failed to write reports to {}", output_dir.display()))?;
    for path in &written {
        info!("Report written to {}", path.display());
        if !quiet {
            println!("{} {}", "✓ Report saved:".green(), path.display());
        }
    }

    Ok(run)
}
