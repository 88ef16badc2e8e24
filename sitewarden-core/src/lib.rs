pub mod aggregator;
pub mod config;
pub mod crawl;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod observer;
pub mod report;
pub mod verifier;

use colored::Colorize;

pub use aggregator::{IssueAggregator, SeverityCounts, Summary};
pub use config::CrawlConfig;
pub use crawl::{CrawlRun, CrawlState, Crawler, FinishedRun};
pub use error::CrawlError;
pub use evaluator::UsabilityEvaluator;
pub use model::{Issue, IssueCategory, LinkCheckResult, LinkStatus, Severity, TestResults};
pub use observer::{CrawlObserver, NoopObserver, TracingObserver};
pub use report::{ReportData, ReportFormat};
pub use verifier::LinkVerifier;

pub fn print_banner() {
    let banner = r#"
     _ _                              _
 ___(_) |_ _____      ____ _ _ __ __| | ___ _ __
/ __| | __/ _ \ \ /\ / / _` | '__/ _` |/ _ \ '_ \
\__ \ | ||  __/\ V  V / (_| | | | (_| |  __/ | | |
|___/_|\__\___| \_/\_/ \__,_|_|  \__,_|\___|_| |_|
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        "website usability crawler & link checker".dimmed(),
        concat!("v", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
