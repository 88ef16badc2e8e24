// Notification interface the crawl calls as things happen. Presentation
// (console, logs, progress bars) lives behind it.

use crate::crawl::CrawlState;
use crate::model::{Issue, LinkCheckResult};
use sitewarden_scanner::Link;
use tracing::{debug, info, warn};

pub trait CrawlObserver: Send + Sync {
    fn on_state(&self, _state: CrawlState) {}

    fn on_issue(&self, _issue: &Issue) {}

    fn on_link_checked(&self, _link: &Link, _result: &LinkCheckResult) {}

    fn on_page_evaluated(&self, _page_id: &str) {}
}

pub struct NoopObserver;

impl CrawlObserver for NoopObserver {}

/// Renders crawl events as `tracing` log lines.
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn on_state(&self, state: CrawlState) {
        info!("Crawl state: {}", state.as_str());
    }

    fn on_issue(&self, issue: &Issue) {
        warn!("[{}] {}: {}", issue.severity, issue.category, issue.message);
    }

    fn on_link_checked(&self, link: &Link, result: &LinkCheckResult) {
        if result.is_working() {
            debug!("Link OK: {} -> {}", link.anchor_text, link.url);
        } else {
            debug!("Link {:?}: {} -> {}", result.status, link.anchor_text, link.url);
        }
    }

    fn on_page_evaluated(&self, page_id: &str) {
        info!("Evaluated {}", page_id);
    }
}
