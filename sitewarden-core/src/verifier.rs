use crate::aggregator::IssueAggregator;
use crate::model::{Issue, IssueCategory, LinkCheckResult, LinkStatus, Severity};
use futures::stream::{self, StreamExt};
use sitewarden_scanner::{Link, LoadError, LoadOptions, LoadOutcome, PageLoader};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Schemes that never reach the network and are not link checks at all.
const SKIPPED_SCHEMES: [&str; 7] = ["javascript:", "tel:", "sms:", "data:", "about:", "blob:", "file:"];

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

type Memo = HashMap<String, Arc<OnceCell<LinkCheckResult>>>;

/// Checks link reachability, once per normalized URL per run.
///
/// The first caller for a URL performs the check and records its counters
/// and issue; concurrent callers wait on the same cell and every later call
/// gets the identical cached result without recording anything.
pub struct LinkVerifier {
    loader: Arc<dyn PageLoader>,
    aggregator: Arc<IssueAggregator>,
    timeout: Duration,
    concurrency: usize,
    cancel: CancellationToken,
    memo: Mutex<Memo>,
}

impl LinkVerifier {
    pub fn new(loader: Arc<dyn PageLoader>, aggregator: Arc<IssueAggregator>) -> Self {
        Self {
            loader,
            aggregator,
            timeout: DEFAULT_TIMEOUT,
            concurrency: 4,
            cancel: CancellationToken::new(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Verify one link. `None` for links that are not checked at all
    /// (script and other non-network schemes).
    pub async fn verify(&self, link: &Link) -> Option<LinkCheckResult> {
        let (result, performed) = self.check(link).await?;
        if performed {
            self.record(link, &result);
        }
        Some(result)
    }

    /// Verify links concurrently. Results come back in input order and fresh
    /// results are recorded in that same order.
    pub async fn verify_all(&self, links: &[Link]) -> Vec<Option<LinkCheckResult>> {
        let checks: Vec<_> = stream::iter(links)
            .map(|link| self.check(link))
            .buffered(self.concurrency)
            .collect()
            .await;

        links
            .iter()
            .zip(checks)
            .map(|(link, check)| {
                let (result, performed) = check?;
                if performed {
                    self.record(link, &result);
                }
                Some(result)
            })
            .collect()
    }

    /// Number of distinct URLs seen so far.
    pub fn checked_urls(&self) -> usize {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    async fn check(&self, link: &Link) -> Option<(LinkCheckResult, bool)> {
        if is_skipped(&link.url) {
            debug!("Skipping non-network link: {}", link.url);
            return None;
        }

        let key = normalize(&link.url);
        let cell = self
            .memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();

        let performed = AtomicBool::new(false);
        let (flag, key) = (&performed, key.as_str());
        let outcome = cell
            .get_or_try_init(|| async move {
                flag.store(true, Ordering::SeqCst);
                let result = self.perform(key).await;
                // Cancelled checks stay out of the cache so nothing reuses them.
                if result.status == LinkStatus::Cancelled {
                    Err(result)
                } else {
                    Ok(result)
                }
            })
            .await;

        match outcome {
            Ok(result) => Some((result.clone(), performed.load(Ordering::SeqCst))),
            Err(cancelled) => Some((cancelled, false)),
        }
    }

    async fn perform(&self, url: &str) -> LinkCheckResult {
        if is_mail_link(url) {
            return LinkCheckResult::working(url, None);
        }
        if let Err(e) = Url::parse(url) {
            return LinkCheckResult::error(url, LoadError::InvalidUrl(e.to_string()).to_string());
        }

        let options = LoadOptions::probe(self.timeout);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => LinkCheckResult::cancelled(url),
            outcome = tokio::time::timeout(self.timeout, self.loader.load(url, &options)) => {
                match outcome {
                    Err(_) => LinkCheckResult::unreachable(url, LoadError::Timeout(options.timeout_ms()).to_string()),
                    Ok(LoadOutcome::Failed(e)) => LinkCheckResult::unreachable(url, e.to_string()),
                    Ok(LoadOutcome::Loaded(page)) if page.http_status >= 400 => {
                        LinkCheckResult::broken(url, page.http_status)
                    }
                    Ok(LoadOutcome::Loaded(page)) => LinkCheckResult::working(url, Some(page.http_status)),
                }
            }
        }
    }

    fn record(&self, link: &Link, result: &LinkCheckResult) {
        if !self.aggregator.record_link_check(link, result) || !result.is_broken() {
            return;
        }

        let message = match (result.http_status, result.error_message.as_deref()) {
            (Some(status), _) => format!(
                "Link \"{}\" ({}) returns {} - Found in: {}",
                link.anchor_text, link.url, status, link.context
            ),
            (None, error) => format!(
                "Link \"{}\" ({}) failed to load - Error: {} - Found in: {}",
                link.anchor_text,
                link.url,
                error.unwrap_or("unknown error"),
                link.context
            ),
        };
        info!("Broken link: {}", link.url);
        self.aggregator
            .record_issue(Issue::new(Severity::High, IssueCategory::BrokenLink, message));
    }
}

/// Memo key: the URL without its fragment.
pub fn normalize(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.trim().split('#').next().unwrap_or_default().to_string(),
    }
}

fn has_scheme(url: &str, scheme: &str) -> bool {
    url.trim()
        .get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

fn is_skipped(url: &str) -> bool {
    SKIPPED_SCHEMES.iter().any(|scheme| has_scheme(url, scheme))
}

fn is_mail_link(url: &str) -> bool {
    has_scheme(url, "mailto:")
}
