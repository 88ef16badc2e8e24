use crate::aggregator::{IssueAggregator, Summary};
use crate::config::CrawlConfig;
use crate::error::Result;
use crate::evaluator::UsabilityEvaluator;
use crate::model::{Issue, IssueCategory, Severity};
use crate::observer::{CrawlObserver, NoopObserver};
use crate::verifier::{LinkVerifier, normalize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitewarden_scanner::{
    Link, LinkScope, LoadError, LoadOptions, LoadOutcome, PageLoader, RenderedPage, ScreenshotCapture,
    Viewport, extract_links,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Progress of a crawl run. Steps only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Init,
    HomepageLoaded,
    NavChecked,
    ProjectsChecked,
    ResponsiveChecked,
    ExternalChecked,
    AboutChecked,
    PerfChecked,
    Done,
    /// The homepage could not be loaded.
    Aborted,
    Cancelled,
}

impl CrawlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlState::Init => "init",
            CrawlState::HomepageLoaded => "homepage loaded",
            CrawlState::NavChecked => "navigation checked",
            CrawlState::ProjectsChecked => "project pages checked",
            CrawlState::ResponsiveChecked => "responsive views checked",
            CrawlState::ExternalChecked => "external links checked",
            CrawlState::AboutChecked => "about page checked",
            CrawlState::PerfChecked => "performance checked",
            CrawlState::Done => "done",
            CrawlState::Aborted => "aborted",
            CrawlState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlState::Done | CrawlState::Aborted | CrawlState::Cancelled)
    }
}

/// A crawl in progress.
pub struct CrawlRun {
    pub id: Uuid,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub state: CrawlState,
    pub history: Vec<CrawlState>,
    pub aggregator: Arc<IssueAggregator>,
}

impl CrawlRun {
    pub fn new(base_url: impl Into<String>, aggregator: Arc<IssueAggregator>) -> Self {
        Self {
            id: Uuid::new_v4(),
            base_url: base_url.into(),
            started_at: Utc::now(),
            state: CrawlState::Init,
            history: vec![CrawlState::Init],
            aggregator,
        }
    }

    fn advance(&mut self, state: CrawlState, observer: &dyn CrawlObserver) {
        debug!("Run {}: {} -> {}", self.id, self.state.as_str(), state.as_str());
        self.state = state;
        self.history.push(state);
        observer.on_state(state);
    }

    pub fn finalize(self) -> FinishedRun {
        FinishedRun {
            id: self.id,
            base_url: self.base_url,
            started_at: self.started_at,
            finished_at: Utc::now(),
            final_state: self.state,
            states: self.history,
            summary: self.aggregator.summary(),
        }
    }
}

/// Immutable record of a completed run, consumed by report generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedRun {
    pub id: Uuid,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub final_state: CrawlState,
    pub states: Vec<CrawlState>,
    pub summary: Summary,
}

impl FinishedRun {
    pub fn is_aborted(&self) -> bool {
        self.final_state == CrawlState::Aborted
    }

    pub fn duration_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Why a traversal stopped before `Done`.
enum Halt {
    Aborted,
    Cancelled,
}

type Step<T = ()> = std::result::Result<T, Halt>;

/// Per-run collaborators, all sharing the run's aggregator.
struct RunContext {
    aggregator: Arc<IssueAggregator>,
    verifier: LinkVerifier,
    evaluator: UsabilityEvaluator,
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Name a page after the last segment of its path, `index` for the root.
pub fn page_name(url: &str) -> String {
    extract_url_path(url)
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("index")
        .to_string()
}

/// Same-origin `http(s)` links without a fragment.
pub fn is_project_link(url: &str, base: &Url) -> bool {
    if url.contains('#') {
        return false;
    }
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.origin() == base.origin(),
        Err(_) => false,
    }
}

/// Drives one crawl over the fixed traversal plan.
pub struct Crawler {
    config: CrawlConfig,
    loader: Arc<dyn PageLoader>,
    capture: Option<Arc<dyn ScreenshotCapture>>,
    observer: Arc<dyn CrawlObserver>,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(config: CrawlConfig, loader: Arc<dyn PageLoader>) -> Self {
        Self {
            config,
            loader,
            capture: None,
            observer: Arc::new(NoopObserver),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_capture(mut self, capture: Arc<dyn ScreenshotCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the crawl to a terminal state. Only invalid configuration is an
    /// error; an unreachable site still yields a finished (aborted) run.
    pub async fn run(&self) -> Result<FinishedRun> {
        let base = self.config.validate()?;
        let aggregator = Arc::new(IssueAggregator::with_observer(self.observer.clone()));
        let mut run = CrawlRun::new(self.config.base_url.clone(), aggregator.clone());
        self.observer.on_state(CrawlState::Init);

        let verifier = LinkVerifier::new(self.loader.clone(), aggregator.clone())
            .with_timeout(self.config.request_timeout())
            .with_concurrency(self.config.concurrency)
            .with_cancellation(self.cancel.clone());
        let evaluator = UsabilityEvaluator::new(aggregator.clone(), &self.config);
        let ctx = RunContext {
            aggregator,
            verifier,
            evaluator,
        };

        info!("Starting crawl {} of {}", run.id, base);
        let final_state = match self.traverse(&mut run, &base, &ctx).await {
            Ok(()) => CrawlState::Done,
            Err(Halt::Aborted) => CrawlState::Aborted,
            Err(Halt::Cancelled) => CrawlState::Cancelled,
        };
        run.advance(final_state, self.observer.as_ref());

        let finished = run.finalize();
        info!(
            "Crawl {} {}: {} links checked, {} issues",
            finished.id,
            finished.final_state.as_str(),
            finished.summary.results.total_links,
            finished.summary.issues.len()
        );
        Ok(finished)
    }

    async fn traverse(&self, run: &mut CrawlRun, base: &Url, ctx: &RunContext) -> Step {
        let base_url = self.config.base_url.as_str();
        let desktop = self.config.desktop_viewport;

        // Homepage
        let homepage = match self.load(base_url, desktop).await? {
            LoadOutcome::Loaded(page) => page,
            LoadOutcome::Failed(e) => {
                warn!("Homepage {} failed to load: {}", base_url, e);
                ctx.aggregator.record_issue(Issue::new(
                    Severity::Critical,
                    IssueCategory::TestExecution,
                    format!("Test failed: {}", e),
                ));
                return Err(Halt::Aborted);
            }
        };
        // Same-site links are judged against where the homepage ended up
        // after redirects.
        let site = Url::parse(&homepage.url).unwrap_or_else(|_| base.clone());
        let shot = self.capture("01-homepage", &homepage);
        ctx.evaluator
            .evaluate("Homepage", &homepage, None, shot.as_deref());
        self.observer.on_page_evaluated("Homepage");
        run.advance(CrawlState::HomepageLoaded, self.observer.as_ref());
        self.checkpoint()?;

        // Navigation
        let nav_scope = LinkScope::Navigation {
            selector: self.config.nav_selector.clone(),
        };
        ctx.verifier
            .verify_all(&self.links(&homepage, &nav_scope))
            .await;
        self.checkpoint()?;
        run.advance(CrawlState::NavChecked, self.observer.as_ref());

        // Project pages
        self.check_project_pages(&homepage, &site, ctx).await?;
        run.advance(CrawlState::ProjectsChecked, self.observer.as_ref());

        // Responsive views
        if let Some(mobile) = self
            .load_for_evaluation(ctx, base_url, self.config.mobile_viewport, "Mobile view")
            .await?
        {
            let shot = self.capture("02-mobile-view", &mobile);
            ctx.evaluator
                .check_mobile_navigation(&mobile, shot.as_deref());
        }
        if let Some(tablet) = self
            .load_for_evaluation(ctx, base_url, self.config.tablet_viewport, "Tablet view")
            .await?
        {
            self.capture("03-tablet-view", &tablet);
        }
        run.advance(CrawlState::ResponsiveChecked, self.observer.as_ref());

        // External links
        let site_host = site.host_str().unwrap_or_default();
        let external: Vec<Link> = self
            .links(&homepage, &LinkScope::external(site_host))
            .into_iter()
            .take(self.config.external_link_limit)
            .collect();
        ctx.verifier.verify_all(&external).await;
        self.checkpoint()?;
        run.advance(CrawlState::ExternalChecked, self.observer.as_ref());

        // About page
        self.check_about_page(ctx).await?;
        run.advance(CrawlState::AboutChecked, self.observer.as_ref());

        // Performance
        if let Some(page) = self
            .load_for_evaluation(ctx, base_url, desktop, "Homepage")
            .await?
        {
            info!("Homepage load time: {}ms", page.load_time_ms());
            ctx.evaluator
                .evaluate_load_time("Homepage", page.load_time_ms());
        }
        run.advance(CrawlState::PerfChecked, self.observer.as_ref());

        Ok(())
    }

    async fn check_project_pages(&self, homepage: &RenderedPage, site: &Url, ctx: &RunContext) -> Step {
        let projects: Vec<Link> = self
            .links(homepage, &LinkScope::All)
            .into_iter()
            .filter(|link| is_project_link(&link.url, site))
            .map(|link| link.with_context("Homepage"))
            .collect();
        debug!("{} project link(s) on homepage", projects.len());

        let mut evaluated = HashSet::from([normalize(&homepage.url)]);
        for link in projects {
            self.checkpoint()?;
            let working = ctx
                .verifier
                .verify(&link)
                .await
                .is_some_and(|result| result.is_working());
            if !working || !evaluated.insert(normalize(&link.url)) {
                continue;
            }

            let name = page_name(&link.url);
            if let Some(page) = self
                .load_for_evaluation(ctx, &link.url, self.config.desktop_viewport, &name)
                .await?
            {
                let shot = self.capture(&format!("page-{}", name.trim_end_matches(".html")), &page);
                ctx.evaluator.evaluate(&name, &page, None, shot.as_deref());
                self.observer.on_page_evaluated(&name);
            }
        }
        Ok(())
    }

    async fn check_about_page(&self, ctx: &RunContext) -> Step {
        let Some(about_url) = self.config.about_url() else {
            debug!("About page check disabled");
            return Ok(());
        };

        let link = Link::new(about_url.as_str(), "About", "Navigation");
        let working = ctx
            .verifier
            .verify(&link)
            .await
            .is_some_and(|result| result.is_working());
        self.checkpoint()?;
        if !working {
            return Ok(());
        }

        let Some(about) = self
            .load_for_evaluation(ctx, &about_url, self.config.desktop_viewport, "About Page")
            .await?
        else {
            return Ok(());
        };
        let shot = self.capture("04-about-page", &about);
        ctx.evaluator
            .evaluate("About Page", &about, None, shot.as_deref());
        self.observer.on_page_evaluated("About Page");

        ctx.verifier
            .verify_all(&self.links(&about, &LinkScope::SocialContact))
            .await;
        self.checkpoint()
    }

    fn checkpoint(&self) -> Step {
        if self.cancel.is_cancelled() {
            info!("Crawl cancelled");
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn load(&self, url: &str, viewport: Viewport) -> Step<LoadOutcome> {
        let options = LoadOptions::page(self.config.request_timeout(), viewport);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halt::Cancelled),
            outcome = tokio::time::timeout(options.timeout, self.loader.load(url, &options)) => {
                Ok(outcome.unwrap_or_else(|_| LoadOutcome::Failed(LoadError::Timeout(options.timeout_ms()))))
            }
        }
    }

    /// Load a page after the homepage. A failure is a broken link, not a
    /// reason to stop.
    async fn load_for_evaluation(
        &self,
        ctx: &RunContext,
        url: &str,
        viewport: Viewport,
        page_id: &str,
    ) -> Step<Option<RenderedPage>> {
        match self.load(url, viewport).await? {
            LoadOutcome::Loaded(page) => Ok(Some(page)),
            LoadOutcome::Failed(e) => {
                warn!("{} ({}) failed to load: {}", page_id, url, e);
                let issue = Issue::new(
                    Severity::High,
                    IssueCategory::BrokenLink,
                    format!("Page \"{}\" ({}) failed to load - Error: {}", page_id, url, e),
                );
                ctx.aggregator.record_issue(issue);
                Ok(None)
            }
        }
    }

    fn links(&self, page: &RenderedPage, scope: &LinkScope) -> Vec<Link> {
        extract_links(page, scope).unwrap_or_else(|e| {
            debug!("No {} links from {}: {}", scope.context(), page.url, e);
            Vec::new()
        })
    }

    fn capture(&self, name: &str, page: &RenderedPage) -> Option<String> {
        let capture = self.capture.as_ref()?;
        match capture.capture(name, page) {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!("Capture '{}' failed: {}", name, e);
                None
            }
        }
    }
}
