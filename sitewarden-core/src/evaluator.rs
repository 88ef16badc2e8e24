// Usability checks for loaded pages

use crate::aggregator::IssueAggregator;
use crate::config::CrawlConfig;
use crate::model::{Issue, IssueCategory, Severity};
use sitewarden_scanner::{QueryError, RenderedPage};
use std::sync::Arc;
use tracing::debug;

const MIN_TITLE_LEN: usize = 3;

fn skipped(check: &str, page_id: &str, error: QueryError) -> Vec<Issue> {
    debug!("Skipping {} check for {}: {}", check, page_id, error);
    Vec::new()
}

pub fn check_title(page_id: &str, page: &RenderedPage) -> Vec<Issue> {
    let title = match page.title() {
        Ok(title) => title.unwrap_or_default(),
        Err(e) => return skipped("title", page_id, e),
    };

    if title.chars().count() < MIN_TITLE_LEN {
        vec![Issue::new(
            Severity::Medium,
            IssueCategory::SeoUsability,
            format!("Page \"{}\" has missing or too short title", page_id),
        )]
    } else {
        Vec::new()
    }
}

pub fn check_image_alt_text(page_id: &str, page: &RenderedPage) -> Vec<Issue> {
    let images = match page.images() {
        Ok(images) => images,
        Err(e) => return skipped("alt text", page_id, e),
    };

    let missing = images.iter().filter(|image| image.missing_alt()).count();
    if missing > 0 {
        vec![Issue::new(
            Severity::Medium,
            IssueCategory::Accessibility,
            format!("Page \"{}\" has {} images without alt text", page_id, missing),
        )]
    } else {
        Vec::new()
    }
}

pub fn check_broken_images(page_id: &str, page: &RenderedPage) -> Vec<Issue> {
    let images = match page.images() {
        Ok(images) => images,
        Err(e) => return skipped("broken image", page_id, e),
    };

    let broken: Vec<&str> = images
        .iter()
        .filter(|image| image.is_broken())
        .map(|image| if image.src.is_empty() { "(no src)" } else { image.src.as_str() })
        .collect();

    if broken.is_empty() {
        return Vec::new();
    }
    vec![Issue::new(
        Severity::High,
        IssueCategory::BrokenResource,
        format!(
            "Page \"{}\" has {} broken images: {}",
            page_id,
            broken.len(),
            broken.join(", ")
        ),
    )]
}

pub fn check_viewport_meta(page_id: &str, page: &RenderedPage) -> Vec<Issue> {
    match page.has_element("meta[name=\"viewport\"]") {
        Ok(true) => Vec::new(),
        Ok(false) => vec![Issue::new(
            Severity::Low,
            IssueCategory::MobileUsability,
            format!("Page \"{}\" missing viewport meta tag for mobile responsiveness", page_id),
        )],
        Err(e) => skipped("viewport meta", page_id, e),
    }
}

/// Desktop-only navigation should be hidden at a mobile viewport.
pub fn check_desktop_navigation(page: &RenderedPage, desktop_nav_selector: &str) -> Vec<Issue> {
    match page.element_visibility(desktop_nav_selector) {
        Ok(Some(true)) => vec![Issue::new(
            Severity::Low,
            IssueCategory::MobileUsability,
            "Desktop navigation still visible on mobile viewport",
        )],
        Ok(_) => Vec::new(),
        Err(e) => skipped("desktop navigation", &page.url, e),
    }
}

pub fn check_load_time(page_id: &str, load_time_ms: u64, threshold_ms: u64, recommended_ms: u64) -> Vec<Issue> {
    if load_time_ms > threshold_ms {
        vec![Issue::new(
            Severity::Medium,
            IssueCategory::Performance,
            format!(
                "{} load time ({}ms) exceeds recommended {}ms",
                page_id, load_time_ms, recommended_ms
            ),
        )]
    } else {
        Vec::new()
    }
}

/// Runs the page checks and records what they find.
pub struct UsabilityEvaluator {
    aggregator: Arc<IssueAggregator>,
    load_time_threshold_ms: u64,
    recommended_load_time_ms: u64,
    desktop_nav_selector: String,
}

impl UsabilityEvaluator {
    pub fn new(aggregator: Arc<IssueAggregator>, config: &CrawlConfig) -> Self {
        Self {
            aggregator,
            load_time_threshold_ms: config.load_time_threshold_ms,
            recommended_load_time_ms: config.recommended_load_time_ms,
            desktop_nav_selector: config.desktop_nav_selector.clone(),
        }
    }

    /// Run every per-page check. `load_time_ms` enables the performance
    /// check; `screenshot_ref` is attached to each issue.
    pub fn evaluate(
        &self,
        page_id: &str,
        page: &RenderedPage,
        load_time_ms: Option<u64>,
        screenshot_ref: Option<&str>,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();
        issues.extend(check_title(page_id, page));
        issues.extend(check_image_alt_text(page_id, page));
        issues.extend(check_broken_images(page_id, page));
        issues.extend(check_viewport_meta(page_id, page));
        if let Some(ms) = load_time_ms {
            issues.extend(self.load_time_issues(page_id, ms));
        }
        self.record(issues, screenshot_ref)
    }

    /// Mobile pass only: desktop navigation visibility.
    pub fn check_mobile_navigation(&self, page: &RenderedPage, screenshot_ref: Option<&str>) -> Vec<Issue> {
        let issues = check_desktop_navigation(page, &self.desktop_nav_selector);
        self.record(issues, screenshot_ref)
    }

    pub fn evaluate_load_time(&self, page_id: &str, load_time_ms: u64) -> Vec<Issue> {
        let issues = self.load_time_issues(page_id, load_time_ms);
        self.record(issues, None)
    }

    fn load_time_issues(&self, page_id: &str, load_time_ms: u64) -> Vec<Issue> {
        check_load_time(
            page_id,
            load_time_ms,
            self.load_time_threshold_ms,
            self.recommended_load_time_ms,
        )
    }

    fn record(&self, issues: Vec<Issue>, screenshot_ref: Option<&str>) -> Vec<Issue> {
        issues
            .into_iter()
            .map(|issue| {
                let issue = issue.with_screenshot(screenshot_ref);
                self.aggregator.record_issue(issue.clone());
                issue
            })
            .collect()
    }
}
