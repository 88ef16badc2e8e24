use crate::error::{CrawlError, Result};
use serde::{Deserialize, Serialize};
use sitewarden_scanner::Viewport;
use sitewarden_scanner::extract::DEFAULT_NAV_SELECTOR;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Everything a crawl run can be tuned with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub base_url: String,
    /// How many external homepage links are checked; the rest are ignored.
    pub external_link_limit: usize,
    pub load_time_threshold_ms: u64,
    /// Target cited in performance issues.
    pub recommended_load_time_ms: u64,
    pub request_timeout_ms: u64,
    pub desktop_viewport: Viewport,
    pub mobile_viewport: Viewport,
    pub tablet_viewport: Viewport,
    pub nav_selector: String,
    /// Navigation that should disappear on small screens.
    pub desktop_nav_selector: String,
    /// Path of the about page relative to the base URL, `None` to skip it.
    pub about_path: Option<String>,
    /// Concurrent verifications inside one crawl step.
    pub concurrency: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            external_link_limit: 10,
            load_time_threshold_ms: 5000,
            recommended_load_time_ms: 3000,
            request_timeout_ms: 15_000,
            desktop_viewport: Viewport::DESKTOP,
            mobile_viewport: Viewport::MOBILE,
            tablet_viewport: Viewport::TABLET,
            nav_selector: DEFAULT_NAV_SELECTOR.to_string(),
            desktop_nav_selector: ".menu-desktop".to_string(),
            about_path: Some("about.html".to_string()),
            concurrency: 4,
        }
    }
}

impl CrawlConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_external_link_limit(mut self, limit: usize) -> Self {
        self.external_link_limit = limit;
        self
    }

    pub fn with_load_time_threshold(mut self, threshold_ms: u64) -> Self {
        self.load_time_threshold_ms = threshold_ms;
        self
    }

    pub fn with_recommended_load_time(mut self, recommended_ms: u64) -> Self {
        self.recommended_load_time_ms = recommended_ms;
        self
    }

    pub fn with_request_timeout(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_about_path(mut self, about_path: Option<String>) -> Self {
        self.about_path = about_path;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Parse and check the configuration, returning the base URL.
    pub fn validate(&self) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| CrawlError::InvalidBaseUrl(self.base_url.clone(), e.to_string()))?;

        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(CrawlError::InvalidBaseUrl(
                self.base_url.clone(),
                "expected an http(s) URL with a host".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(CrawlError::InvalidConfig("concurrency must be at least 1".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(CrawlError::InvalidConfig("request timeout must be positive".to_string()));
        }
        Ok(base)
    }

    /// `<base_url>/<about_path>`.
    pub fn about_url(&self) -> Option<String> {
        let path = self.about_path.as_deref()?.trim_start_matches('/');
        Some(format!("{}/{}", self.base_url.trim_end_matches('/'), path))
    }
}
