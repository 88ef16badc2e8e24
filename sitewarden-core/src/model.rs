use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal issue classification, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCategory {
    #[serde(rename = "Broken Link")]
    BrokenLink,
    #[serde(rename = "Accessibility")]
    Accessibility,
    #[serde(rename = "Mobile Usability")]
    MobileUsability,
    #[serde(rename = "SEO/Usability")]
    SeoUsability,
    #[serde(rename = "Performance")]
    Performance,
    #[serde(rename = "Broken Resource")]
    BrokenResource,
    #[serde(rename = "Test Execution")]
    TestExecution,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::BrokenLink => "Broken Link",
            IssueCategory::Accessibility => "Accessibility",
            IssueCategory::MobileUsability => "Mobile Usability",
            IssueCategory::SeoUsability => "SEO/Usability",
            IssueCategory::Performance => "Performance",
            IssueCategory::BrokenResource => "Broken Resource",
            IssueCategory::TestExecution => "Test Execution",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_ref: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Issue {
    pub fn new(severity: Severity, category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            screenshot_ref: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_screenshot(mut self, screenshot_ref: Option<&str>) -> Self {
        self.screenshot_ref = screenshot_ref.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Working,
    Broken,
    /// The URL could not be turned into a request at all.
    Error,
    /// The run was cancelled while the check was in flight.
    Cancelled,
}

/// Authoritative outcome of checking one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    pub url: String,
    pub status: LinkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LinkCheckResult {
    pub fn working(url: impl Into<String>, http_status: Option<u16>) -> Self {
        Self {
            url: url.into(),
            status: LinkStatus::Working,
            http_status,
            error_message: None,
        }
    }

    pub fn broken(url: impl Into<String>, http_status: u16) -> Self {
        Self {
            url: url.into(),
            status: LinkStatus::Broken,
            http_status: Some(http_status),
            error_message: None,
        }
    }

    pub fn unreachable(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LinkStatus::Broken,
            http_status: None,
            error_message: Some(error.into()),
        }
    }

    pub fn error(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LinkStatus::Error,
            http_status: None,
            error_message: Some(error.into()),
        }
    }

    pub fn cancelled(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LinkStatus::Cancelled,
            http_status: None,
            error_message: Some("Cancelled".to_string()),
        }
    }

    pub fn is_working(&self) -> bool {
        self.status == LinkStatus::Working
    }

    pub fn is_broken(&self) -> bool {
        matches!(self.status, LinkStatus::Broken | LinkStatus::Error)
    }
}

/// Link counters. Invariant: `total_links == working_links + broken_links`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub total_links: u64,
    pub broken_links: u64,
    pub working_links: u64,
}

impl TestResults {
    /// Count one check. Cancelled checks are not counted.
    pub(crate) fn record(&mut self, result: &LinkCheckResult) -> bool {
        if result.is_working() {
            self.working_links += 1;
        } else if result.is_broken() {
            self.broken_links += 1;
        } else {
            return false;
        }
        self.total_links += 1;
        true
    }

    /// Percentage of working links, 0 when nothing was checked.
    pub fn success_rate(&self) -> f64 {
        if self.total_links == 0 {
            0.0
        } else {
            self.working_links as f64 / self.total_links as f64 * 100.0
        }
    }
}
