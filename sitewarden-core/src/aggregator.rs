use crate::model::{Issue, LinkCheckResult, Severity, TestResults};
use crate::observer::{CrawlObserver, NoopObserver};
use serde::{Deserialize, Serialize};
use sitewarden_scanner::Link;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct AggregatorState {
    results: TestResults,
    issues: Vec<Issue>,
}

/// Owns every issue and link counter of one crawl run.
///
/// All recording goes through a single lock, so concurrent verifications
/// and page evaluations never lose or double-count an update. Observer
/// callbacks run after the lock is released.
pub struct IssueAggregator {
    state: Mutex<AggregatorState>,
    observer: Arc<dyn CrawlObserver>,
}

impl IssueAggregator {
    pub fn new() -> Self {
        Self::with_observer(Arc::new(NoopObserver))
    }

    pub fn with_observer(observer: Arc<dyn CrawlObserver>) -> Self {
        Self {
            state: Mutex::new(AggregatorState::default()),
            observer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_issue(&self, issue: Issue) {
        self.lock().issues.push(issue.clone());
        self.observer.on_issue(&issue);
    }

    /// Count a performed link check. Returns false for outcomes that are
    /// not counted (cancelled checks).
    pub fn record_link_check(&self, link: &Link, result: &LinkCheckResult) -> bool {
        let counted = self.lock().results.record(result);
        if counted {
            self.observer.on_link_checked(link, result);
        }
        counted
    }

    pub fn results(&self) -> TestResults {
        self.lock().results
    }

    pub fn summary(&self) -> Summary {
        let state = self.lock();
        Summary {
            results: state.results,
            issues: state.issues.clone(),
        }
    }
}

impl Default for IssueAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Point-in-time view of an aggregator. Issues keep recording order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub results: TestResults,
    pub issues: Vec<Issue>,
}

impl Summary {
    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.severity == severity)
    }

    /// Non-empty severity groups, most severe first.
    pub fn grouped(&self) -> Vec<(Severity, Vec<&Issue>)> {
        Severity::ALL
            .iter()
            .map(|&severity| (severity, self.issues_with(severity).collect::<Vec<_>>()))
            .filter(|(_, issues)| !issues.is_empty())
            .collect()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for issue in &self.issues {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }
}
