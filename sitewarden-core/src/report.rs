// Report generation from a finished crawl run

use crate::aggregator::SeverityCounts;
use crate::crawl::{CrawlState, FinishedRun};
use crate::error::Result;
use crate::model::{Issue, IssueCategory, Severity, TestResults};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const JSON_REPORT_FILE: &str = "bug-report.json";
pub const MARKDOWN_REPORT_FILE: &str = "USABILITY_REPORT.md";
pub const TEXT_REPORT_FILE: &str = "usability-report.txt";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
    All,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            "all" => Some(ReportFormat::All),
            _ => None,
        }
    }

    fn includes(&self, other: ReportFormat) -> bool {
        *self == ReportFormat::All || *self == other
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub run_id: String,
    pub base_url: String,
    pub status: CrawlState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: TestResults,
    pub issues: Vec<Issue>,
    pub severity_counts: SeverityCounts,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<String>,
}

impl ReportData {
    pub fn from_run(run: &FinishedRun) -> Self {
        Self {
            run_id: run.id.to_string(),
            base_url: run.base_url.clone(),
            status: run.final_state,
            started_at: run.started_at,
            finished_at: run.finished_at,
            results: run.summary.results,
            issues: run.summary.issues.clone(),
            severity_counts: run.summary.severity_counts(),
            recommendations: generate_recommendations(&run.summary.results, &run.summary.issues),
            snapshot_dir: None,
        }
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<String>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    fn issues_with(&self, severity: Severity) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .collect()
    }

    fn site_name(&self) -> String {
        url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_else(|| self.base_url.clone())
    }

    fn status_to_string(&self) -> &str {
        match self.status {
            CrawlState::Done => "Completed",
            CrawlState::Aborted => "Aborted",
            CrawlState::Cancelled => "Cancelled",
            _ => "Incomplete",
        }
    }
}

/// Fixed advice derived from what the run found.
pub fn generate_recommendations(results: &TestResults, issues: &[Issue]) -> Vec<String> {
    let has = |category: IssueCategory| issues.iter().any(|issue| issue.category == category);
    let mut recommendations = Vec::new();

    if results.broken_links > 0 {
        recommendations.push("Fix all broken links to improve user experience and SEO".to_string());
    }
    if has(IssueCategory::Accessibility) {
        recommendations.push("Add alt text to all images for better accessibility".to_string());
    }
    if has(IssueCategory::MobileUsability) {
        recommendations.push("Improve mobile responsive design".to_string());
    }
    if has(IssueCategory::Performance) {
        recommendations
            .push("Optimize page load times by compressing images and minifying CSS/JS".to_string());
    }
    recommendations.push("Consider adding a 404 error page".to_string());
    recommendations.push("Add meta descriptions for better SEO".to_string());
    recommendations.push("Implement lazy loading for images".to_string());
    recommendations
}

fn severity_heading(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "CRITICAL BUGS",
        Severity::High => "HIGH PRIORITY BUGS",
        Severity::Medium => "MEDIUM PRIORITY BUGS",
        Severity::Low => "LOW PRIORITY BUGS",
    }
}

fn paint(text: &str, severity: Severity, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match severity {
        Severity::Critical => text.red().bold().to_string(),
        Severity::High => text.red().to_string(),
        Severity::Medium => text.yellow().to_string(),
        Severity::Low => text.green().to_string(),
    }
}

pub fn generate_text_report(data: &ReportData, color: bool) -> String {
    let mut report = String::new();

    // Header
    report.push_str(&format!("{}\n", RULE));
    report.push_str("                     USABILITY EVALUATION & LINK CHECK REPORT\n");
    report.push_str(&format!("{}\n\n", RULE));

    report.push_str(&format!("Run ID:       {}\n", data.run_id));
    report.push_str(&format!("Target:       {}\n", data.base_url));
    report.push_str(&format!("Status:       {}\n", data.status_to_string()));
    report.push_str(&format!(
        "Test Date:    {}\n",
        data.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str(&format!(
        "Duration:     {} seconds\n\n",
        (data.finished_at - data.started_at).num_seconds()
    ));

    // Link results
    report.push_str(&format!("{}\n", RULE));
    report.push_str("LINK TESTING RESULTS\n");
    report.push_str(&format!("{}\n\n", RULE));
    report.push_str(&format!("  Total Links Tested: {}\n", data.results.total_links));
    report.push_str(&format!("  Working Links:      {}\n", data.results.working_links));
    report.push_str(&format!("  Broken Links:       {}\n", data.results.broken_links));
    report.push_str(&format!("  Success Rate:       {:.1}%\n\n", data.results.success_rate()));

    // Bugs
    report.push_str(&format!("{}\n", RULE));
    report.push_str(&format!("BUGS FOUND: {}\n", data.issues.len()));
    report.push_str(&format!("{}\n\n", RULE));

    if data.issues.is_empty() {
        report.push_str("No bugs found! Site is in excellent condition.\n\n");
    } else {
        for severity in Severity::ALL {
            let issues = data.issues_with(severity);
            if issues.is_empty() {
                continue;
            }
            report.push_str(&format!(
                "{} ({})\n",
                paint(severity_heading(severity), severity, color),
                issues.len()
            ));
            for (idx, issue) in issues.iter().enumerate() {
                report.push_str(&format!("   {}. [{}] {}\n", idx + 1, issue.category, issue.message));
            }
            report.push('\n');
        }
    }

    // Recommendations
    report.push_str(&format!("{}\n", RULE));
    report.push_str("RECOMMENDATIONS\n");
    report.push_str(&format!("{}\n\n", RULE));
    for (idx, recommendation) in data.recommendations.iter().enumerate() {
        report.push_str(&format!("  {}. {}\n", idx + 1, recommendation));
    }
    report.push('\n');

    // Footer
    report.push_str(&format!("{}\n", RULE));
    report.push_str("                                  End of Report\n");
    report.push_str(&format!("{}\n", RULE));
    report.push_str("\nGenerated by Sitewarden - website usability crawler and link checker\n\n");

    report
}

pub fn generate_json_report(data: &ReportData) -> std::result::Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "timestamp": data.finished_at.to_rfc3339(),
        "summary": data.results,
        "bugs": data.issues,
        "recommendations": data.recommendations,
        "metadata": {
            "generator": "Sitewarden",
            "version": env!("CARGO_PKG_VERSION"),
            "runId": data.run_id,
            "baseUrl": data.base_url,
            "status": data.status,
            "startedAt": data.started_at.to_rfc3339(),
            "finishedAt": data.finished_at.to_rfc3339(),
            "severityBreakdown": data.severity_counts,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let mut markdown = format!("# Usability Evaluation Report - {}\n\n", data.site_name());
    markdown.push_str(&format!("**Test Date:** {}\n\n", data.started_at.to_rfc3339()));
    markdown.push_str(&format!("**Status:** {}\n\n", data.status_to_string()));

    markdown.push_str("## Summary\n\n");
    markdown.push_str(&format!("- **Total Links Tested:** {}\n", data.results.total_links));
    markdown.push_str(&format!("- **Working Links:** ✅ {}\n", data.results.working_links));
    markdown.push_str(&format!("- **Broken Links:** ❌ {}\n", data.results.broken_links));
    markdown.push_str(&format!("- **Success Rate:** {:.1}%\n", data.results.success_rate()));
    markdown.push_str(&format!("- **Total Bugs Found:** {}\n\n", data.issues.len()));

    markdown.push_str("## Bug Reports\n\n");
    for severity in Severity::ALL {
        let issues = data.issues_with(severity);
        if issues.is_empty() {
            continue;
        }
        markdown.push_str(&format!("### {} Priority ({})\n\n", severity, issues.len()));
        for (idx, issue) in issues.iter().enumerate() {
            markdown.push_str(&format!("{}. **[{}]** {}\n", idx + 1, issue.category, issue.message));
            if let Some(ref screenshot) = issue.screenshot_ref {
                markdown.push_str(&format!("   - Screenshot: {}\n", screenshot));
            }
            markdown.push('\n');
        }
    }

    markdown.push_str("\n## Recommendations\n\n");
    for (idx, recommendation) in data.recommendations.iter().enumerate() {
        markdown.push_str(&format!("{}. {}\n", idx + 1, recommendation));
    }

    if let Some(ref dir) = data.snapshot_dir {
        markdown.push_str("\n## Screenshots\n\n");
        markdown.push_str(&format!("All snapshots saved in: `{}` directory\n", dir));
    }

    markdown
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Write the report files for `format` into `dir`, returning their paths.
pub fn write_reports(data: &ReportData, dir: &Path, format: ReportFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if format.includes(ReportFormat::Json) {
        let path = dir.join(JSON_REPORT_FILE);
        save_report(&generate_json_report(data)?, &path)?;
        written.push(path);
    }
    if format.includes(ReportFormat::Markdown) {
        let path = dir.join(MARKDOWN_REPORT_FILE);
        save_report(&generate_markdown_report(data), &path)?;
        written.push(path);
    }
    if format.includes(ReportFormat::Text) {
        let path = dir.join(TEXT_REPORT_FILE);
        save_report(&generate_text_report(data, false), &path)?;
        written.push(path);
    }

    for path in &written {
        info!("Report written: {}", path.display());
    }
    Ok(written)
}
