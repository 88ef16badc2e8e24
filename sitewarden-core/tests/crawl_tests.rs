// Tests for crawl functionality

mod common;

use common::FixtureLoader;
use sitewarden_core::config::CrawlConfig;
use sitewarden_core::crawl::{CrawlState, Crawler, extract_url_path, is_project_link, page_name};
use sitewarden_core::model::{IssueCategory, Severity};
use sitewarden_core::observer::CrawlObserver;
use sitewarden_core::report::ReportData;
use sitewarden_scanner::{LoadError, RenderedPage, SnapshotDirectory, Viewport};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

const BASE: &str = "https://site.test/";

fn head(title: &str) -> String {
    format!(
        r#"<head><title>{}</title><meta name="viewport" content="width=device-width"></head>"#,
        title
    )
}

fn homepage() -> String {
    format!(
        r##"<html>{}<body>
        <nav class="masthead-nav"><a href="/">Home</a><a href="/about.html">About</a></nav>
        <a href="/project1.html">Project One</a>
        <a href="/project2.html">Project Two</a>
        <a href="#contact">Contact</a>
        <a href="https://github.com/jane">GitHub</a>
        <a href="https://broken.example/">Old host</a>
        </body></html>"##,
        head("Jane Doe")
    )
}

fn about() -> String {
    format!(
        r#"<html>{}<body>
        <a href="https://github.com/jane">GitHub</a>
        <a href="mailto:jane@site.test">Email</a>
        <a href="https://www.linkedin.com/in/jane">LinkedIn</a>
        </body></html>"#,
        head("About Jane")
    )
}

fn site() -> FixtureLoader {
    FixtureLoader::new()
        .html(BASE, &homepage())
        .html("https://site.test/about.html", &about())
        .html(
            "https://site.test/project1.html",
            &format!("<html>{}<body></body></html>", head("Project One")),
        )
        .status("https://site.test/project2.html", 404)
        .html("https://github.com/jane", "<title>GitHub</title>")
        .html("https://www.linkedin.com/in/jane", "<title>LinkedIn</title>")
}

const FULL_RUN: [CrawlState; 9] = [
    CrawlState::Init,
    CrawlState::HomepageLoaded,
    CrawlState::NavChecked,
    CrawlState::ProjectsChecked,
    CrawlState::ResponsiveChecked,
    CrawlState::ExternalChecked,
    CrawlState::AboutChecked,
    CrawlState::PerfChecked,
    CrawlState::Done,
];

// ============================================================================
// URL helpers
// ============================================================================

#[test]
fn test_extract_url_path_root() {
    assert_eq!(extract_url_path("http://example.com/"), "/");
    assert_eq!(extract_url_path("http://example.com"), "/");
}

#[test]
fn test_extract_url_path_with_query_and_fragment() {
    assert_eq!(extract_url_path("http://example.com/work/a.html?x=1#top"), "/work/a.html");
}

#[test]
fn test_extract_url_path_invalid_url() {
    assert_eq!(extract_url_path("not a url"), "not a url");
}

#[test]
fn test_page_name() {
    assert_eq!(page_name("https://site.test/project1.html"), "project1.html");
    assert_eq!(page_name("https://site.test/work/case-study/"), "case-study");
    assert_eq!(page_name("https://site.test/"), "index");
}

#[test]
fn test_is_project_link() {
    let base = Url::parse(BASE).unwrap();
    assert!(is_project_link("https://site.test/project1.html", &base));
    assert!(!is_project_link("https://site.test/#contact", &base));
    assert!(!is_project_link("https://github.com/jane", &base));
    assert!(!is_project_link("http://site.test/project1.html", &base));
    assert!(!is_project_link("mailto:jane@site.test", &base));
}

// ============================================================================
// Orchestration
// ============================================================================

#[tokio::test]
async fn test_full_traversal() {
    let loader = Arc::new(site());
    let snapshots = tempfile::tempdir().unwrap();
    let crawler = Crawler::new(CrawlConfig::new(BASE), loader.clone())
        .with_capture(Arc::new(SnapshotDirectory::new(snapshots.path())));

    let run = crawler.run().await.unwrap();

    assert_eq!(run.final_state, CrawlState::Done);
    assert_eq!(run.states, FULL_RUN.to_vec());

    // base, about, project1, project2, github, broken.example, mailto, linkedin
    let results = run.summary.results;
    assert_eq!(results.total_links, 8);
    assert_eq!(results.working_links, 6);
    assert_eq!(results.broken_links, 2);

    let issues = &run.summary.issues;
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().all(|issue| issue.severity == Severity::High));
    assert!(issues.iter().all(|issue| issue.category == IssueCategory::BrokenLink));
    assert!(issues[0].message.contains("/project2.html) returns 404 - Found in: Homepage"));
    assert!(issues[1].message.contains("https://broken.example/"));
    assert!(issues[1].message.contains("Found in: External Link"));

    for name in [
        "01-homepage",
        "page-project1",
        "page-about",
        "02-mobile-view",
        "03-tablet-view",
        "04-about-page",
    ] {
        assert!(
            snapshots.path().join(format!("{}.html", name)).exists(),
            "missing snapshot {}",
            name
        );
    }
    assert!(!snapshots.path().join("page-project2.html").exists());
}

#[tokio::test]
async fn test_homepage_loaded_at_each_viewport() {
    let loader = Arc::new(site());
    Crawler::new(CrawlConfig::new(BASE), loader.clone())
        .run()
        .await
        .unwrap();

    let viewports = loader.viewports_for(BASE);
    assert_eq!(viewports.first(), Some(&(1920, 1080)));
    assert!(viewports.contains(&(375, 667)));
    assert!(viewports.contains(&(768, 1024)));
    // homepage, link probe, mobile, tablet, performance
    assert_eq!(viewports.len(), 5);
}

#[tokio::test]
async fn test_each_url_checked_once() {
    let loader = Arc::new(site());
    Crawler::new(CrawlConfig::new(BASE), loader.clone())
        .run()
        .await
        .unwrap();

    // github.com/jane is linked from the homepage and the about page
    assert_eq!(loader.calls_for("https://github.com/jane"), 1);
    // one probe, one load for evaluation as a project page, one as the about page
    assert_eq!(loader.calls_for("https://site.test/about.html"), 3);
    assert_eq!(loader.calls_for("https://site.test/project2.html"), 1);
}

#[tokio::test]
async fn test_unreachable_homepage_aborts() {
    let loader = Arc::new(FixtureLoader::new());
    let run = Crawler::new(CrawlConfig::new(BASE), loader.clone())
        .run()
        .await
        .unwrap();

    assert!(run.is_aborted());
    assert_eq!(run.states, vec![CrawlState::Init, CrawlState::Aborted]);
    assert_eq!(loader.calls(), 1);

    let issues = &run.summary.issues;
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Critical);
    assert_eq!(issues[0].category, IssueCategory::TestExecution);
    assert!(issues[0].message.starts_with("Test failed: "));
    assert_eq!(run.summary.results.total_links, 0);

    let report = ReportData::from_run(&run);
    assert_eq!(report.severity_counts.critical, 1);
}

#[tokio::test]
async fn test_homepage_error_status_does_not_abort() {
    let loader = Arc::new(FixtureLoader::new().status(BASE, 500));
    let run = Crawler::new(CrawlConfig::new(BASE).with_about_path(None), loader)
        .run()
        .await
        .unwrap();

    assert_eq!(run.final_state, CrawlState::Done);
}

#[tokio::test]
async fn test_external_links_are_capped() {
    let links: String = (0..15)
        .map(|i| format!(r#"<a href="https://ext{}.example/">Ext {}</a>"#, i, i))
        .collect();
    let mut loader = FixtureLoader::new().html(
        BASE,
        &format!("<html>{}<body>{}</body></html>", head("Links"), links),
    );
    for i in 0..15 {
        loader = loader.html(&format!("https://ext{}.example/", i), "<title>Ext</title>");
    }
    let loader = Arc::new(loader);

    let run = Crawler::new(CrawlConfig::new(BASE).with_about_path(None), loader.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(run.summary.results.total_links, 10);
    assert_eq!(loader.calls_for("https://ext9.example/"), 1);
    assert_eq!(loader.calls_for("https://ext10.example/"), 0);
}

#[tokio::test]
async fn test_subpage_load_failure_is_recorded_and_run_continues() {
    let loader = Arc::new(site().viewport_failure(
        BASE,
        Viewport::MOBILE,
        LoadError::Connection("reset".to_string()),
    ));
    let run = Crawler::new(CrawlConfig::new(BASE), loader)
        .run()
        .await
        .unwrap();

    assert_eq!(run.final_state, CrawlState::Done);
    let failure = run
        .summary
        .issues
        .iter()
        .find(|issue| issue.message.contains("Mobile view"))
        .unwrap();
    assert_eq!(failure.severity, Severity::High);
    assert_eq!(failure.category, IssueCategory::BrokenLink);
}

#[tokio::test]
async fn test_about_page_can_be_disabled() {
    let loader = Arc::new(site());
    let run = Crawler::new(CrawlConfig::new(BASE).with_about_path(None), loader.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(run.states, FULL_RUN.to_vec());
    // still reached as a navigation and project link, never as the about step
    assert_eq!(loader.calls_for("https://www.linkedin.com/in/jane"), 0);
}

#[tokio::test]
async fn test_cancelled_run_still_finishes() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let loader = Arc::new(site());

    let run = Crawler::new(CrawlConfig::new(BASE), loader.clone())
        .with_cancellation(cancel)
        .run()
        .await
        .unwrap();

    assert_eq!(run.final_state, CrawlState::Cancelled);
    assert_eq!(run.states, vec![CrawlState::Init, CrawlState::Cancelled]);
    assert_eq!(run.summary.results.total_links, 0);
}

#[tokio::test]
async fn test_invalid_base_url_is_an_error() {
    let loader = Arc::new(FixtureLoader::new());
    let result = Crawler::new(CrawlConfig::new("ftp://site.test"), loader).run().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_slow_homepage_and_desktop_nav_reported_without_snapshots() {
    let homepage = RenderedPage::new(BASE, 200)
        .with_html(format!(
            r#"<html>{}<body><nav class="menu-desktop"><a href="/">Home</a></nav></body></html>"#,
            head("Slow")
        ))
        .with_load_time(Duration::from_millis(6000));
    let loader = Arc::new(FixtureLoader::new().page(homepage));
    // a regular file where the snapshot directory should be
    let blocker = tempfile::NamedTempFile::new().unwrap();

    let run = Crawler::new(CrawlConfig::new(BASE).with_about_path(None), loader)
        .with_capture(Arc::new(SnapshotDirectory::new(blocker.path())))
        .run()
        .await
        .unwrap();

    assert_eq!(run.final_state, CrawlState::Done);
    assert_eq!(run.states, FULL_RUN.to_vec());

    let issues = &run.summary.issues;
    let performance: Vec<_> = issues
        .iter()
        .filter(|issue| issue.category == IssueCategory::Performance)
        .collect();
    assert_eq!(performance.len(), 1);
    assert_eq!(performance[0].severity, Severity::Medium);
    assert_eq!(
        performance[0].message,
        "Homepage load time (6000ms) exceeds recommended 3000ms"
    );

    let navigation = issues
        .iter()
        .find(|issue| issue.message == "Desktop navigation still visible on mobile viewport")
        .unwrap();
    assert_eq!(navigation.severity, Severity::Low);
    assert_eq!(navigation.category, IssueCategory::MobileUsability);

    assert!(issues.iter().all(|issue| issue.screenshot_ref.is_none()));
}

#[tokio::test]
async fn test_same_site_links_follow_homepage_redirect() {
    let landed = RenderedPage::new("https://www.site.test/", 200).with_html(format!(
        r#"<html>{}<body>
        <a href="/work.html">Work</a>
        <a href="https://github.com/jane">GitHub</a>
        </body></html>"#,
        head("Jane Doe")
    ));
    let loader = Arc::new(
        FixtureLoader::new()
            .redirect("http://site.test/", landed)
            .html(
                "https://www.site.test/work.html",
                &format!("<html>{}<body></body></html>", head("Work")),
            )
            .html("https://github.com/jane", "<title>GitHub</title>"),
    );

    let run = Crawler::new(
        CrawlConfig::new("http://site.test/").with_about_path(None),
        loader.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(run.final_state, CrawlState::Done);
    // probed as a project link, then loaded for evaluation
    assert_eq!(loader.calls_for("https://www.site.test/work.html"), 2);
    assert_eq!(loader.calls_for("https://github.com/jane"), 1);
    assert_eq!(run.summary.results.total_links, 2);
    assert_eq!(run.summary.results.working_links, 2);
}

struct StateRecorder(Mutex<Vec<CrawlState>>);

impl CrawlObserver for StateRecorder {
    fn on_state(&self, state: CrawlState) {
        self.0.lock().unwrap().push(state);
    }
}

#[tokio::test]
async fn test_observer_sees_every_state() {
    let recorder = Arc::new(StateRecorder(Mutex::new(Vec::new())));
    let loader = Arc::new(site());

    Crawler::new(CrawlConfig::new(BASE), loader)
        .with_observer(recorder.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(*recorder.0.lock().unwrap(), FULL_RUN.to_vec());
}
