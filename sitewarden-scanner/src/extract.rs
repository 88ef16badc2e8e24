use crate::error::QueryError;
use crate::page::RenderedPage;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

pub const DEFAULT_NAV_SELECTOR: &str = ".masthead-nav a, nav a";

const SOCIAL_HOSTS: [&str; 4] = ["linkedin.com", "twitter.com", "x.com", "github.com"];

/// A candidate link discovered on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub anchor_text: String,
    /// Where the link was found, e.g. "Main Navigation".
    pub context: String,
}

impl Link {
    pub fn new(url: impl Into<String>, anchor_text: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor_text: anchor_text.into(),
            context: context.into(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Which anchors of a page to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkScope {
    All,
    Navigation { selector: String },
    /// `http(s)` anchors pointing away from `site_host`.
    External { site_host: String },
    SocialContact,
}

impl LinkScope {
    pub fn navigation() -> Self {
        LinkScope::Navigation {
            selector: DEFAULT_NAV_SELECTOR.to_string(),
        }
    }

    pub fn external(site_host: impl Into<String>) -> Self {
        LinkScope::External {
            site_host: site_host.into(),
        }
    }

    pub fn context(&self) -> &'static str {
        match self {
            LinkScope::All => "Page",
            LinkScope::Navigation { .. } => "Main Navigation",
            LinkScope::External { .. } => "External Link",
            LinkScope::SocialContact => "Social Media",
        }
    }

    fn selector(&self) -> &str {
        match self {
            LinkScope::Navigation { selector } => selector,
            _ => "a[href]",
        }
    }

    fn admits(&self, url: &str) -> bool {
        match self {
            LinkScope::All | LinkScope::Navigation { .. } => true,
            LinkScope::External { site_host } => is_external(url, site_host),
            LinkScope::SocialContact => is_social_contact(url),
        }
    }
}

/// Extract links from rendered content in document order.
///
/// Anchors without an `href` are dropped; relative hrefs are resolved
/// against the page URL. Non-network schemes are kept, the verifier decides
/// what to do with them.
pub fn extract_links(page: &RenderedPage, scope: &LinkScope) -> Result<Vec<Link>, QueryError> {
    let elements = page.query_all(scope.selector())?;
    let context = scope.context();

    let links: Vec<Link> = elements
        .iter()
        .filter_map(|element| {
            let href = element.attr("href")?;
            let url = page.resolve(href)?;
            scope
                .admits(&url)
                .then(|| Link::new(url, element.text.clone(), context))
        })
        .collect();

    debug!("Extracted {} link(s) [{}] from {}", links.len(), context, page.url);
    Ok(links)
}

/// `mailto:` links, or a social host (or one of its subdomains).
fn is_social_contact(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.scheme() == "mailto" {
        return true;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    SOCIAL_HOSTS.iter().any(|social| {
        host == *social
            || host
                .strip_suffix(*social)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

fn is_external(url: &str, site_host: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            parsed.host_str().is_some_and(|host| host != site_host)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> RenderedPage {
        RenderedPage::new("https://example.com/", 200).with_html(html)
    }

    #[test]
    fn test_extract_all_in_document_order() {
        let page = page(
            r#"
            <a href="https://www.rust-lang.org">Rust</a>
            <a href="/docs">  Docs </a>
            <a>No href</a>
            <a href="javascript:void(0)">Menu</a>
        "#,
        );
        let links = extract_links(&page, &LinkScope::All).unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(links[0].url, "https://www.rust-lang.org/");
        assert_eq!(links[1].url, "https://example.com/docs");
        assert_eq!(links[1].anchor_text, "Docs");
        assert_eq!(links[2].url, "javascript:void(0)");
        assert!(links.iter().all(|l| l.context == "Page"));
    }

    #[test]
    fn test_extract_navigation_only() {
        let page = page(
            r#"
            <div class="masthead-nav"><a href="/work">Work</a></div>
            <nav><a href="/about.html">About</a></nav>
            <a href="/elsewhere">Elsewhere</a>
        "#,
        );
        let links = extract_links(&page, &LinkScope::navigation()).unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://example.com/work");
        assert_eq!(links[1].url, "https://example.com/about.html");
        assert_eq!(links[0].context, "Main Navigation");
    }

    #[test]
    fn test_extract_external_skips_own_host_and_non_http() {
        let page = page(
            r#"
            <a href="https://example.com/p">Own</a>
            <a href="/relative">Relative</a>
            <a href="https://other.org/x">Other</a>
            <a href="mailto:a@b.com">Mail</a>
        "#,
        );
        let links = extract_links(&page, &LinkScope::external("example.com")).unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://other.org/x");
        assert_eq!(links[0].context, "External Link");
    }

    #[test]
    fn test_extract_social_contact() {
        let page = page(
            r#"
            <a href="https://www.linkedin.com/in/someone">LinkedIn</a>
            <a href="https://github.com/someone">GitHub</a>
            <a href="https://blog.example.com">Blog</a>
            <a href="mailto:someone@example.com">Email</a>
        "#,
        );
        let links = extract_links(&page, &LinkScope::SocialContact).unwrap();

        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.linkedin.com/in/someone",
                "https://github.com/someone",
                "mailto:someone@example.com",
            ]
        );
    }

    #[test]
    fn test_extract_without_content() {
        let page = RenderedPage::new("https://example.com/file.pdf", 200);
        assert_eq!(extract_links(&page, &LinkScope::All), Err(QueryError::NoContent));
    }

    #[test]
    fn test_social_contact_matches_hosts_not_substrings() {
        let page = page(
            r#"
            <a href="https://www.netflix.com/title/1">Netflix</a>
            <a href="https://www.dropbox.com/s/cv.pdf">CV</a>
            <a href="https://example.com/github-stats">Stats</a>
            <a href="https://x.com/someone">X</a>
            <a href="https://mobile.twitter.com/someone">Twitter</a>
            <a href="https://notgithub.com/someone">Lookalike</a>
        "#,
        );
        let links = extract_links(&page, &LinkScope::SocialContact).unwrap();

        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x.com/someone", "https://mobile.twitter.com/someone"]);
        assert!(links.iter().all(|l| l.context == "Social Media"));
    }
}
