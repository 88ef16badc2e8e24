use crate::error::{LoadError, QueryError};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Simulated screen size a page is rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const DESKTOP: Viewport = Viewport::new(1920, 1080);
    pub const MOBILE: Viewport = Viewport::new(375, 667);
    pub const TABLET: Viewport = Viewport::new(768, 1024);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport::DESKTOP
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Per-request knobs passed to a [`crate::PageLoader`].
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub timeout: Duration,
    pub viewport: Viewport,
    /// Fetch sub-resources (images) so their load state can be inspected.
    pub fetch_resources: bool,
}

impl LoadOptions {
    /// Full page load for evaluation.
    pub fn page(timeout: Duration, viewport: Viewport) -> Self {
        Self {
            timeout,
            viewport,
            fetch_resources: true,
        }
    }

    /// Reachability probe: document only.
    pub fn probe(timeout: Duration) -> Self {
        Self {
            timeout,
            viewport: Viewport::DESKTOP,
            fetch_resources: false,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(RenderedPage),
    Failed(LoadError),
}

impl LoadOutcome {
    pub fn page(&self) -> Option<&RenderedPage> {
        match self {
            LoadOutcome::Loaded(page) => Some(page),
            LoadOutcome::Failed(_) => None,
        }
    }
}

/// Load state of an `<img>` source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLoad {
    pub complete: bool,
    /// The response carried decodable image bytes (non-empty, image content type).
    pub has_content: bool,
}

impl ImageLoad {
    pub const OK: ImageLoad = ImageLoad {
        complete: true,
        has_content: true,
    };
    pub const FAILED: ImageLoad = ImageLoad {
        complete: false,
        has_content: false,
    };

    pub fn is_broken(&self) -> bool {
        !self.complete || !self.has_content
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Absolute source URL, empty when the element has no `src`.
    pub src: String,
    pub alt: Option<String>,
    /// `None` when sub-resources were not fetched.
    pub load: Option<ImageLoad>,
}

impl ImageInfo {
    pub fn missing_alt(&self) -> bool {
        self.alt.as_deref().map(str::trim).unwrap_or("").is_empty()
    }

    pub fn is_broken(&self) -> bool {
        self.src.is_empty() || self.load.is_some_and(|load| load.is_broken())
    }
}

/// Owned copy of a matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl ElementSnapshot {
    fn from_element(element: &ElementRef<'_>) -> Self {
        Self {
            tag: element.value().name().to_string(),
            attributes: element
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: collapse_whitespace(&element.text().collect::<String>()),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A loaded page and everything the checks may ask about it.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after redirects.
    pub url: String,
    pub http_status: u16,
    pub content_type: Option<String>,
    /// Document body, `None` for non-HTML responses.
    pub html: Option<String>,
    /// Image load states keyed by absolute source URL.
    pub images: HashMap<String, ImageLoad>,
    pub load_time: Duration,
    pub viewport: Viewport,
}

impl RenderedPage {
    pub fn new(url: impl Into<String>, http_status: u16) -> Self {
        Self {
            url: url.into(),
            http_status,
            content_type: None,
            html: None,
            images: HashMap::new(),
            load_time: Duration::ZERO,
            viewport: Viewport::DESKTOP,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.content_type = Some("text/html".to_string());
        self.html = Some(html.into());
        self
    }

    pub fn with_image(mut self, src: impl Into<String>, load: ImageLoad) -> Self {
        self.images.insert(src.into(), load);
        self
    }

    pub fn with_load_time(mut self, load_time: Duration) -> Self {
        self.load_time = load_time;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn load_time_ms(&self) -> u64 {
        self.load_time.as_millis() as u64
    }

    /// Resolve an `href`/`src` against this page's URL.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let base = Url::parse(&self.url).ok()?;
        base.join(href.trim()).ok().map(|url| url.to_string())
    }

    pub(crate) fn document(&self) -> Result<Html, QueryError> {
        self.html
            .as_deref()
            .map(Html::parse_document)
            .ok_or(QueryError::NoContent)
    }

    pub(crate) fn selector(selector: &str) -> Result<Selector, QueryError> {
        Selector::parse(selector).map_err(|_| QueryError::InvalidSelector(selector.to_string()))
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, QueryError> {
        let selector = Self::selector(selector)?;
        let document = self.document()?;
        Ok(document
            .select(&selector)
            .map(|element| ElementSnapshot::from_element(&element))
            .collect())
    }

    pub fn has_element(&self, selector: &str) -> Result<bool, QueryError> {
        let selector = Self::selector(selector)?;
        let document = self.document()?;
        let found = document.select(&selector).next().is_some();
        Ok(found)
    }

    /// Whitespace-collapsed document title, `None` when there is no `<title>`.
    pub fn title(&self) -> Result<Option<String>, QueryError> {
        let selector = Self::selector("title")?;
        let document = self.document()?;
        let title = document
            .select(&selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()));
        Ok(title)
    }

    pub fn images(&self) -> Result<Vec<ImageInfo>, QueryError> {
        let selector = Self::selector("img")?;
        let document = self.document()?;
        Ok(document
            .select(&selector)
            .map(|element| {
                let src = element
                    .value()
                    .attr("src")
                    .filter(|src| !src.trim().is_empty())
                    .and_then(|src| self.resolve(src))
                    .unwrap_or_default();
                let load = self.images.get(&src).copied();
                ImageInfo {
                    alt: element.value().attr("alt").map(str::to_string),
                    src,
                    load,
                }
            })
            .collect())
    }

    /// Whether the first element matching `selector` would be displayed at
    /// this page's viewport. `None` when nothing matches.
    ///
    /// Honors the `hidden` attribute, inline `display`/`visibility` styles on
    /// the element or its ancestors, and `@media` width rules in `<style>`
    /// blocks that set `display: none` on exactly this selector.
    pub fn element_visibility(&self, selector: &str) -> Result<Option<bool>, QueryError> {
        let parsed = Self::selector(selector)?;
        let style_selector = Self::selector("style")?;
        let document = self.document()?;

        let Some(element) = document.select(&parsed).next() else {
            return Ok(None);
        };

        let hidden_inline = std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .any(|el| is_hidden_inline(&el));
        if hidden_inline {
            return Ok(Some(false));
        }

        let css: String = document
            .select(&style_selector)
            .map(|style| style.text().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Some(!hidden_by_media_rules(&css, selector, self.viewport.width)))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn is_hidden_inline(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let style = compact(style);
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn hidden_by_media_rules(css: &str, selector: &str, width: u32) -> bool {
    let mut rest = css;
    while let Some(pos) = rest.find("@media") {
        let block = &rest[pos..];
        let Some(open) = block.find('{') else {
            break;
        };
        let condition = &block[..open];
        let body_start = open + 1;

        let mut depth = 1usize;
        let mut body_end = None;
        for (i, c) in block[body_start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        body_end = Some(body_start + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(body_end) = body_end else {
            break;
        };

        if media_applies(condition, width) && rule_hides(&block[body_start..body_end], selector) {
            return true;
        }
        rest = &block[body_end + 1..];
    }
    false
}

fn media_applies(condition: &str, width: u32) -> bool {
    let condition = compact(condition);
    let max = px_value(&condition, "max-width:");
    let min = px_value(&condition, "min-width:");
    if max.is_none() && min.is_none() {
        return false;
    }
    max.is_none_or(|max| width <= max) && min.is_none_or(|min| width >= min)
}

fn px_value(condition: &str, key: &str) -> Option<u32> {
    let start = condition.find(key)? + key.len();
    let digits: String = condition[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn rule_hides(body: &str, selector: &str) -> bool {
    let wanted = compact(selector);
    body.split('}').any(|rule| {
        let Some((selectors, declarations)) = rule.split_once('{') else {
            return false;
        };
        selectors.split(',').any(|s| compact(s) == wanted)
            && compact(declarations).contains("display:none")
    })
}
