use crate::error::{LoadError, Result};
use crate::page::{ImageLoad, LoadOptions, LoadOutcome, RenderedPage, Viewport};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use scraper::Html;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const DESKTOP_AGENT: &str = "Sitewarden/0.1 (+https://github.com/trapdoorsec/sitewarden)";
const MOBILE_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Sitewarden/0.1 Mobile";

/// Capability to load a URL and hand back its rendered content.
///
/// Implementations must honor `options.timeout` and report expiry as
/// [`LoadError::Timeout`] instead of blocking.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, url: &str, options: &LoadOptions) -> LoadOutcome;
}

/// [`PageLoader`] backed by plain HTTP requests and static HTML parsing.
pub struct HttpPageLoader {
    client: Client,
    resource_workers: usize,
}

impl HttpPageLoader {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(15))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(DESKTOP_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            resource_workers: 8,
        })
    }

    pub fn with_resource_workers(mut self, workers: usize) -> Self {
        self.resource_workers = workers.max(1);
        self
    }

    async fn fetch(&self, url: &str, options: &LoadOptions) -> std::result::Result<RenderedPage, LoadError> {
        let parsed = Url::parse(url).map_err(|e| LoadError::InvalidUrl(format!("{}: {}", url, e)))?;
        let timeout_ms = options.timeout_ms();
        let started = Instant::now();

        debug!("Loading {} at {}", parsed, options.viewport);
        let response = self
            .client
            .get(parsed)
            .header(USER_AGENT, agent_for(options.viewport))
            .send()
            .await
            .map_err(|e| LoadError::from_reqwest(&e, timeout_ms))?;

        let final_url = response.url().to_string();
        let http_status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .map_err(|e| LoadError::from_reqwest(&e, timeout_ms))?;

        let is_html = content_type
            .as_ref()
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        let mut page = RenderedPage::new(final_url, http_status).with_viewport(options.viewport);
        page.content_type = content_type;

        if is_html {
            if options.fetch_resources {
                let sources = image_sources(&body, &page.url);
                page.images = self.probe_images(sources, timeout_ms).await;
            }
            page.html = Some(body);
        }

        page.load_time = started.elapsed();
        debug!(
            "Loaded {} [{}] in {}ms ({} image(s))",
            page.url,
            page.http_status,
            page.load_time_ms(),
            page.images.len()
        );
        Ok(page)
    }

    async fn probe_images(&self, sources: Vec<String>, timeout_ms: u64) -> HashMap<String, ImageLoad> {
        stream::iter(sources)
            .map(|src| async move {
                let load = self.probe_image(&src, timeout_ms).await;
                (src, load)
            })
            .buffer_unordered(self.resource_workers)
            .collect()
            .await
    }

    async fn probe_image(&self, src: &str, timeout_ms: u64) -> ImageLoad {
        if src.starts_with("data:") {
            return ImageLoad::OK;
        }

        let response = match self.client.get(src).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Image {} failed: {}", src, LoadError::from_reqwest(&e, timeout_ms));
                return ImageLoad::FAILED;
            }
        };

        if !response.status().is_success() {
            return ImageLoad::FAILED;
        }

        let is_image = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(true);

        match response.bytes().await {
            Ok(bytes) => ImageLoad {
                complete: true,
                has_content: is_image && !bytes.is_empty(),
            },
            Err(_) => ImageLoad::FAILED,
        }
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, url: &str, options: &LoadOptions) -> LoadOutcome {
        match tokio::time::timeout(options.timeout, self.fetch(url, options)).await {
            Ok(Ok(page)) => LoadOutcome::Loaded(page),
            Ok(Err(e)) => {
                warn!("Failed to load {}: {}", url, e);
                LoadOutcome::Failed(e)
            }
            Err(_) => {
                warn!("Timed out loading {} after {}ms", url, options.timeout_ms());
                LoadOutcome::Failed(LoadError::Timeout(options.timeout_ms()))
            }
        }
    }
}

fn agent_for(viewport: Viewport) -> &'static str {
    if viewport.width < Viewport::TABLET.width {
        MOBILE_AGENT
    } else {
        DESKTOP_AGENT
    }
}

/// Absolute, de-duplicated `<img src>` URLs in document order.
fn image_sources(html: &str, page_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let Ok(selector) = scraper::Selector::parse("img[src]") else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut sources = Vec::new();
    for element in document.select(&selector) {
        if let Some(src) = element.value().attr("src")
            && !src.trim().is_empty()
            && let Ok(resolved) = base.join(src.trim())
        {
            let resolved = resolved.to_string();
            if !sources.contains(&resolved) {
                sources.push(resolved);
            }
        }
    }
    sources
}
