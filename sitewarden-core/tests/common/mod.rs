// In-memory page loader shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sitewarden_scanner::{ImageLoad, LoadError, LoadOptions, LoadOutcome, PageLoader, RenderedPage, Viewport};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

fn key(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Serves canned outcomes by URL and records every load it is asked for.
pub struct FixtureLoader {
    outcomes: HashMap<String, LoadOutcome>,
    viewport_failures: HashMap<(String, Viewport), LoadError>,
    calls: Mutex<Vec<(String, LoadOptions)>>,
    delay: Option<Duration>,
}

impl FixtureLoader {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            viewport_failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn html(self, url: &str, html: &str) -> Self {
        self.page(RenderedPage::new(url, 200).with_html(html))
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.page(RenderedPage::new(url, status).with_html("<html><head><title>Error</title></head></html>"))
    }

    pub fn page(mut self, page: RenderedPage) -> Self {
        self.outcomes.insert(key(&page.url), LoadOutcome::Loaded(page));
        self
    }

    /// Answer requests for `from` with `page`, whose URL is where the
    /// redirect ended up.
    pub fn redirect(mut self, from: &str, page: RenderedPage) -> Self {
        self.outcomes.insert(key(from), LoadOutcome::Loaded(page));
        self
    }

    pub fn failure(mut self, url: &str, error: LoadError) -> Self {
        self.outcomes.insert(key(url), LoadOutcome::Failed(error));
        self
    }

    /// Fail loads of `url` rendered at `viewport` only.
    pub fn viewport_failure(mut self, url: &str, viewport: Viewport, error: LoadError) -> Self {
        self.viewport_failures.insert((key(url), viewport), error);
        self
    }

    pub fn with_image(mut self, page_url: &str, src: &str, load: ImageLoad) -> Self {
        if let Some(LoadOutcome::Loaded(page)) = self.outcomes.remove(&key(page_url)) {
            self.outcomes
                .insert(key(page_url), LoadOutcome::Loaded(page.with_image(src, load)));
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        let wanted = key(url);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| *called == wanted)
            .count()
    }

    pub fn viewports_for(&self, url: &str) -> Vec<(u32, u32)> {
        let wanted = key(url);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| *called == wanted)
            .map(|(_, options)| (options.viewport.width, options.viewport.height))
            .collect()
    }
}

#[async_trait]
impl PageLoader for FixtureLoader {
    async fn load(&self, url: &str, options: &LoadOptions) -> LoadOutcome {
        self.calls.lock().unwrap().push((key(url), *options));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.viewport_failures.get(&(key(url), options.viewport)) {
            return LoadOutcome::Failed(error.clone());
        }
        match self.outcomes.get(&key(url)) {
            Some(LoadOutcome::Loaded(page)) => {
                LoadOutcome::Loaded(page.clone().with_viewport(options.viewport))
            }
            Some(failed) => failed.clone(),
            None => LoadOutcome::Failed(LoadError::Connection(format!("no fixture for {}", url))),
        }
    }
}
