use crate::error::CaptureError;
use crate::page::RenderedPage;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Records what a page looked like when an issue was found.
pub trait ScreenshotCapture: Send + Sync {
    /// Store a capture of `page` under `name` and return a reference to it.
    fn capture(&self, name: &str, page: &RenderedPage) -> Result<String, CaptureError>;
}

/// Writes the rendered HTML of each captured page to `<dir>/<name>.html`.
pub struct SnapshotDirectory {
    dir: PathBuf,
}

impl SnapshotDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ScreenshotCapture for SnapshotDirectory {
    fn capture(&self, name: &str, page: &RenderedPage) -> Result<String, CaptureError> {
        let html = page.html.as_deref().ok_or(CaptureError::NoContent)?;
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(format!("{}.html", sanitize(name)));
        fs::write(&path, html)?;
        debug!("Snapshot: {}", path.display());
        Ok(path.display().to_string())
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "page".to_string()
    } else {
        cleaned
    }
}
