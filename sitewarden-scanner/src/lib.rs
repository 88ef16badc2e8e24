pub mod capture;
pub mod error;
pub mod extract;
pub mod loader;
pub mod page;

pub use capture::{ScreenshotCapture, SnapshotDirectory};
pub use error::{CaptureError, LoadError, QueryError, ScanError};
pub use extract::{Link, LinkScope, extract_links};
pub use loader::{HttpPageLoader, PageLoader};
pub use page::{ImageLoad, LoadOptions, LoadOutcome, RenderedPage, Viewport};
