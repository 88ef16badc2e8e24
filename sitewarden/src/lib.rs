pub mod commands;

// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{ConsoleObserver, build_config, expand_path, handle_crawl, init_tracing, parse_url_line};
