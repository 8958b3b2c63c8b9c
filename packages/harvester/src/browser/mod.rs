//! Browser-driven loading of infinite-scroll listing pages.

pub mod chromium;
pub mod loader;

pub use chromium::{ChromiumLauncher, ChromiumSession};
pub use loader::{scroll_until_stable, PageLoader, ScrollOutcome};
