//! Browser session abstraction for the dynamic page loader.

use async_trait::async_trait;

use crate::error::LoadResult;

/// One live browser session (process + page).
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and wait for the initial load.
    async fn navigate(&mut self, url: &str) -> LoadResult<()>;

    /// Scroll the viewport down by `pixels`.
    async fn scroll_by(&mut self, pixels: i64) -> LoadResult<()>;

    /// Current serialized document.
    async fn content(&mut self) -> LoadResult<String>;

    /// Tear the session down. Must be safe to call after any failure.
    async fn close(&mut self) -> LoadResult<()>;
}

/// Starts fresh browser sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> LoadResult<Box<dyn BrowserSession>>;
}
