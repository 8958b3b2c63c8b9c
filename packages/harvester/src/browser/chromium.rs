//! Headless Chromium sessions over the DevTools protocol.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::DEFAULT_USER_AGENT;
use crate::error::{LoadError, LoadResult};
use crate::traits::browser::{BrowserSession, SessionLauncher};

/// Launches one headless Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    user_agent: String,
    executable: Option<PathBuf>,
    request_timeout: Duration,
}

impl Default for ChromiumLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            executable: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a specific Chrome/Chromium binary instead of auto-detection.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn browser_config(&self) -> LoadResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.user_agent))
            .request_timeout(self.request_timeout);
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(LoadError::Launch)
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> LoadResult<Box<dyn BrowserSession>> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| LoadError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            page: None,
            handler_task,
        }))
    }
}

/// One browser process with at most one open page.
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    fn page(&self) -> LoadResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| LoadError::Session("no page open".into()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> LoadResult<()> {
        let navigation_error = |e: chromiumoxide::error::CdpError| LoadError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let page = self.browser.new_page(url).await.map_err(navigation_error)?;
        page.wait_for_navigation().await.map_err(navigation_error)?;
        self.page = Some(page);
        Ok(())
    }

    async fn scroll_by(&mut self, pixels: i64) -> LoadResult<()> {
        self.page()?
            .evaluate(format!("window.scrollBy(0, {})", pixels))
            .await
            .map_err(|e| LoadError::Session(e.to_string()))?;
        Ok(())
    }

    async fn content(&mut self) -> LoadResult<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| LoadError::Session(e.to_string()))
    }

    async fn close(&mut self) -> LoadResult<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!(error = %e, "Failed to close page");
            }
        }
        let closed = self.browser.close().await;
        // Reap the process even when the close command failed.
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed to reap browser process");
        }
        self.handler_task.abort();
        closed
            .map(|_| ())
            .map_err(|e| LoadError::Session(e.to_string()))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
