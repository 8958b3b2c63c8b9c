//! Dynamic page loader: scroll a listing page until its content stops growing.

use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScrollConfig;
use crate::error::LoadResult;
use crate::traits::browser::{BrowserSession, SessionLauncher};

/// Result of a scroll convergence loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub html: String,

    /// Snapshots taken after the initial one
    pub polls: u32,

    /// False when the poll bound was hit before two snapshots matched
    pub converged: bool,
}

/// Scroll and re-read the document until two consecutive snapshots are identical.
pub async fn scroll_until_stable(
    session: &mut dyn BrowserSession,
    config: &ScrollConfig,
) -> LoadResult<ScrollOutcome> {
    let mut previous = session.content().await?;

    for poll in 1..=config.max_polls {
        for _ in 0..config.scrolls_per_poll {
            session.scroll_by(config.step_px).await?;
            tokio::time::sleep(config.pause).await;
        }

        let current = session.content().await?;
        if current == previous {
            debug!(polls = poll, bytes = current.len(), "Page content stabilized");
            return Ok(ScrollOutcome {
                html: current,
                polls: poll,
                converged: true,
            });
        }
        previous = current;
    }

    warn!(
        max_polls = config.max_polls,
        "Page content still changing at poll bound"
    );
    Ok(ScrollOutcome {
        html: previous,
        polls: config.max_polls,
        converged: false,
    })
}

/// Loads listing pages through a fresh browser session per call.
pub struct PageLoader<L: SessionLauncher> {
    launcher: L,
    listing_url: String,
    scroll: ScrollConfig,
}

impl<L: SessionLauncher> PageLoader<L> {
    pub fn new(launcher: L, listing_url: impl Into<String>) -> Self {
        Self {
            launcher,
            listing_url: listing_url.into(),
            scroll: ScrollConfig::default(),
        }
    }

    pub fn with_scroll(mut self, scroll: ScrollConfig) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Listing URL for `page_index`.
    pub fn page_url(&self, page_index: u32) -> LoadResult<String> {
        let mut url = Url::parse(&self.listing_url)?;
        url.query_pairs_mut()
            .append_pair("page", &page_index.to_string());
        Ok(url.to_string())
    }

    /// Load one page and return its fully expanded source.
    ///
    /// Navigation and session errors are returned, not retried. The session is
    /// closed on every path.
    pub async fn load(&self, page_index: u32) -> LoadResult<String> {
        let url = self.page_url(page_index)?;
        let mut session = self.launcher.launch().await?;

        let result = async {
            session.navigate(&url).await?;
            scroll_until_stable(session.as_mut(), &self.scroll).await
        }
        .await;

        if let Err(e) = session.close().await {
            warn!(page = page_index, error = %e, "Browser teardown failed");
        }

        let outcome = result?;
        info!(
            page = page_index,
            polls = outcome.polls,
            converged = outcome.converged,
            bytes = outcome.html.len(),
            "Listing page loaded"
        );
        Ok(outcome.html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::testing::{MockLauncher, ScriptedSession};
    use std::time::Duration;

    fn fast_scroll(max_polls: u32) -> ScrollConfig {
        ScrollConfig {
            max_polls,
            pause: Duration::from_millis(10),
            ..ScrollConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_when_content_repeats() {
        // Grows twice, then repeats: stable after the third poll.
        let mut session = ScriptedSession::new(vec!["a", "ab", "abc", "abc"]);
        let outcome = scroll_until_stable(&mut session, &fast_scroll(100))
            .await
            .unwrap();

        assert_eq!(outcome.html, "abc");
        assert!(outcome.converged);
        assert_eq!(outcome.polls, 3);
        assert_eq!(session.scrolls(), 3 * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_poll_bound() {
        let snapshots: Vec<String> = (0..50).map(|i| "x".repeat(i + 1)).collect();
        let mut session = ScriptedSession::new(snapshots);
        let outcome = scroll_until_stable(&mut session, &fast_scroll(5))
            .await
            .unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.polls, 5);
        assert_eq!(session.reads(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_closes_session_on_success() {
        let launcher = MockLauncher::new().with_session(ScriptedSession::new(vec!["<ul></ul>"]));
        let loader = PageLoader::new(launcher.clone(), "https://example.com/competitions")
            .with_scroll(fast_scroll(10));

        let html = loader.load(3).await.unwrap();

        assert_eq!(html, "<ul></ul>");
        assert_eq!(launcher.closed(), 1);
        assert_eq!(
            launcher.visited(),
            vec!["https://example.com/competitions?page=3".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_closes_session_on_navigation_failure() {
        let launcher =
            MockLauncher::new().with_session(ScriptedSession::new(vec!["x"]).failing_navigation());
        let loader = PageLoader::new(launcher.clone(), "https://example.com/competitions");

        assert!(loader.load(1).await.is_err());
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_closes_session_on_scroll_failure() {
        let launcher = MockLauncher::new()
            .with_session(ScriptedSession::new(vec!["a", "ab"]).failing_scroll());
        let loader = PageLoader::new(launcher.clone(), "https://example.com/competitions")
            .with_scroll(fast_scroll(10));

        let err = loader.load(2).await.unwrap_err();

        assert!(matches!(err, LoadError::Session(_)));
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_closes_session_on_read_failure() {
        let launcher = MockLauncher::new()
            .with_session(ScriptedSession::new(vec!["a"]).failing_content());
        let loader = PageLoader::new(launcher.clone(), "https://example.com/competitions")
            .with_scroll(fast_scroll(10));

        assert!(loader.load(4).await.is_err());
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_propagates() {
        let loader = PageLoader::new(MockLauncher::new(), "https://example.com/competitions");
        assert!(loader.load(1).await.is_err());
    }
}
