//! Testing utilities including mock implementations.
//!
//! These stand in for the browser, the metadata API, the kernel listing CLI
//! and the checkpoint file so pipeline logic can be tested without a network.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{
    FetchError, FetchResult, HarvestError, ListingError, ListingResult, LoadError, LoadResult,
    Result,
};
use crate::traits::{
    browser::{BrowserSession, SessionLauncher},
    checkpoint::CheckpointStore,
    listing::{KernelListing, KernelPuller},
    metadata::MetadataSource,
};
use crate::types::candidate::{Candidate, SortBy};
use crate::types::checkpoint::Checkpoint;
use crate::types::work::KernelRef;

#[derive(Debug, Default)]
struct SessionLog {
    visited: Vec<String>,
    closed: usize,
}

/// A browser session that replays a fixed sequence of document snapshots.
///
/// Each `content` call returns the next snapshot; the last one repeats once
/// the script runs out.
#[derive(Debug)]
pub struct ScriptedSession {
    snapshots: Vec<String>,
    reads: usize,
    scrolls: usize,
    fail_navigation: bool,
    fail_scroll: bool,
    fail_content: bool,
    log: Option<Arc<RwLock<SessionLog>>>,
}

impl ScriptedSession {
    pub fn new<S: Into<String>>(snapshots: Vec<S>) -> Self {
        Self {
            snapshots: snapshots.into_iter().map(Into::into).collect(),
            reads: 0,
            scrolls: 0,
            fail_navigation: false,
            fail_scroll: false,
            fail_content: false,
            log: None,
        }
    }

    /// Make `navigate` fail.
    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// Make `scroll_by` fail.
    pub fn failing_scroll(mut self) -> Self {
        self.fail_scroll = true;
        self
    }

    /// Make `content` fail.
    pub fn failing_content(mut self) -> Self {
        self.fail_content = true;
        self
    }

    /// Number of `content` calls so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of `scroll_by` calls so far.
    pub fn scrolls(&self) -> usize {
        self.scrolls
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> LoadResult<()> {
        if let Some(log) = &self.log {
            log.write().unwrap().visited.push(url.to_string());
        }
        if self.fail_navigation {
            return Err(LoadError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".into(),
            });
        }
        Ok(())
    }

    async fn scroll_by(&mut self, _pixels: i64) -> LoadResult<()> {
        self.scrolls += 1;
        if self.fail_scroll {
            return Err(LoadError::Session("scripted scroll failure".into()));
        }
        Ok(())
    }

    async fn content(&mut self) -> LoadResult<String> {
        let index = self.reads.min(self.snapshots.len().saturating_sub(1));
        self.reads += 1;
        if self.fail_content {
            return Err(LoadError::Session("scripted content failure".into()));
        }
        self.snapshots
            .get(index)
            .cloned()
            .ok_or_else(|| LoadError::Session("empty script".into()))
    }

    async fn close(&mut self) -> LoadResult<()> {
        if let Some(log) = &self.log {
            log.write().unwrap().closed += 1;
        }
        Ok(())
    }
}

/// Hands out queued [`ScriptedSession`]s and records what they did.
///
/// Clones share state, so a test can keep a handle after moving one into a loader.
#[derive(Clone, Default)]
pub struct MockLauncher {
    sessions: Arc<RwLock<VecDeque<ScriptedSession>>>,
    log: Arc<RwLock<SessionLog>>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session for the next launch.
    pub fn with_session(self, session: ScriptedSession) -> Self {
        self.sessions.write().unwrap().push_back(session);
        self
    }

    /// Number of sessions closed.
    pub fn closed(&self) -> usize {
        self.log.read().unwrap().closed
    }

    /// URLs navigated to, in order.
    pub fn visited(&self) -> Vec<String> {
        self.log.read().unwrap().visited.clone()
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    async fn launch(&self) -> LoadResult<Box<dyn BrowserSession>> {
        let mut session = self
            .sessions
            .write()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LoadError::Launch("no scripted session left".into()))?;
        session.log = Some(self.log.clone());
        Ok(Box::new(session))
    }
}

#[derive(Debug, Default)]
struct MetadataState {
    payloads: HashMap<KernelRef, serde_json::Value>,
    always_failing: HashSet<KernelRef>,
    failures_left: HashMap<KernelRef, u32>,
    attempts: HashMap<KernelRef, u32>,
    order: Vec<KernelRef>,
}

/// A metadata source with canned payloads and scripted failures.
///
/// Keys without a payload answer with HTTP 404.
#[derive(Clone, Default)]
pub struct MockMetadataSource {
    state: Arc<RwLock<MetadataState>>,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(self, key: &KernelRef, payload: serde_json::Value) -> Self {
        self.state
            .write()
            .unwrap()
            .payloads
            .insert(key.clone(), payload);
        self
    }

    /// Every attempt for `key` fails.
    pub fn always_failing(self, key: &KernelRef) -> Self {
        self.state.write().unwrap().always_failing.insert(key.clone());
        self
    }

    /// The first `n` attempts for `key` fail.
    pub fn failing_first(self, key: &KernelRef, n: u32) -> Self {
        self.state
            .write()
            .unwrap()
            .failures_left
            .insert(key.clone(), n);
        self
    }

    /// Attempts made for `key` so far.
    pub fn attempts_for(&self, key: &KernelRef) -> u32 {
        self.state
            .read()
            .unwrap()
            .attempts
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Distinct keys in the order they were first requested.
    pub fn call_order(&self) -> Vec<KernelRef> {
        self.state.read().unwrap().order.clone()
    }
}

#[async_trait]
impl MetadataSource for MockMetadataSource {
    async fn fetch_once(&self, key: &KernelRef) -> FetchResult<serde_json::Value> {
        let mut state = self.state.write().unwrap();
        let attempts = state.attempts.entry(key.clone()).or_insert(0);
        *attempts += 1;
        if *attempts == 1 {
            state.order.push(key.clone());
        }

        if state.always_failing.contains(key) {
            return Err(FetchError::Status {
                status: 500,
                body: "scripted failure".into(),
            });
        }
        if let Some(left) = state.failures_left.get_mut(key) {
            if *left > 0 {
                *left -= 1;
                return Err(FetchError::Status {
                    status: 429,
                    body: "scripted transient failure".into(),
                });
            }
        }

        state
            .payloads
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                body: format!("no payload for {}", key),
            })
    }
}

#[derive(Debug, Default)]
struct ListingState {
    results: HashMap<(String, SortBy), Vec<Candidate>>,
    failing: HashSet<(String, SortBy)>,
    calls: Vec<(String, SortBy, usize)>,
}

/// A kernel listing with canned results per (competition, ranking).
///
/// Unknown queries return an empty list.
#[derive(Clone, Default)]
pub struct MockListing {
    state: Arc<RwLock<ListingState>>,
}

impl MockListing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(
        self,
        competition: impl Into<String>,
        sort_by: SortBy,
        candidates: Vec<Candidate>,
    ) -> Self {
        self.state
            .write()
            .unwrap()
            .results
            .insert((competition.into(), sort_by), candidates);
        self
    }

    pub fn failing(self, competition: impl Into<String>, sort_by: SortBy) -> Self {
        self.state
            .write()
            .unwrap()
            .failing
            .insert((competition.into(), sort_by));
        self
    }

    /// Queries issued so far as (competition, ranking, page size).
    pub fn calls(&self) -> Vec<(String, SortBy, usize)> {
        self.state.read().unwrap().calls.clone()
    }
}

#[async_trait]
impl KernelListing for MockListing {
    async fn list(
        &self,
        competition: &str,
        sort_by: SortBy,
        page_size: usize,
    ) -> ListingResult<Vec<Candidate>> {
        let mut state = self.state.write().unwrap();
        state
            .calls
            .push((competition.to_string(), sort_by, page_size));

        let query = (competition.to_string(), sort_by);
        if state.failing.contains(&query) {
            return Err(ListingError::Command {
                program: "mock".into(),
                code: Some(1),
                stderr: "scripted failure".into(),
            });
        }
        Ok(state
            .results
            .get(&query)
            .map(|c| c.iter().take(page_size).cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
struct PullerState {
    files: HashMap<KernelRef, (String, String)>,
    failures_left: HashMap<KernelRef, u32>,
    attempts: HashMap<KernelRef, u32>,
}

/// A kernel puller that writes canned files into the target directory.
#[derive(Clone, Default)]
pub struct MockPuller {
    state: Arc<RwLock<PullerState>>,
}

impl MockPuller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulling `key` writes `file_name` with `contents`.
    pub fn with_file(
        self,
        key: &KernelRef,
        file_name: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        self.state
            .write()
            .unwrap()
            .files
            .insert(key.clone(), (file_name.into(), contents.into()));
        self
    }

    /// The first `n` pulls of `key` fail.
    pub fn failing_first(self, key: &KernelRef, n: u32) -> Self {
        self.state
            .write()
            .unwrap()
            .failures_left
            .insert(key.clone(), n);
        self
    }

    pub fn attempts_for(&self, key: &KernelRef) -> u32 {
        self.state
            .read()
            .unwrap()
            .attempts
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl KernelPuller for MockPuller {
    async fn pull(&self, key: &KernelRef, dir: &Path) -> ListingResult<PathBuf> {
        let (file_name, contents) = {
            let mut state = self.state.write().unwrap();
            *state.attempts.entry(key.clone()).or_insert(0) += 1;
            if let Some(left) = state.failures_left.get_mut(key) {
                if *left > 0 {
                    *left -= 1;
                    return Err(ListingError::Command {
                        program: "mock".into(),
                        code: Some(1),
                        stderr: "scripted failure".into(),
                    });
                }
            }
            state
                .files
                .get(key)
                .cloned()
                .ok_or_else(|| ListingError::MissingOutput(key.to_string()))?
        };

        std::fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    saved: Vec<Checkpoint>,
    fail_saves: bool,
}

/// Keeps every saved checkpoint in memory.
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save fail.
    pub fn failing_saves(self) -> Self {
        self.state.write().unwrap().fail_saves = true;
        self
    }

    /// All checkpoints saved so far, oldest first.
    pub fn saved(&self) -> Vec<Checkpoint> {
        self.state.read().unwrap().saved.clone()
    }

    /// Processed count of each saved checkpoint.
    pub fn saved_sizes(&self) -> Vec<usize> {
        self.state
            .read()
            .unwrap()
            .saved
            .iter()
            .map(Checkpoint::processed)
            .collect()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_saves {
            return Err(HarvestError::Checkpoint("scripted save failure".into()));
        }
        state.saved.push(checkpoint.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Checkpoint>> {
        Ok(self.state.read().unwrap().saved.last().cloned())
    }
}
