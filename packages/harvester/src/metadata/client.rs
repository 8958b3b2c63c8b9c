//! Retrying metadata client.

use tracing::info;

use crate::retry::{retry, RetryOutcome, RetryPolicy};
use crate::traits::metadata::MetadataSource;
use crate::types::work::KernelRef;

/// Terminal result of fetching one key.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Resolved {
        payload: serde_json::Value,
        attempts: u32,
    },
    /// Every attempt failed; the caller records `key` as failed and moves on
    Exhausted {
        key: KernelRef,
        attempts: u32,
        last_error: String,
    },
}

impl FetchOutcome {
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            FetchOutcome::Resolved { payload, .. } => Some(payload),
            FetchOutcome::Exhausted { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<serde_json::Value> {
        match self {
            FetchOutcome::Resolved { payload, .. } => Some(payload),
            FetchOutcome::Exhausted { .. } => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchOutcome::Exhausted { .. })
    }
}

/// Best public score from a view-model payload.
///
/// Reads `kernel.bestPublicScore`; any other shape yields `None`.
pub fn best_public_score(payload: &serde_json::Value) -> Option<f64> {
    let score = payload.get("kernel")?.get("bestPublicScore")?;
    score
        .as_f64()
        .or_else(|| score.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Wraps a [`MetadataSource`] with the shared retry policy.
pub struct MetadataClient<S: MetadataSource> {
    source: S,
    policy: RetryPolicy,
}

impl<S: MetadataSource> MetadataClient<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch metadata for `key`. Never fails: exhaustion is an outcome.
    pub async fn fetch(&self, key: &KernelRef) -> FetchOutcome {
        let label = key.to_string();
        match retry(&self.policy, &label, |_| self.source.fetch_once(key)).await {
            RetryOutcome::Succeeded { value, attempts } => {
                if attempts > 1 {
                    info!(key = %key, attempts, "Fetched after retries");
                }
                FetchOutcome::Resolved {
                    payload: value,
                    attempts,
                }
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error,
                ..
            } => FetchOutcome::Exhausted {
                key: key.clone(),
                attempts,
                last_error,
            },
        }
    }
}
