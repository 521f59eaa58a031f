//! Engine configuration.
//!
//! Hosts usually deserialize [`EngineConfig`] from their own configuration
//! source; every field falls back to its default when omitted.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum subtask nesting depth (ancestors of the deepest task).
pub const DEFAULT_MAX_SUBTASK_DEPTH: usize = 5;

/// Default number of concurrent notification platform calls per fan-out.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 8;

/// Default number of plan-and-commit attempts for a contended mutation.
pub const DEFAULT_COMMIT_ATTEMPTS: u32 = 3;

/// Tunables for the visibility and notification engine.
///
/// # Examples
///
/// ```
/// use taskshare::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.max_subtask_depth, 5);
///
/// let shallow = EngineConfig::default().with_max_subtask_depth(1);
/// assert_eq!(shallow.max_subtask_depth, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of ancestors a task may have.
    pub max_subtask_depth: usize,
    /// Upper bound on in-flight notification platform calls during fan-out.
    pub fanout_concurrency: usize,
    /// Whether reopen/unarchive re-notifies recipients that still hold an
    /// outstanding ledger entry for the task.
    pub renotify_existing: bool,
    /// Retry policy for transient identity directory failures.
    pub directory_retry: RetryPolicy,
    /// Attempts at re-planning an update or delete whose commit lost a race
    /// with a concurrent mutation of the same task.
    pub commit_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_subtask_depth: DEFAULT_MAX_SUBTASK_DEPTH,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
            renotify_existing: false,
            directory_retry: RetryPolicy::default(),
            commit_attempts: DEFAULT_COMMIT_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Overrides the maximum subtask depth.
    #[must_use]
    pub const fn with_max_subtask_depth(mut self, depth: usize) -> Self {
        self.max_subtask_depth = depth;
        self
    }

    /// Overrides the fan-out concurrency. Zero is clamped to one.
    #[must_use]
    pub fn with_fanout_concurrency(mut self, concurrency: usize) -> Self {
        self.fanout_concurrency = concurrency.max(1);
        self
    }

    /// Overrides the directory retry policy.
    #[must_use]
    pub const fn with_directory_retry(mut self, policy: RetryPolicy) -> Self {
        self.directory_retry = policy;
        self
    }

    /// Overrides the commit attempts. Zero is clamped to one.
    #[must_use]
    pub fn with_commit_attempts(mut self, attempts: u32) -> Self {
        self.commit_attempts = attempts.max(1);
        self
    }

    /// Enables re-notification of recipients with outstanding entries.
    #[must_use]
    pub const fn with_renotify_existing(mut self, renotify: bool) -> Self {
        self.renotify_existing = renotify;
        self
    }
}

/// Exponential backoff policy for retrying transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Cap applied to the doubled delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Retries without sleeping between attempts.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Returns the delay to wait after `previous`, doubling up to the cap.
    #[must_use]
    pub fn next_backoff(&self, previous: Duration) -> Duration {
        previous.saturating_mul(2).min(self.max_backoff)
    }
}
