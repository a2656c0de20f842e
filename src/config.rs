//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::context::ContextBound;

/// Configuration for the graph construction pipeline.
///
/// ## Parameters
///
/// - `context_bound`: Upper bound on the per-chapter context window
/// - `max_attempts`: Oracle attempts per atom before committing `Error`
/// - `backoff_base_ms`: First retry delay; doubles per attempt, no jitter
/// - `request_timeout_ms`: Per-attempt oracle deadline
/// - `chapter_deadline_ms`: Optional wall-clock budget per chapter
/// - `max_concurrent_requests`: Admission gate on in-flight oracle calls,
///   shared across all chapter tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on the per-chapter context window.
    pub context_bound: ContextBound,
    /// Oracle attempts per atom before committing `Error`.
    pub max_attempts: u32,
    /// First retry delay in milliseconds; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Per-attempt oracle deadline in milliseconds.
    pub request_timeout_ms: u64,
    /// Optional wall-clock budget per chapter, in milliseconds.
    pub chapter_deadline_ms: Option<u64>,
    /// Cap on concurrent in-flight oracle calls across all chapters.
    pub max_concurrent_requests: usize,
}

impl PipelineConfig {
    /// First retry delay.
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Per-attempt oracle deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Per-chapter wall-clock budget, if any.
    pub fn chapter_deadline(&self) -> Option<Duration> {
        self.chapter_deadline_ms.map(Duration::from_millis)
    }

    /// A configuration suited to fast tests: tiny backoff, no deadline.
    #[cfg(test)]
    pub fn fast() -> Self {
        Self {
            backoff_base_ms: 1,
            request_timeout_ms: 1_000,
            ..Self::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            context_bound: ContextBound::LastN(128),
            max_attempts: 3,
            backoff_base_ms: 250,
            request_timeout_ms: 30_000,
            chapter_deadline_ms: None,
            max_concurrent_requests: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds_context_window() {
        let config = PipelineConfig::default();
        assert_eq!(config.context_bound, ContextBound::LastN(128));
        assert!(config.max_attempts >= 1);
        assert!(config.max_concurrent_requests >= 1);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_duration_helpers() {
        let config = PipelineConfig {
            backoff_base_ms: 100,
            request_timeout_ms: 2_000,
            chapter_deadline_ms: Some(5_000),
            ..PipelineConfig::default()
        };
        assert_eq!(config.backoff_base(), Duration::from_millis(100));
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.chapter_deadline(), Some(Duration::from_secs(5)));
    }
}
