//! Configuration for the sync engine and feed driver.

use std::time::Duration;

/// How a detected sequence gap is handled.
///
/// The venues themselves disagree here: some feeds expect clients to
/// silently resynchronize, others treat a gap as fatal. Pick per use case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Restart the subscription cycle for the symbol (drop the book,
    /// re-fetch the snapshot); subscribers keep their handles
    #[default]
    Resubscribe,
    /// Fail the symbol's stream and surface the gap to subscribers
    Error,
}

/// Configuration for [`SyncEngine`](crate::sync::SyncEngine) and
/// [`BookFeed`](crate::feed::BookFeed)
///
/// # Example
///
/// ```rust
/// use booksync::{GapPolicy, SyncConfig};
/// use std::time::Duration;
///
/// let config = SyncConfig::default()
///     .with_snapshot_timeout(Duration::from_secs(5))
///     .with_publish_depth(Some(20))
///     .with_gap_policy(GapPolicy::Error);
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a subscription may sit without a reconciled snapshot
    snapshot_timeout: Duration,

    /// Warm-up before the first snapshot fetch, and spacing between retries
    snapshot_delay: Duration,

    /// Snapshot fetch attempts before the subscription is failed
    snapshot_max_attempts: u32,

    /// Cap on deltas buffered while waiting for the snapshot
    max_buffered: usize,

    /// Levels per side in published views (`None` = full book)
    publish_depth: Option<usize>,

    /// What to do when the delta stream has a gap
    gap_policy: GapPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            snapshot_timeout: Duration::from_secs(10),
            snapshot_delay: Duration::from_millis(100),
            snapshot_max_attempts: 3,
            max_buffered: 100,
            publish_depth: None,
            gap_policy: GapPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long to wait for a reconciled snapshot before failing
    #[must_use]
    pub fn with_snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout = timeout;
        self
    }

    /// Set the warm-up delay before (re)fetching the snapshot
    #[must_use]
    pub fn with_snapshot_delay(mut self, delay: Duration) -> Self {
        self.snapshot_delay = delay;
        self
    }

    /// Set the number of snapshot fetch attempts before giving up
    #[must_use]
    pub fn with_snapshot_max_attempts(mut self, attempts: u32) -> Self {
        self.snapshot_max_attempts = attempts.max(1);
        self
    }

    /// Set the pre-snapshot delta buffer capacity
    #[must_use]
    pub fn with_max_buffered(mut self, cap: usize) -> Self {
        self.max_buffered = cap.max(1);
        self
    }

    /// Set the depth of published views (`None` = full book)
    #[must_use]
    pub fn with_publish_depth(mut self, depth: Option<usize>) -> Self {
        self.publish_depth = depth;
        self
    }

    /// Set the gap policy
    #[must_use]
    pub fn with_gap_policy(mut self, policy: GapPolicy) -> Self {
        self.gap_policy = policy;
        self
    }

    /// How long a subscription may sit without a reconciled snapshot
    #[must_use]
    pub fn snapshot_timeout(&self) -> Duration {
        self.snapshot_timeout
    }

    /// Warm-up before the first snapshot fetch, and spacing between retries
    #[must_use]
    pub fn snapshot_delay(&self) -> Duration {
        self.snapshot_delay
    }

    /// Snapshot fetch attempts before the subscription is failed
    #[must_use]
    pub fn snapshot_max_attempts(&self) -> u32 {
        self.snapshot_max_attempts
    }

    /// Cap on deltas buffered while waiting for the snapshot
    #[must_use]
    pub fn max_buffered(&self) -> usize {
        self.max_buffered
    }

    /// Levels per side in published views
    #[must_use]
    pub fn publish_depth(&self) -> Option<usize> {
        self.publish_depth
    }

    /// What to do when the delta stream has a gap
    #[must_use]
    pub fn gap_policy(&self) -> GapPolicy {
        self.gap_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.snapshot_timeout(), Duration::from_secs(10));
        assert_eq!(config.snapshot_max_attempts(), 3);
        assert_eq!(config.max_buffered(), 100);
        assert_eq!(config.publish_depth(), None);
        assert_eq!(config.gap_policy(), GapPolicy::Resubscribe);
    }

    #[test]
    fn test_builder() {
        let config = SyncConfig::new()
            .with_snapshot_timeout(Duration::from_secs(3))
            .with_snapshot_delay(Duration::ZERO)
            .with_snapshot_max_attempts(5)
            .with_max_buffered(16)
            .with_publish_depth(Some(10))
            .with_gap_policy(GapPolicy::Error);

        assert_eq!(config.snapshot_timeout(), Duration::from_secs(3));
        assert_eq!(config.snapshot_delay(), Duration::ZERO);
        assert_eq!(config.snapshot_max_attempts(), 5);
        assert_eq!(config.max_buffered(), 16);
        assert_eq!(config.publish_depth(), Some(10));
        assert_eq!(config.gap_policy(), GapPolicy::Error);
    }

    #[test]
    fn test_floors() {
        let config = SyncConfig::new()
            .with_snapshot_max_attempts(0)
            .with_max_buffered(0);
        assert_eq!(config.snapshot_max_attempts(), 1);
        assert_eq!(config.max_buffered(), 1);
    }
}
