//! Per-symbol subscription lifecycle.

/// State of one symbol's book within the sync engine.
///
/// The cycle is `Subscribing → Buffering → SnapshotRequested → Reconciling
/// → Live`, with `Stale` as the terminal state for a failed cycle. A
/// detected gap either restarts the cycle from `Subscribing` or ends it in
/// `Stale`, depending on the configured gap policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Subscription request sent, not yet acknowledged
    Subscribing,
    /// Subscription acknowledged; deltas are queued without a baseline
    Buffering,
    /// REST snapshot fetch in flight (deltas keep buffering)
    SnapshotRequested,
    /// Snapshot received; buffered deltas being validated and replayed
    Reconciling,
    /// Book is authoritative and applying deltas incrementally
    Live,
    /// Cycle failed; the entry is torn down
    Stale,
}

impl SyncState {
    /// Whether incoming deltas should be buffered rather than applied
    #[must_use]
    pub const fn is_pre_live(self) -> bool {
        matches!(
            self,
            SyncState::Subscribing
                | SyncState::Buffering
                | SyncState::SnapshotRequested
                | SyncState::Reconciling
        )
    }

    /// Whether the book is authoritative
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, SyncState::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_live_states() {
        assert!(SyncState::Subscribing.is_pre_live());
        assert!(SyncState::Buffering.is_pre_live());
        assert!(SyncState::SnapshotRequested.is_pre_live());
        assert!(SyncState::Reconciling.is_pre_live());
        assert!(!SyncState::Live.is_pre_live());
        assert!(!SyncState::Stale.is_pre_live());
    }

    #[test]
    fn test_live() {
        assert!(SyncState::Live.is_live());
        assert!(!SyncState::Stale.is_live());
    }
}
