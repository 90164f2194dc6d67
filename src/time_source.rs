use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

use crate::error::SyncError;

/// How long a successful sync is trusted before asking again.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// A clock that may need to be synchronised before it can be read.
pub trait TimeSource {
    /// Fetch authoritative time. Blocks the caller until done or failed.
    async fn sync(&mut self) -> Result<(), SyncError>;

    /// Monotonic time, used only to schedule resyncs.
    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    /// Current wall-clock time in the local zone. Only meaningful once
    /// `sync` has succeeded at least once.
    fn local_now(&self) -> NaiveDateTime;
}

/// The host's own clock, which is assumed to be kept in sync by the OS.
#[derive(Debug, Default)]
pub struct HostClock;

impl TimeSource for HostClock {
    async fn sync(&mut self) -> Result<(), SyncError> {
        Ok(())
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// When time was last synchronised, on the monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshState {
    last_sync: Option<Instant>,
}

impl RefreshState {
    pub fn record(&mut self, at: Instant) {
        self.last_sync = Some(at);
    }

    /// True if never synced, or strictly more than the refresh interval
    /// has passed since the last sync.
    pub fn resync_due(&self, now: Instant) -> bool {
        match self.last_sync {
            None => true,
            Some(last) => now.saturating_duration_since(last) > REFRESH_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resync_due() {
        let mut state = RefreshState::default();
        let start = Instant::now();
        assert!(state.resync_due(start));

        state.record(start);
        assert_eq!(state.last_sync, Some(start));
        assert!(!state.resync_due(start));
        assert!(!state.resync_due(start + Duration::from_secs(1800)));
        assert!(!state.resync_due(start + Duration::from_secs(3600)));
        assert!(state.resync_due(start + Duration::from_millis(3_600_001)));
        assert!(state.resync_due(start + Duration::from_secs(3601)));

        state.record(start + Duration::from_secs(3601));
        assert!(!state.resync_due(start + Duration::from_secs(7000)));
    }

    #[tokio::test]
    async fn test_host_clock_always_syncs() {
        let mut clock = HostClock;
        assert!(clock.sync().await.is_ok());
        assert!(clock.local_now() > NaiveDateTime::MIN);
    }
}
