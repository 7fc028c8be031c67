use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_REQUESTS: usize = 5;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

// Quota settings, fixed once the process starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: usize, // max admitted requests per window
    pub window: Duration,    // length of the sliding window
}

impl RateLimitPolicy {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    // Value for the Retry-After header. Always the whole window,
    // not the time until the oldest entry expires.
    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs()
    }

    fn window_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.window).unwrap_or(TimeDelta::MAX)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Admitted request timestamps for one credential, oldest first.
///
/// Never holds more than `max_requests` entries: rejected attempts are
/// not recorded.
#[derive(Debug, Default)]
pub struct RequestHistory {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl RequestHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    // Drop timestamps that fell out of the window. Entries are in time
    // order so this is a prefix trim.
    pub fn evict_expired(&mut self, now: DateTime<Utc>, policy: &RateLimitPolicy) -> usize {
        let window = policy.window_delta();
        let mut evicted = 0;
        while let Some(oldest) = self.timestamps.front() {
            if now.signed_duration_since(*oldest) > window {
                self.timestamps.pop_front();
                evicted += 1;
            } else {
                break;
            }
        }
        evicted
    }

    /// Evicts expired entries, then records `now` if there is room.
    ///
    /// Returns the number of entries in the window after recording, or
    /// `None` when the quota is already used up.
    pub fn try_record(&mut self, now: DateTime<Utc>, policy: &RateLimitPolicy) -> Option<usize> {
        self.evict_expired(now, policy);

        if self.timestamps.len() >= policy.max_requests {
            return None;
        }

        self.timestamps.push_back(now);
        Some(self.timestamps.len())
    }
}

/// Credential -> history map.
///
/// The map lock is only held to find or insert an entry; each history has
/// its own mutex so unrelated credentials never wait on each other.
#[derive(Debug, Default)]
pub struct HistoryStore {
    histories: DashMap<String, Arc<Mutex<RequestHistory>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Get the history for a key, creating it on first use
    pub fn history(&self, key: &str) -> Arc<Mutex<RequestHistory>> {
        // fast path: already there, shared read lock on the shard only
        if let Some(existing) = self.histories.get(key) {
            return Arc::clone(existing.value());
        }

        // slow path: entry() re-checks under the shard write lock, so two
        // racing first requests end up sharing one history
        let entry = self
            .histories
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(RequestHistory::new())));
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}
