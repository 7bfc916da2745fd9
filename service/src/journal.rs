//! In-memory record of tweets the service has processed
//!
//! Keeps counters for every call plus a bounded ring of the most recent
//! accepted tweets. Nothing here is persisted.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One accepted `SendTweet` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedTweet {
    /// Monotonic per-journal sequence number, starting at 1
    pub sequence: u64,
    pub country: String,
    pub weather: String,
    pub description: String,
}

/// Counters and recent history shared by all in-flight calls
pub struct TweetJournal {
    capacity: usize,
    recent: RwLock<VecDeque<ProcessedTweet>>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl TweetJournal {
    /// Create a journal remembering at most `capacity` accepted tweets
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            recent: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        })
    }

    /// Record an accepted tweet, evicting the oldest entry when full
    pub fn record_accepted(&self, country: &str, weather: &str, description: &str) -> u64 {
        let sequence = self.accepted.fetch_add(1, Ordering::SeqCst) + 1;
        if self.capacity == 0 {
            return sequence;
        }

        let mut recent = self.recent.write();
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(ProcessedTweet {
            sequence,
            country: country.to_string(),
            weather: weather.to_string(),
            description: description.to_string(),
        });
        sequence
    }

    /// Record a rejected call
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    /// Total accepted calls since startup
    pub fn accepted_count(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Total rejected calls since startup
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Snapshot of the retained tweets, oldest first
    pub fn recent(&self) -> Vec<ProcessedTweet> {
        self.recent.read().iter().cloned().collect()
    }

    /// Retained tweets for one country
    pub fn for_country(&self, country: &str) -> Vec<ProcessedTweet> {
        self.recent
            .read()
            .iter()
            .filter(|t| t.country == country)
            .cloned()
            .collect()
    }
}
