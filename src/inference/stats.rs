//! Lock-free request counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceStats {
    pub requests: u64,
    pub records: u64,
    pub failures: u64,
    /// Categorical values that fell back to the unknown code
    pub unseen_category_fallbacks: u64,
    /// Requests refused for too many unseen categories
    pub unseen_category_rejections: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    requests: AtomicU64,
    records: AtomicU64,
    failures: AtomicU64,
    unseen_fallbacks: AtomicU64,
    unseen_rejections: AtomicU64,
}

impl Counters {
    pub(crate) fn request(&self, records: usize) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(records as u64, Ordering::Relaxed);
    }

    pub(crate) fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unseen(&self, count: usize) {
        self.unseen_fallbacks.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn rejection(&self) {
        self.unseen_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> InferenceStats {
        InferenceStats {
            requests: self.requests.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            unseen_category_fallbacks: self.unseen_fallbacks.load(Ordering::Relaxed),
            unseen_category_rejections: self.unseen_rejections.load(Ordering::Relaxed),
        }
    }
}
