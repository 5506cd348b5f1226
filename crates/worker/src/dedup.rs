//! Duplicate delivery guard.
//!
//! Remembers job ids that are in flight or finished within the TTL window.
//! In-flight ids never expire; finished ids expire after the TTL and are
//! evicted oldest-first once the guard is at capacity.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
enum Entry {
    InFlight,
    Finished(Instant),
}

pub struct DedupGuard {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl DedupGuard {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Claim `job_id` for processing. Returns `false` if it is a duplicate.
    pub fn try_claim(&self, job_id: &str) -> bool {
        let mut entries = self.lock();
        let now = Instant::now();
        let ttl = self.ttl;
        entries.retain(|_, entry| match entry {
            Entry::InFlight => true,
            Entry::Finished(at) => now.duration_since(*at) < ttl,
        });

        if entries.contains_key(job_id) {
            return false;
        }

        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .filter_map(|(id, entry)| match entry {
                    Entry::Finished(at) => Some((id.clone(), *at)),
                    Entry::InFlight => None,
                })
                .min_by_key(|(_, at)| *at)
                .map(|(id, _)| id);
            if let Some(id) = oldest {
                entries.remove(&id);
            }
        }

        entries.insert(job_id.to_string(), Entry::InFlight);
        true
    }

    /// Mark `job_id` finished; the TTL window starts now.
    pub fn finish(&self, job_id: &str) {
        self.lock()
            .insert(job_id.to_string(), Entry::Finished(Instant::now()));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map only holds timestamps; keep using it.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
