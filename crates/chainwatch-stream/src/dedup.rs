use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// How many live keys the set tolerates before an insert triggers a sweep
/// of expired entries.
const SWEEP_THRESHOLD: usize = 4096;

/// Short-TTL fingerprint set backing ingestion dedup.
///
/// Keys expire lazily: an expired key is treated as absent on insert, and
/// a full sweep runs opportunistically once the map grows past
/// [`SWEEP_THRESHOLD`].
pub struct DedupSet {
    keys: Mutex<HashMap<String, Instant>>,
}

impl Default for DedupSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupSet {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Set-if-absent with expiry. Returns `true` if the key was newly
    /// inserted, `false` if an unexpired entry already exists.
    pub fn insert(&self, key: &str, ttl: Duration) -> bool {
        let mut keys = self.keys.lock().unwrap();
        let now = Instant::now();

        if keys.len() > SWEEP_THRESHOLD {
            keys.retain(|_, expires| *expires > now);
        }

        match keys.get(key) {
            Some(expires) if *expires > now => false,
            _ => {
                keys.insert(key.to_string(), now + ttl);
                true
            }
        }
    }

    /// Whether an unexpired entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        let keys = self.keys.lock().unwrap();
        keys.get(key).is_some_and(|expires| *expires > Instant::now())
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        let keys = self.keys.lock().unwrap();
        keys.values().filter(|expires| **expires > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
