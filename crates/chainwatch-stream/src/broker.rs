use crate::dedup::DedupSet;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Identifier of an entry within one stream. Monotonically increasing;
/// total order per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One published entry: an id plus a flat string field map.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: EntryId,
    pub fields: HashMap<String, String>,
}

impl StreamEntry {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

struct PendingEntry {
    consumer: String,
    delivered_at: Instant,
    delivery_count: u32,
    index: usize,
}

#[derive(Default)]
struct GroupState {
    /// Index of the next entry not yet delivered to this group.
    cursor: usize,
    pending: HashMap<u64, PendingEntry>,
}

struct StreamState {
    entries: Vec<StreamEntry>,
    next_seq: u64,
    groups: HashMap<String, GroupState>,
    notify: Arc<Notify>,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
            groups: HashMap::new(),
            notify: Arc::new(Notify::new()),
        }
    }
}

/// In-process broker for named append-only streams with consumer groups.
///
/// Streams and groups are created on first use. Entries delivered to a
/// consumer stay pending until [`ack`](Self::ack)ed; entries pending longer
/// than an idle threshold can be taken over via [`claim`](Self::claim).
pub struct StreamBroker {
    streams: Mutex<HashMap<String, StreamState>>,
    dedup: DedupSet,
}

impl Default for StreamBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamBroker {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            dedup: DedupSet::new(),
        }
    }

    /// Append an entry to a stream. The entry is visible to consumers
    /// before this returns.
    pub fn publish(&self, stream: &str, fields: HashMap<String, String>) -> EntryId {
        let mut streams = self.streams.lock().unwrap();
        let state = streams.entry(stream.to_string()).or_default();
        let id = EntryId(state.next_seq);
        state.next_seq += 1;
        state.entries.push(StreamEntry { id, fields });
        // notify_one stores a permit when nobody is waiting yet, so a
        // consumer that races past the empty check still wakes up.
        state.notify.notify_one();
        tracing::trace!(stream, id = %id, "Published stream entry");
        id
    }

    /// Read up to `max_count` undelivered entries for `group`, blocking up
    /// to `block` when the stream has nothing new. Delivered entries become
    /// pending for `consumer` until acked or claimed. Returns an empty
    /// batch on block timeout.
    pub async fn consume(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        block: Duration,
        max_count: usize,
    ) -> Vec<StreamEntry> {
        let deadline = Instant::now() + block;
        loop {
            let notify = {
                let mut streams = self.streams.lock().unwrap();
                let state = streams.entry(stream.to_string()).or_default();
                let StreamState {
                    entries,
                    groups,
                    notify,
                    ..
                } = state;
                let grp = groups.entry(group.to_string()).or_default();

                let mut batch = Vec::new();
                let now = Instant::now();
                while grp.cursor < entries.len() && batch.len() < max_count {
                    let entry = entries[grp.cursor].clone();
                    grp.pending.insert(
                        entry.id.0,
                        PendingEntry {
                            consumer: consumer.to_string(),
                            delivered_at: now,
                            delivery_count: 1,
                            index: grp.cursor,
                        },
                    );
                    grp.cursor += 1;
                    batch.push(entry);
                }
                if !batch.is_empty() {
                    return batch;
                }
                notify.clone()
            };

            if Instant::now() >= deadline {
                return Vec::new();
            }
            let _ = tokio::time::timeout_at(deadline, notify.notified()).await;
        }
    }

    /// Acknowledge processed entries, removing their pending ownership.
    /// Returns how many were actually pending.
    pub fn ack(&self, stream: &str, group: &str, ids: &[EntryId]) -> usize {
        let mut streams = self.streams.lock().unwrap();
        let Some(state) = streams.get_mut(stream) else {
            return 0;
        };
        let Some(grp) = state.groups.get_mut(group) else {
            return 0;
        };
        ids.iter()
            .filter(|id| grp.pending.remove(&id.0).is_some())
            .count()
    }

    /// Take over entries that have been pending longer than `min_idle`,
    /// reassigning them to `consumer` and resetting their idle clock.
    /// Entries are returned in id order.
    pub fn claim(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
    ) -> Vec<StreamEntry> {
        let mut streams = self.streams.lock().unwrap();
        let Some(state) = streams.get_mut(stream) else {
            return Vec::new();
        };
        let StreamState {
            entries, groups, ..
        } = state;
        let Some(grp) = groups.get_mut(group) else {
            return Vec::new();
        };

        let now = Instant::now();
        let mut claimed = Vec::new();
        for pending in grp.pending.values_mut() {
            if now.duration_since(pending.delivered_at) >= min_idle {
                pending.consumer = consumer.to_string();
                pending.delivered_at = now;
                pending.delivery_count += 1;
                claimed.push(entries[pending.index].clone());
            }
        }
        claimed.sort_by_key(|e| e.id);
        if !claimed.is_empty() {
            tracing::debug!(
                stream,
                group,
                consumer,
                count = claimed.len(),
                "Claimed idle pending entries"
            );
        }
        claimed
    }

    /// Number of entries ever appended to `stream`. Growth against the
    /// group cursors is the backpressure signal.
    pub fn len(&self, stream: &str) -> usize {
        let streams = self.streams.lock().unwrap();
        streams.get(stream).map_or(0, |s| s.entries.len())
    }

    pub fn is_empty(&self, stream: &str) -> bool {
        self.len(stream) == 0
    }

    /// Number of entries delivered to `group` but not yet acked.
    pub fn pending_count(&self, stream: &str, group: &str) -> usize {
        let streams = self.streams.lock().unwrap();
        streams
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .map_or(0, |g| g.pending.len())
    }

    /// Atomic set-if-absent with expiry on the shared fingerprint set.
    /// Returns `true` when the key was inserted (first sighting), `false`
    /// when it is already present and unexpired.
    pub fn check_and_set(&self, key: &str, ttl: Duration) -> bool {
        self.dedup.insert(key, ttl)
    }
}
