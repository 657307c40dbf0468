pub mod keys;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

const TTL_JITTER_RATIO: f64 = 0.1;

struct Entry {
    payload: serde_json::Value,
    expires_at: Instant,
}

/// In-process TTL cache with jittered expiry. Values are stored as JSON so a
/// single cache can hold any serializable type. A zero TTL disables it.
pub struct TtlCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        if !self.is_enabled() {
            return None;
        }
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        serde_json::from_value(entry.payload.clone()).ok()
    }

    pub fn set<T>(&self, key: &str, value: &T)
    where
        T: Serialize,
    {
        if !self.is_enabled() {
            return;
        }
        let payload = match serde_json::to_value(value) {
            Ok(p) => p,
            Err(_) => return,
        };
        let expires_at = Instant::now() + apply_ttl_jitter(self.ttl);

        let mut entries = self.entries.write();
        entries.retain(|_, e| e.expires_at > Instant::now());
        entries.insert(
            key.to_string(),
            Entry {
                payload,
                expires_at,
            },
        );
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn apply_ttl_jitter(ttl: Duration) -> Duration {
    let base_ms = ttl.as_millis() as f64;
    let mut rng = rand::rng();
    let factor = rng.random_range(1.0 - TTL_JITTER_RATIO..=1.0 + TTL_JITTER_RATIO);
    let jittered_ms = (base_ms * factor).round().max(1.0);
    Duration::from_millis(jittered_ms as u64)
}
