//! Tunables for a board session.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default debounce between object broadcasts.
pub const DEFAULT_BROADCAST_DEBOUNCE_MS: u64 = 50;

/// Default share of the collection that may change before a full payload is sent.
pub const DEFAULT_FULL_SYNC_RATIO: f64 = 0.5;

/// Default number of undo actions kept across all users.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default minimum spacing of cursor broadcasts.
pub const DEFAULT_CURSOR_THROTTLE_MS: u64 = 50;

/// Default period of the snapshot reconciliation poll.
pub const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 5_000;

/// Default window after a local save in which snapshots are ignored.
pub const DEFAULT_RECONCILE_GUARD_MS: u64 = 3_000;

/// Default quiet period before an auto-save.
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 1_000;

/// Default bound on any persistence call.
pub const DEFAULT_PERSISTENCE_TIMEOUT_MS: u64 = 10_000;

/// Timing and sizing knobs for sync, history, presence and persistence.
///
/// On the wire and in the environment every duration is in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    #[serde(rename = "broadcast_debounce_ms", with = "millis")]
    pub broadcast_debounce: Duration,
    /// Send the full collection when more than this fraction changed.
    pub full_sync_ratio: f64,
    pub history_limit: usize,
    #[serde(rename = "cursor_throttle_ms", with = "millis")]
    pub cursor_throttle: Duration,
    #[serde(rename = "reconcile_interval_ms", with = "millis")]
    pub reconcile_interval: Duration,
    #[serde(rename = "reconcile_guard_ms", with = "millis")]
    pub reconcile_guard: Duration,
    #[serde(rename = "save_debounce_ms", with = "millis")]
    pub save_debounce: Duration,
    #[serde(rename = "persistence_timeout_ms", with = "millis")]
    pub persistence_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            broadcast_debounce: Duration::from_millis(DEFAULT_BROADCAST_DEBOUNCE_MS),
            full_sync_ratio: DEFAULT_FULL_SYNC_RATIO,
            history_limit: DEFAULT_HISTORY_LIMIT,
            cursor_throttle: Duration::from_millis(DEFAULT_CURSOR_THROTTLE_MS),
            reconcile_interval: Duration::from_millis(DEFAULT_RECONCILE_INTERVAL_MS),
            reconcile_guard: Duration::from_millis(DEFAULT_RECONCILE_GUARD_MS),
            save_debounce: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
            persistence_timeout: Duration::from_millis(DEFAULT_PERSISTENCE_TIMEOUT_MS),
        }
    }
}

impl SyncConfig {
    /// Defaults overlaid with `CORKBOARD_*` environment variables.
    ///
    /// Unset or unparsable variables keep the default.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            broadcast_debounce: env_millis("CORKBOARD_BROADCAST_DEBOUNCE_MS", d.broadcast_debounce),
            full_sync_ratio: env_parse("CORKBOARD_FULL_SYNC_RATIO", d.full_sync_ratio),
            history_limit: env_parse("CORKBOARD_HISTORY_LIMIT", d.history_limit),
            cursor_throttle: env_millis("CORKBOARD_CURSOR_THROTTLE_MS", d.cursor_throttle),
            reconcile_interval: env_millis("CORKBOARD_RECONCILE_INTERVAL_MS", d.reconcile_interval),
            reconcile_guard: env_millis("CORKBOARD_RECONCILE_GUARD_MS", d.reconcile_guard),
            save_debounce: env_millis("CORKBOARD_SAVE_DEBOUNCE_MS", d.save_debounce),
            persistence_timeout: env_millis(
                "CORKBOARD_PERSISTENCE_TIMEOUT_MS",
                d.persistence_timeout,
            ),
        }
    }

    /// Parse a JSON config document. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    let ms = env_parse(key, u64::try_from(default.as_millis()).unwrap_or(u64::MAX));
    Duration::from_millis(ms)
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
