//! Runtime configuration: room/table policy, rake policy, session timeouts,
//! and sync tuning. Loaded from environment/CLI via `clap` the way
//! `legit_poker_server`'s `Args` struct loads `ServerConfig`.

use sha2::{Digest, Sha256};

use crate::engine::nl::types::Chips;

/// Seating and buy-in policy for a room.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoomConfig {
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub min_buy_in: Chips,
    pub max_buy_in: Chips,
    pub max_seats: u8,
    pub action_timeout_ms: u64,
    pub disconnect_grace_ms: u64,
    /// Whether `complete -> waiting -> preflop` advances automatically.
    pub auto_start_hand: bool,
    pub auto_start_delay_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            small_blind: 5,
            big_blind: 10,
            min_buy_in: 200,
            max_buy_in: 1000,
            max_seats: 9,
            action_timeout_ms: 20_000,
            disconnect_grace_ms: 30_000,
            auto_start_hand: true,
            auto_start_delay_ms: 3_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RakePolicy {
    Zero,
    Standard,
    Tiered,
    StreetBased,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RakeTier {
    pub min_pot: Chips,
    /// Exclusive upper bound; `None` means unbounded.
    pub max_pot: Option<Chips>,
    pub percentage: u32, // parts per 10_000, e.g. 500 == 5.00%
    pub cap: Chips,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RakeConfig {
    pub policy: RakePolicy,
    pub percentage: u32, // parts per 10_000
    pub cap: Chips,
    pub no_flop_no_rake: bool,
    pub exclude_uncontested: bool,
    pub tiers: Vec<RakeTier>,
    /// Rake only applies once the hand reaches at least this street (StreetBased policy).
    pub min_street_for_rake: crate::engine::nl::types::Street,
    pub promo_waiver_active: bool,
}

impl Default for RakeConfig {
    fn default() -> Self {
        Self {
            policy: RakePolicy::Standard,
            percentage: 500,
            cap: 3,
            no_flop_no_rake: true,
            exclude_uncontested: false,
            tiers: Vec::new(),
            min_street_for_rake: crate::engine::nl::types::Street::River,
            promo_waiver_active: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionTimeouts {
    pub heartbeat_timeout_ms: u64,
    pub max_missed_heartbeats: u32,
    pub disconnect_grace_ms: u64,
    pub session_timeout_ms: u64,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 15_000,
            max_missed_heartbeats: 3,
            disconnect_grace_ms: 30_000,
            session_timeout_ms: 12 * 60 * 60 * 1000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyncConfig {
    /// Snapshot cadence: a full snapshot is retained at least every K sequences.
    pub snapshot_every_k: u64,
    /// Bounded LRU depth, in retained snapshots, per table.
    pub max_retained_snapshots: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            snapshot_every_k: 10,
            max_retained_snapshots: 64,
        }
    }
}

/// Aggregate runtime configuration. `config_hash` gives callers a stable
/// fingerprint for the "configuration exports include a `configHash`"
/// contract, mirroring `ledger::hash`'s domain-separated chaining.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    pub room: RoomConfig,
    pub rake: RakeConfig,
    pub session_timeouts: SessionTimeouts,
    pub sync: SyncConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            room: RoomConfig::default(),
            rake: RakeConfig::default(),
            session_timeouts: SessionTimeouts::default(),
            sync: SyncConfig::default(),
        }
    }
}

const DOMAIN_CONFIG: &[u8] = b"poker-room-authority/config/v1";

impl RuntimeConfig {
    /// A stable fingerprint over the canonical JSON encoding of this config.
    /// Two configs built from the same field values hash identically.
    pub fn config_hash(&self) -> String {
        let canonical =
            serde_json::to_vec(self).expect("RuntimeConfig always serializes to JSON");
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_CONFIG);
        hasher.update(&canonical);
        hex::encode(hasher.finalize())
    }
}

/// CLI/env-loadable entry point for the `room_authority_server` binary.
#[derive(Debug, clap::Parser)]
#[command(name = "room_authority_server")]
#[command(about = "Launch the poker room authority runtime", long_about = None)]
pub struct Args {
    #[arg(long, env = "ROOM_BIND", default_value = "127.0.0.1:4100")]
    pub bind: std::net::SocketAddr,

    #[arg(long, env = "ROOM_SMALL_BLIND", default_value_t = 5)]
    pub small_blind: Chips,

    #[arg(long, env = "ROOM_BIG_BLIND", default_value_t = 10)]
    pub big_blind: Chips,

    #[arg(long, env = "ROOM_MIN_BUY_IN", default_value_t = 200)]
    pub min_buy_in: Chips,

    #[arg(long, env = "ROOM_MAX_BUY_IN", default_value_t = 1000)]
    pub max_buy_in: Chips,

    #[arg(long, env = "ROOM_MAX_SEATS", default_value_t = 9)]
    pub max_seats: u8,

    #[arg(long, env = "ROOM_RAKE_PERCENTAGE_BPS", default_value_t = 500)]
    pub rake_percentage_bps: u32,

    #[arg(long, env = "ROOM_RAKE_CAP", default_value_t = 3)]
    pub rake_cap: Chips,

    /// Toggle structured (JSON) logs.
    #[arg(long, env = "ROOM_LOG_JSON", default_value_t = false)]
    pub json: bool,
}

impl Args {
    pub fn into_runtime_config(self) -> RuntimeConfig {
        RuntimeConfig {
            room: RoomConfig {
                small_blind: self.small_blind,
                big_blind: self.big_blind,
                min_buy_in: self.min_buy_in,
                max_buy_in: self.max_buy_in,
                max_seats: self.max_seats,
                ..RoomConfig::default()
            },
            rake: RakeConfig {
                percentage: self.rake_percentage_bps,
                cap: self.rake_cap,
                ..RakeConfig::default()
            },
            ..RuntimeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_hash_round_trips_for_equal_configs() {
        let a = RuntimeConfig::default();
        let b = RuntimeConfig::default();
        assert_eq!(a.config_hash(), b.config_hash());
    }

    #[test]
    fn config_hash_changes_when_a_field_changes() {
        let a = RuntimeConfig::default();
        let mut b = RuntimeConfig::default();
        b.room.big_blind += 1;
        assert_ne!(a.config_hash(), b.config_hash());
    }
}
