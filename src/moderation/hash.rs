//! Domain-separated SHA-256 helpers for moderation's two hash chains (hand
//! replay checksums, decision log entries), following the same
//! canonical-byte-encoding approach as `economy::ledger::hash` and
//! `config::RuntimeConfig::config_hash`: never hash `serde_json` output
//! directly, since a derived `Serialize`'s field order isn't part of the
//! hash's contract.

use sha2::{Digest, Sha256};

const DOMAIN_REPLAY: &[u8] = b"poker-room-authority/moderation/replay/v1";
const DOMAIN_DECISION_GENESIS: &[u8] = b"poker-room-authority/moderation/decision/genesis/v1";
const DOMAIN_DECISION_ENTRY: &[u8] = b"poker-room-authority/moderation/decision/entry/v1";
const DOMAIN_STATE: &[u8] = b"poker-room-authority/moderation/replay-state/v1";
const DOMAIN_BUNDLE: &[u8] = b"poker-room-authority/moderation/evidence-bundle/v1";

pub fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn write_i64(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

pub fn write_str(buf: &mut Vec<u8>, v: &str) {
    write_u64(buf, v.len() as u64);
    buf.extend_from_slice(v.as_bytes());
}

fn finalize(domain: &[u8], buf: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(buf);
    hex::encode(hasher.finalize())
}

pub fn hash_state(buf: &[u8]) -> String {
    finalize(DOMAIN_STATE, buf)
}

pub fn hash_replay(buf: &[u8]) -> String {
    finalize(DOMAIN_REPLAY, buf)
}

pub fn hash_bundle(buf: &[u8]) -> String {
    finalize(DOMAIN_BUNDLE, buf)
}

pub fn genesis_decision_hash(case_id: &str) -> String {
    let mut buf = Vec::new();
    write_str(&mut buf, case_id);
    finalize(DOMAIN_DECISION_GENESIS, &buf)
}

#[allow(clippy::too_many_arguments)]
pub fn decision_entry_hash(
    entry_id: u64,
    timestamp_ms: i64,
    moderator_id: &str,
    action_type: &str,
    case_id: &str,
    details: &str,
    previous_entry_hash: &str,
) -> String {
    let mut buf = Vec::new();
    write_u64(&mut buf, entry_id);
    write_i64(&mut buf, timestamp_ms);
    write_str(&mut buf, moderator_id);
    write_str(&mut buf, action_type);
    write_str(&mut buf, case_id);
    write_str(&mut buf, details);
    write_str(&mut buf, previous_entry_hash);
    finalize(DOMAIN_DECISION_ENTRY, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_entry_hash_changes_when_details_change() {
        let a = decision_entry_hash(1, 0, "mod1", "assign", "case1", "details a", "genesis");
        let b = decision_entry_hash(1, 0, "mod1", "assign", "case1", "details b", "genesis");
        assert_ne!(a, b);
    }
}
