//! Domain-separated SHA-256 chaining, following the same canonical-encoding
//! approach as `config::RuntimeConfig::config_hash`: hash a fixed domain tag
//! together with a length-prefixed encoding of the fields that matter, never
//! `serde_json` output directly (field order in a derived `Serialize` isn't
//! part of the hash's contract).

use sha2::{Digest, Sha256};

const DOMAIN_GENESIS: &[u8] = b"poker-room-authority/ledger/genesis/v1";
const DOMAIN_ENTRY: &[u8] = b"poker-room-authority/ledger/entry/v1";

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn write_i64(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn write_str(buf: &mut Vec<u8>, v: &str) {
    write_u64(buf, v.len() as u64);
    buf.extend_from_slice(v.as_bytes());
}

fn write_opt_str(buf: &mut Vec<u8>, v: Option<&str>) {
    match v {
        Some(s) => {
            buf.push(1);
            write_str(buf, s);
        }
        None => buf.push(0),
    }
}

fn write_opt_u64(buf: &mut Vec<u8>, v: Option<u64>) {
    match v {
        Some(n) => {
            buf.push(1);
            write_u64(buf, n);
        }
        None => buf.push(0),
    }
}

fn finalize(domain: &[u8], buf: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(buf);
    hex::encode(hasher.finalize())
}

/// Seed `previousHash` for a subject's zeroth (`set_initial_balance`) entry.
pub fn genesis_hash(subject: &str) -> String {
    let mut buf = Vec::new();
    write_str(&mut buf, subject);
    finalize(DOMAIN_GENESIS, &buf)
}

/// `hash` is `H` over every other field of the entry, including its own
/// `previousHash`, which is how the chain links: `e[i].previousHash ==
/// e[i-1].hash` is then checkable by recomputing `e[i-1]`'s hash.
#[allow(clippy::too_many_arguments)]
pub fn entry_hash(
    id: u64,
    kind: &str,
    amount: i64,
    subject_player: &str,
    hand_id: Option<u64>,
    table_id: Option<&str>,
    balance_after: u64,
    timestamp_ms: i64,
    previous_hash: &str,
) -> String {
    let mut buf = Vec::new();
    write_u64(&mut buf, id);
    write_str(&mut buf, kind);
    write_i64(&mut buf, amount);
    write_str(&mut buf, subject_player);
    write_opt_u64(&mut buf, hand_id);
    write_opt_str(&mut buf, table_id);
    write_u64(&mut buf, balance_after);
    write_i64(&mut buf, timestamp_ms);
    write_str(&mut buf, previous_hash);
    finalize(DOMAIN_ENTRY, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_hash_changes_when_any_field_changes() {
        let base = entry_hash(1, "bet", -10, "p1", Some(5), Some("t1"), 90, 1000, "genesis");
        let different_amount = entry_hash(1, "bet", -11, "p1", Some(5), Some("t1"), 90, 1000, "genesis");
        assert_ne!(base, different_amount);
    }

    #[test]
    fn genesis_hash_is_deterministic_per_subject() {
        assert_eq!(genesis_hash("p1"), genesis_hash("p1"));
        assert_ne!(genesis_hash("p1"), genesis_hash("p2"));
    }
}
