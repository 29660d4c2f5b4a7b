// Path: crates/types/src/id.rs
//! Time-prefixed identifier generators.
//!
//! Both generators put the millisecond timestamp first so ids sort roughly
//! by creation time, and fill the remainder from a CSPRNG so they stay
//! collision-resistant across a fleet of writers.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::seq::SliceRandom;
use rand::RngCore;
use uuid::Uuid;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generates a lowercase, hyphenated UUIDv7.
pub fn uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Generates a public block id: a UUIDv7 with the hyphens removed.
pub fn public_block_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Generates a long id: the millisecond timestamp as 12 left-padded hex
/// characters followed by a 20-character shuffled random hex tail.
pub fn long_id() -> String {
    let mut rng = rand::thread_rng();
    let mut tail_bytes = [0u8; 10];
    rng.fill_bytes(&mut tail_bytes);

    let mut tail: Vec<u8> = hex::encode(tail_bytes).into_bytes();
    tail.shuffle(&mut rng);

    let mut out = format!("{:012x}", now_millis());
    out.push_str(&String::from_utf8_lossy(&tail));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_v7_shape() {
        let id = uuid_v7();
        assert_eq!(id.len(), 36);
        assert_eq!(id, id.to_lowercase());
        // Version nibble sits at position 14 of the hyphenated form.
        assert_eq!(id.as_bytes()[14], b'7');
    }

    #[test]
    fn test_public_block_id_has_no_hyphens() {
        let id = public_block_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn test_long_id_shape() {
        let id = long_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, id.to_lowercase());
    }

    #[test]
    fn test_ids_do_not_collide_locally() {
        let mut seen = HashSet::new();
        for _ in 0..512 {
            assert!(seen.insert(long_id()));
            assert!(seen.insert(public_block_id()));
        }
    }

    #[test]
    fn test_long_id_timestamp_prefix_orders() {
        // Two ids generated in sequence share a nearly identical prefix; the
        // first twelve characters decode back to a plausible timestamp.
        let id = long_id();
        let millis = u64::from_str_radix(&id[..12], 16).unwrap();
        // After 2020-01-01 and before 2100-01-01.
        assert!(millis > 1_577_836_800_000);
        assert!(millis < 4_102_444_800_000);
    }
}
