//! Deterministic percentile dice.
//!
//! A roll is a pure function of the history size, the wall-clock timestamp
//! and an optional label. The inputs are mixed through HMAC-SHA256 and the
//! resulting seed drives a ChaCha stream, so the same inputs replay the same
//! roll on every platform.

use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

use crate::constants::{DICE_DOMAIN_TAG, DICE_MAX, DICE_MIN};
use crate::event::{DiceRoll, Percentile, Timestamp};

fn derive_roll_seed(event_count: usize, at: &str, label: Option<&str>) -> u64 {
    let key = u64::try_from(event_count).unwrap_or(u64::MAX).to_le_bytes();
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).expect("HMAC accepts any key length");
    mac.update(DICE_DOMAIN_TAG);
    mac.update(at.as_bytes());
    match label {
        Some(label) => {
            mac.update(&[1]);
            mac.update(label.as_bytes());
        }
        None => mac.update(&[0]),
    }
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

/// Roll a percentile die in `1..=100`.
#[must_use]
pub fn roll(event_count: usize, at: &str, label: Option<&str>) -> u8 {
    let mut rng = ChaCha20Rng::seed_from_u64(derive_roll_seed(event_count, at, label));
    rng.gen_range(DICE_MIN..=DICE_MAX)
}

impl DiceRoll {
    /// Roll and materialize the outcome as a fact.
    #[must_use]
    pub fn rolled(event_count: usize, at: Timestamp, label: Option<String>) -> Self {
        let value = roll(event_count, at.as_str(), label.as_deref());
        Self {
            roll: Percentile::new(u32::from(value)).expect("dice stay within 1..=100"),
            at,
            label,
            event_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AT: &str = "2025-01-15T10:00:00Z";

    #[test]
    fn same_inputs_same_roll() {
        let first = roll(10, AT, Some("x"));
        assert_eq!(first, roll(10, AT, Some("x")));
        assert!((DICE_MIN..=DICE_MAX).contains(&first));
    }

    #[test]
    fn each_input_feeds_the_roll() {
        // A single collision is a 1-in-100 event; across many inputs the
        // rolls must not all agree.
        let base = roll(10, AT, Some("x"));
        let by_count = (11..40).any(|n| roll(n, AT, Some("x")) != base);
        let by_label = ["y", "z", "w", "v", "u"]
            .iter()
            .any(|l| roll(10, AT, Some(*l)) != base);
        let by_time = (1..30)
            .map(|s| format!("2025-01-15T10:00:{s:02}Z"))
            .any(|t| roll(10, &t, Some("x")) != base);
        assert!(by_count && by_label && by_time);
    }

    #[test]
    fn missing_label_differs_from_empty_label() {
        assert_ne!(derive_roll_seed(3, AT, None), derive_roll_seed(3, AT, Some("")));
    }

    #[test]
    fn rolls_cover_the_whole_range() {
        let mut seen = [false; 100];
        for n in 0..5_000 {
            seen[usize::from(roll(n, AT, None) - 1)] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn rolled_fact_persists_inputs() {
        let at = Timestamp::parse(AT).unwrap();
        let fact = DiceRoll::rolled(4, at.clone(), Some("coup".into()));
        assert_eq!(fact.roll.value(), roll(4, AT, Some("coup")));
        assert_eq!(fact.at, at);
        assert_eq!(fact.label.as_deref(), Some("coup"));
        assert_eq!(fact.event_count, 4);
    }

    #[test]
    fn rolls_in_one_batch_are_distinct_facts() {
        let at = Timestamp::parse(AT).unwrap();
        let first = DiceRoll::rolled(7, at.clone(), Some("coup".into()));
        let second = DiceRoll::rolled(8, at, Some("coup".into()));
        assert_ne!(first, second);
        let json = serde_json::to_value(&second).unwrap();
        assert_eq!(json["eventCount"], 8);
    }
}
