use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::fragment::FragmentId;

/// A lexicographic `(fragment_id, event_index)` key. Ordering is total
/// across the whole type (derived `Ord` on the tuple), but only meaningful
/// when comparing two keys in the *same* fragment — spec §3: "Ordering is
/// lexicographic ... but meaningful only within one fragment."
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub fragment_id: FragmentId,
    pub event_index: i64,
}

impl EventKey {
    /// The neutral midpoint key for a fragment: new events can be inserted
    /// either before or after it without renumbering, since indices are
    /// plain integers rather than a dense array index.
    pub fn default_fragment_key(fragment_id: FragmentId) -> Self { Self { fragment_id, event_index: 0 } }

    /// The successor key in `direction`: `+1` for `Forward`, `-1` for `Backward`.
    pub fn next_key_for_direction(self, direction: Direction) -> Self {
        let delta = if direction.is_forward() { 1 } else { -1 };
        Self { fragment_id: self.fragment_id, event_index: self.event_index + delta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_then_backward_is_identity() {
        let k = EventKey::default_fragment_key(7);
        let roundtripped = k.next_key_for_direction(Direction::Forward).next_key_for_direction(Direction::Backward);
        assert_eq!(k, roundtripped);
    }

    #[test]
    fn ordering_within_fragment() {
        let k0 = EventKey::default_fragment_key(1);
        let k1 = k0.next_key_for_direction(Direction::Forward);
        let k2 = k1.next_key_for_direction(Direction::Forward);
        assert!(k0 < k1);
        assert!(k1 < k2);

        let back1 = k0.next_key_for_direction(Direction::Backward);
        assert!(back1 < k0);
    }

    #[test]
    fn distinct_keys_in_same_fragment_never_equal_after_sequential_inserts() {
        let mut key = EventKey::default_fragment_key(3);
        let mut seen = std::collections::HashSet::new();
        seen.insert(key);
        for _ in 0..50 {
            key = key.next_key_for_direction(Direction::Forward);
            assert!(seen.insert(key), "duplicate key produced by sequential forward inserts");
        }
    }
}
