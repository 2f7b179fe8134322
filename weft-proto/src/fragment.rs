use serde::{Deserialize, Serialize};

use crate::ids::{PaginationToken, RoomId};

/// Monotonic per-room fragment identifier. Assigned once, never reused
/// (spec §3 Fragment invariants).
pub type FragmentId = i64;

/// A maximal contiguous run of locally-stored events in a room, bounded on
/// each side by a link to another fragment, a pagination token, or the
/// absolute edge of history.
///
/// Mutated only by `FragmentLinker`, per the lifecycle summary in spec §3:
/// it either fills a token, clears a token and sets a neighbouring ID, or
/// sets `edge_reached`. Fragments are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: FragmentId,
    pub room_id: RoomId,
    pub previous_id: Option<FragmentId>,
    pub next_id: Option<FragmentId>,
    pub previous_token: Option<PaginationToken>,
    pub next_token: Option<PaginationToken>,
    /// Set once the absolute edge of history has been reached on the
    /// `previous` side (Matrix rooms only page backward past the edge;
    /// there is no equivalent "end of time" on the `next` side for a live
    /// room, so this flag is meaningful only for `previous`).
    pub edge_reached: bool,
}

impl Fragment {
    /// A brand-new, unlinked fragment with both sides open (no token, no
    /// edge) — the shape produced by `GapWriter::create_new_fragment`
    /// before a caller fills in tokens (spec §4.4.4).
    pub fn new_isolated(id: FragmentId, room_id: RoomId) -> Self {
        Self { id, room_id, previous_id: None, next_id: None, previous_token: None, next_token: None, edge_reached: false }
    }

    pub fn token(&self, direction: super::direction::Direction) -> Option<&PaginationToken> {
        match direction {
            super::direction::Direction::Backward => self.previous_token.as_ref(),
            super::direction::Direction::Forward => self.next_token.as_ref(),
        }
    }

    pub fn linked_fragment_id(&self, direction: super::direction::Direction) -> Option<FragmentId> {
        match direction {
            super::direction::Direction::Backward => self.previous_id,
            super::direction::Direction::Forward => self.next_id,
        }
    }

    pub fn set_token(&mut self, direction: super::direction::Direction, token: Option<PaginationToken>) {
        match direction {
            super::direction::Direction::Backward => self.previous_token = token,
            super::direction::Direction::Forward => self.next_token = token,
        }
    }

    pub fn set_linked_fragment_id(&mut self, direction: super::direction::Direction, id: Option<FragmentId>) {
        match direction {
            super::direction::Direction::Backward => self.previous_id = id,
            super::direction::Direction::Forward => self.next_id = id,
        }
    }
}
