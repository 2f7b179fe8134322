//! Error types for the gap-filling engine.
//!
//! Following spec §7: malformed responses, stale tokens, unknown fragments,
//! and link conflicts are all fatal to the call and surfaced via
//! `GapWriterError`. Storage-layer failures propagate through the `Storage`
//! variant. There is no retry here — retries live in the network layer
//! outside this crate.

use thiserror::Error;
use weft_proto::{FragmentId, PaginationToken, RoomId, StorageError};

#[derive(Debug, Error)]
pub enum GapWriterError {
    /// `chunk` not a sequence, `end` not a string, or a `/context` response
    /// missing one of its tokens (spec §4.4.1 step 1, §4.4.2 step 1).
    #[error("malformed response: {0}")]
    MalformedResponse(&'static str),

    /// `fragmentEntry.token` did not equal `response.start` on reload
    /// (spec §4.4.1 step 3) — the server answered a token the client no
    /// longer considers authoritative.
    #[error("stale token on fragment {fragment}: expected {expected:?}, response start was {actual:?}")]
    StaleToken { fragment: FragmentId, expected: Option<PaginationToken>, actual: PaginationToken },

    /// `timelineFragments.get` returned nothing for a fragment id the
    /// engine expected to still exist (spec §4.4.1 step 2).
    #[error("unknown fragment {fragment} in room {room}")]
    UnknownFragment { fragment: FragmentId, room: RoomId },

    /// Attempted to change an existing `linked_fragment_id` to a different
    /// value (spec §4.3 step 2) — indicates a client bug, never silently
    /// overwritten.
    #[error("fragment {fragment} already links to {existing}, refusing to relink to {attempted}")]
    LinkConflict { fragment: FragmentId, existing: FragmentId, attempted: FragmentId },

    /// `findFirstOccurringEventId` reported an event id absent from the
    /// chunk it was handed (spec §4.1 "Error conditions").
    #[error("overlap detector reported event {0:?} that was not present in the scanned chunk")]
    OverlapInvariantViolation(weft_proto::EventId),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type GapWriterResult<T> = Result<T, GapWriterError>;
