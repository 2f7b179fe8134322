//! `OverlapDetector` scans a candidate chunk for events already on disk,
//! splits it into a leading non-overlapping prefix plus a tail to discard,
//! and identifies the fragment the first duplicate belongs to.

use weft_proto::{Direction, Event, FragmentBoundaryEntry, FragmentId, RoomId};

use crate::error::{GapWriterError, GapWriterResult};
use crate::log::GapWriterLog;
use crate::storage_traits::TimelineTxn;

#[derive(Debug, Clone, Default)]
pub struct OverlapOutcome {
    pub non_overlapping_events: Vec<Event>,
    pub neighbour_fragment_entry: Option<FragmentBoundaryEntry>,
}

/// The edge of `fragment_id` that faces the fragment currently being
/// extended in `direction` — see DESIGN.md for why this is
/// `direction.reverse()`'s edge, not `direction`'s.
async fn expected_overlapping_event_id(
    txn: &dyn TimelineTxn,
    room_id: &RoomId,
    fragment_id: FragmentId,
    direction: Direction,
) -> GapWriterResult<Option<weft_proto::EventId>> {
    let edge_entry = if direction.is_backward() {
        // We're walking backward through `fragment_id`'s own previous
        // edge; the neighbour sits further back, so its near edge is its
        // most-forward (last) event.
        txn.events().last_events(room_id, fragment_id, 1).await?
    } else {
        txn.events().first_events(room_id, fragment_id, 1).await?
    };
    Ok(edge_entry.into_iter().next().map(|e| e.event.event_id))
}

/// Scan `chunk` against storage, returning the non-overlapping prefix plus
/// an optional neighbour boundary if the chunk ran into an adjacent
/// fragment's events.
pub async fn detect_overlap(
    txn: &dyn TimelineTxn,
    log: &dyn GapWriterLog,
    room_id: &RoomId,
    current_fragment_id: FragmentId,
    linked_fragment_id: Option<FragmentId>,
    direction: Direction,
    chunk: Vec<Event>,
) -> GapWriterResult<OverlapOutcome> {
    if chunk.is_empty() {
        return Ok(OverlapOutcome::default());
    }

    let expected_overlapping_event_id = match linked_fragment_id {
        Some(linked) => expected_overlapping_event_id(txn, room_id, linked, direction).await?,
        None => None,
    };

    let mut non_overlapping_events = Vec::new();
    let mut neighbour_fragment_entry: Option<FragmentBoundaryEntry> = None;
    let mut pos = 0usize;

    loop {
        let remaining = &chunk[pos..];
        if remaining.is_empty() {
            break;
        }
        let remaining_ids: Vec<_> = remaining.iter().map(|e| e.event_id.clone()).collect();
        let Some(duplicate_id) = txn.events().find_first_occurring_event_id(room_id, &remaining_ids).await? else {
            non_overlapping_events.extend_from_slice(remaining);
            break;
        };

        let Some(dup_index) = remaining.iter().position(|e| e.event_id == duplicate_id) else {
            return Err(GapWriterError::OverlapInvariantViolation(duplicate_id));
        };

        non_overlapping_events.extend_from_slice(&remaining[..dup_index]);

        let is_expected = match &expected_overlapping_event_id {
            None => true,
            Some(expected) => *expected == duplicate_id,
        };

        if is_expected && neighbour_fragment_entry.is_none() {
            if let Some(duplicate_entry) = txn.events().get_by_event_id(room_id, &duplicate_id).await? {
                let neighbour_fragment_id = duplicate_entry.key.fragment_id;
                let neighbour_fragment = txn
                    .fragments()
                    .get(room_id, neighbour_fragment_id)
                    .await?
                    .ok_or_else(|| GapWriterError::UnknownFragment { fragment: neighbour_fragment_id, room: room_id.clone() })?;

                if neighbour_fragment_id == current_fragment_id {
                    // Self-link guard (spec §4.1 step 4): a fragment may
                    // never link to itself. This happens when the server
                    // hands back a token that loops onto the fragment's own
                    // events; discard and keep scanning.
                    log.warn(&format!("fragment {neighbour_fragment_id} would link to itself; discarding candidate overlap"));
                } else {
                    neighbour_fragment_entry = Some(FragmentBoundaryEntry::new(neighbour_fragment, direction.reverse()));
                }
            }
        }

        // Known-bug compensation: continue past the duplicate regardless
        // of whether it was the "expected" one — duplicate event ids can
        // appear in chunks that are not actually the adjacent fragment.
        pos += dup_index + 1;
    }

    Ok(OverlapOutcome { non_overlapping_events, neighbour_fragment_entry })
}
