//! `GapWriter` orchestrates `OverlapDetector`, `EventInserter`, and
//! `FragmentLinker` for the two entry points a host calls after fetching a
//! `/messages` backfill or `/context` response.

use weft_proto::{
    ContextResponse, Direction, Fragment, FragmentBoundaryEntry, FragmentId, MessagesResponse, PaginationToken, RoomId, TimelineEntry,
};

use crate::error::{GapWriterError, GapWriterResult};
use crate::inserter::{self, fragment_edge_event_key};
use crate::linker;
use crate::log::{GapWriterLog, TracingLog};
use crate::overlap::{self, OverlapOutcome};
use crate::storage_traits::{ChunkState, TimelineTxn};

/// No real fragment has been established yet (used by `write_context`'s two
/// speculative overlap scans, before either side is known to have a
/// neighbour) — smaller than any id `create_new_fragment` ever assigns, so
/// the self-link guard in `detect_overlap` can never spuriously trigger.
const NO_CURRENT_FRAGMENT: FragmentId = FragmentId::MIN;

#[derive(Debug, Default)]
pub struct GapWriteResult {
    pub entries: Vec<TimelineEntry>,
    pub updated_entries: Vec<weft_proto::EventStorageEntry>,
    pub fragments: Vec<Fragment>,
    pub context_event: Option<TimelineEntry>,
}

/// Entry point for `write_fragment_fill`/`write_context`. Holds only the
/// diagnostic sink — all other state lives in the caller-provided
/// transaction.
pub struct GapWriter {
    log: Box<dyn GapWriterLog>,
}

impl Default for GapWriter {
    fn default() -> Self { Self::new() }
}

impl GapWriter {
    pub fn new() -> Self { Self { log: Box::new(TracingLog) } }

    pub fn with_log(log: impl GapWriterLog + 'static) -> Self { Self { log: Box::new(log) } }

    /// Apply a `/messages` backfill page to the fragment it was requested
    /// against: validates the continuation token, stores the
    /// non-overlapping events, and links the fragment to its neighbour if
    /// the page reached one.
    pub async fn write_fragment_fill(
        &self,
        txn: &dyn TimelineTxn,
        room_id: &RoomId,
        fragment_entry: FragmentBoundaryEntry,
        response: MessagesResponse,
    ) -> GapWriterResult<GapWriteResult> {
        let direction = fragment_entry.direction;

        // Step 2: reload, in case another transaction mutated it since the
        // caller last read it.
        let fresh_fragment = txn
            .fragments()
            .get(room_id, fragment_entry.fragment_id())
            .await?
            .ok_or_else(|| GapWriterError::UnknownFragment { fragment: fragment_entry.fragment_id(), room: room_id.clone() })?;
        let mut fragment_entry = FragmentBoundaryEntry::new(fresh_fragment, direction);

        // Step 3: token guard.
        if fragment_entry.token() != Some(&response.start) {
            return Err(GapWriterError::StaleToken {
                fragment: fragment_entry.fragment_id(),
                expected: fragment_entry.token().cloned(),
                actual: response.start,
            });
        }

        // Step 4: empty chunk reaches the edge of history. Note this does
        // not report the fragment via `fragments` — no link changed, so
        // the comparer's chain ordering is unaffected.
        if response.chunk.is_empty() {
            fragment_entry.fragment.edge_reached = true;
            fragment_entry.set_token(None);
            txn.fragments().update(&fragment_entry.fragment).await?;
            return Ok(GapWriteResult { entries: vec![TimelineEntry::FragmentBoundary(fragment_entry)], ..Default::default() });
        }

        let last_key = fragment_edge_event_key(txn, room_id, fragment_entry.fragment_id(), direction).await?;

        let chunk_state = ChunkState { state: response.state };
        let overlap = overlap::detect_overlap(
            txn,
            self.log.as_ref(),
            room_id,
            fragment_entry.fragment_id(),
            fragment_entry.linked_fragment_id(),
            direction,
            response.chunk,
        )
        .await?;

        // Step 7: known-bug compensation.
        let mut end = response.end;
        if overlap.non_overlapping_events.is_empty() && overlap.neighbour_fragment_entry.is_none() {
            self.log.warn(&format!(
                "fragment {} chunk was fully overlapping with no identifiable neighbour; clearing its continuation token",
                fragment_entry.fragment_id()
            ));
            end = None;
        }

        let insert_outcome =
            inserter::store_events(txn, &overlap.non_overlapping_events, last_key, direction, &chunk_state, self.log.as_ref()).await?;

        let mut entries = insert_outcome.entries;
        let fragments = linker::update_fragments(txn, fragment_entry, overlap.neighbour_fragment_entry, end, &mut entries).await?;

        Ok(GapWriteResult { entries, updated_entries: insert_outcome.updated_relation_entries, fragments, context_event: None })
    }

    /// Apply a `/context` response centered on an event the client hasn't
    /// seen before, stitching it (and its surrounding events) onto an
    /// existing fragment when either side overlaps one, or else seeding a
    /// brand-new isolated fragment for it.
    pub async fn write_context(&self, txn: &dyn TimelineTxn, room_id: &RoomId, response: ContextResponse) -> GapWriterResult<GapWriteResult> {
        // Step 2: already stored, return early.
        if let Some(existing) = txn.events().get_by_event_id(room_id, &response.event.event_id).await? {
            return Ok(GapWriteResult { context_event: Some(TimelineEntry::Event(existing)), ..Default::default() });
        }

        // Step 3: speculative scans in both directions, no established
        // fragment yet.
        let overlap_up =
            overlap::detect_overlap(txn, self.log.as_ref(), room_id, NO_CURRENT_FRAGMENT, None, Direction::Backward, response.events_before).await?;
        let overlap_down =
            overlap::detect_overlap(txn, self.log.as_ref(), room_id, NO_CURRENT_FRAGMENT, None, Direction::Forward, response.events_after).await?;

        // Step 4/5: pick the main side, or synthesize a new fragment if
        // neither scan found one.
        let (main, other) = if overlap_up.neighbour_fragment_entry.is_some() {
            (overlap_up, overlap_down)
        } else if overlap_down.neighbour_fragment_entry.is_some() {
            (overlap_down, overlap_up)
        } else {
            let mut new_fragment = self.create_new_fragment(txn, room_id).await?;
            new_fragment.previous_token = Some(response.start.clone());
            new_fragment.next_token = Some(response.end.clone());
            txn.fragments().update(&new_fragment).await?;
            let mut main = overlap_up;
            main.neighbour_fragment_entry = Some(FragmentBoundaryEntry::new(new_fragment, Direction::Forward));
            (main, overlap_down)
        };

        self.link_overlapping(txn, main, other, response.event, response.end).await
    }

    /// Shared tail of `write_context`: stores the center event plus both
    /// sides' non-overlapping events in one run, then links the main-side
    /// neighbour (and the other side's, if a distinct one was found).
    async fn link_overlapping(
        &self,
        txn: &dyn TimelineTxn,
        main: OverlapOutcome,
        mut other: OverlapOutcome,
        event: weft_proto::Event,
        token: PaginationToken,
    ) -> GapWriterResult<GapWriteResult> {
        let main_neighbour =
            main.neighbour_fragment_entry.expect("write_context only calls link_overlapping once a main-side neighbour is established");

        // Guard against `main` and `other` resolving to the same fragment,
        // which would otherwise produce a self-link. Treated the same as
        // the single-sided guard in `detect_overlap`: discard and warn
        // rather than fail the call.
        if let Some(other_neighbour) = &other.neighbour_fragment_entry {
            if other_neighbour.fragment_id() == main_neighbour.fragment_id() {
                self.log.warn(&format!("fragment {} would link to itself via context; discarding the other-side neighbour", main_neighbour.fragment_id()));
                other.neighbour_fragment_entry = None;
            }
        }

        let mut all_events: Vec<weft_proto::Event> = main.non_overlapping_events.iter().rev().cloned().collect();
        all_events.push(event.clone());
        all_events.extend(other.non_overlapping_events);

        let last_key = fragment_edge_event_key(txn, &main_neighbour.fragment.room_id, main_neighbour.fragment_id(), main_neighbour.direction).await?;

        let insert_outcome =
            inserter::store_events(txn, &all_events, last_key, main_neighbour.direction, &ChunkState::default(), self.log.as_ref()).await?;

        let mut entries = insert_outcome.entries;
        let fragments =
            linker::update_fragments(txn, main_neighbour, other.neighbour_fragment_entry, Some(token), &mut entries).await?;

        let context_event = entries.iter().find(|e| inserter::event_id_matches(e, &event.event_id)).cloned();

        Ok(GapWriteResult { entries, updated_entries: insert_outcome.updated_relation_entries, fragments, context_event })
    }

    /// Allocate a brand-new isolated fragment in `room_id`. Monotonicity of
    /// ids within a room is an invariant `FragmentIdComparer` depends on.
    pub async fn create_new_fragment(&self, txn: &dyn TimelineTxn, room_id: &RoomId) -> GapWriterResult<Fragment> {
        let next_id = txn.fragments().get_max_fragment_id(room_id).await?.map(|id| id + 1).unwrap_or(1);
        let fragment = Fragment::new_isolated(next_id, room_id.clone());
        txn.fragments().add(&fragment).await?;
        Ok(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fragment, token, InMemoryTxn, RecordingLog};
    use weft_proto::{Event, EventKey, EventStorageEntry, UserId};

    fn evt(id: &str, room: &RoomId) -> Event {
        Event {
            event_id: id.into(),
            room_id: room.clone(),
            sender: UserId::from("@alice:example.org"),
            event_type: "m.room.message".into(),
            state_key: None,
            content: serde_json::json!({"body": id}),
            prev_content: None,
        }
    }

    /// Backfill after one sync extends a lone fragment whose
    /// `previous_token` is still a gap.
    #[tokio::test]
    async fn backfill_extends_a_lone_fragment() {
        let txn = InMemoryTxn::new();
        let room: RoomId = "!room:example.org".into();
        let mut f1 = fragment(1, None, None, &room);
        f1.previous_token = Some(token("tok-0"));
        txn.seed_fragment(f1.clone());
        txn.seed_event(EventStorageEntry::new(EventKey::default_fragment_key(1), room.clone(), evt("$e20", &room)));

        let writer = GapWriter::new();
        let entry = FragmentBoundaryEntry::new(f1, Direction::Backward);
        let response = MessagesResponse { chunk: vec![evt("$e10", &room)], start: token("tok-0"), end: None, state: vec![] };

        let result = writer.write_fragment_fill(&txn, &room, entry, response).await.unwrap();

        assert_eq!(result.fragments.len(), 1);
        assert!(result.fragments[0].edge_reached || result.fragments[0].previous_token.is_none());
        assert_eq!(result.entries.len(), 2); // the stored event + the updated fragment boundary
    }

    /// Self-link avoidance when backfill is handed the fragment's own
    /// events back.
    #[tokio::test]
    async fn self_link_is_never_formed() {
        let txn = InMemoryTxn::new();
        let room: RoomId = "!room:example.org".into();
        let mut f1 = fragment(1, None, None, &room);
        f1.next_token = Some(token("loop-token"));
        txn.seed_fragment(f1.clone());
        txn.seed_event(EventStorageEntry::new(EventKey::default_fragment_key(1), room.clone(), evt("$own", &room)));

        let writer = GapWriter::new();
        let entry = FragmentBoundaryEntry::new(f1, Direction::Forward);
        let response = MessagesResponse { chunk: vec![evt("$own", &room)], start: token("loop-token"), end: None, state: vec![] };

        let result = writer.write_fragment_fill(&txn, &room, entry, response).await.unwrap();

        for fragment in &result.fragments {
            assert_ne!(fragment.next_id, Some(fragment.id));
            assert_ne!(fragment.previous_id, Some(fragment.id));
        }
    }

    /// A chunk that is fully overlapping with no identifiable neighbour
    /// (here via the self-link discard) clears the continuation token and
    /// logs a warning, per spec §7's known-bug compensation.
    #[tokio::test]
    async fn fully_overlapping_chunk_with_no_neighbour_warns_and_clears_token() {
        let txn = InMemoryTxn::new();
        let room: RoomId = "!room:example.org".into();
        let mut f1 = fragment(1, None, None, &room);
        f1.next_token = Some(token("loop-token"));
        txn.seed_fragment(f1.clone());
        txn.seed_event(EventStorageEntry::new(EventKey::default_fragment_key(1), room.clone(), evt("$own", &room)));

        let log = RecordingLog::default();
        let writer = GapWriter::with_log(log.clone());
        let entry = FragmentBoundaryEntry::new(f1, Direction::Forward);
        let response = MessagesResponse { chunk: vec![evt("$own", &room)], start: token("loop-token"), end: Some(token("next-page")), state: vec![] };

        let result = writer.write_fragment_fill(&txn, &room, entry, response).await.unwrap();

        assert_eq!(result.fragments.len(), 1);
        assert!(result.fragments[0].next_token.is_none(), "continuation token must be cleared, not set to next-page");

        let messages = log.messages.lock().unwrap();
        assert!(messages.iter().any(|m| m.contains("fully overlapping")), "expected a fully-overlapping warning, got: {messages:?}");
    }

    #[tokio::test]
    async fn empty_chunk_marks_edge_reached() {
        let txn = InMemoryTxn::new();
        let room: RoomId = "!room:example.org".into();
        let mut f1 = fragment(1, None, None, &room);
        f1.previous_token = Some(token("tok-edge"));
        txn.seed_fragment(f1.clone());

        let writer = GapWriter::new();
        let entry = FragmentBoundaryEntry::new(f1, Direction::Backward);
        let response = MessagesResponse { chunk: vec![], start: token("tok-edge"), end: None, state: vec![] };

        let result = writer.write_fragment_fill(&txn, &room, entry, response).await.unwrap();
        assert!(result.fragments.is_empty());
        let persisted = txn.get_fragment(1).expect("fragment persisted");
        assert!(persisted.edge_reached);
        assert!(persisted.previous_token.is_none());
    }

    #[tokio::test]
    async fn stale_token_is_rejected() {
        let txn = InMemoryTxn::new();
        let room: RoomId = "!room:example.org".into();
        let mut f1 = fragment(1, None, None, &room);
        f1.previous_token = Some(token("current"));
        txn.seed_fragment(f1.clone());

        let writer = GapWriter::new();
        let entry = FragmentBoundaryEntry::new(f1, Direction::Backward);
        let response = MessagesResponse { chunk: vec![], start: token("stale"), end: None, state: vec![] };

        let err = writer.write_fragment_fill(&txn, &room, entry, response).await.unwrap_err();
        assert!(matches!(err, GapWriterError::StaleToken { .. }));
    }

    #[tokio::test]
    async fn context_on_unseen_event_creates_a_new_fragment() {
        let txn = InMemoryTxn::new();
        let room: RoomId = "!room:example.org".into();
        let writer = GapWriter::new();

        let response = ContextResponse {
            event: evt("$center", &room),
            events_before: vec![evt("$before", &room)],
            events_after: vec![evt("$after", &room)],
            start: token("ctx-start"),
            end: token("ctx-end"),
            state: vec![],
        };

        let result = writer.write_context(&txn, &room, response).await.unwrap();
        assert!(result.context_event.is_some());
        assert_eq!(result.fragments.len(), 1);
        assert_eq!(result.fragments[0].previous_token.as_ref().map(|t| t.as_str()), Some("ctx-start"));
    }

    #[tokio::test]
    async fn context_on_already_stored_event_returns_early() {
        let txn = InMemoryTxn::new();
        let room: RoomId = "!room:example.org".into();
        txn.seed_event(EventStorageEntry::new(EventKey::default_fragment_key(1), room.clone(), evt("$center", &room)));

        let writer = GapWriter::new();
        let response = ContextResponse {
            event: evt("$center", &room),
            events_before: vec![],
            events_after: vec![],
            start: token("ctx-start"),
            end: token("ctx-end"),
            state: vec![],
        };

        let writes_before = txn.fragment_write_count();
        let result = writer.write_context(&txn, &room, response).await.unwrap();
        assert_eq!(txn.fragment_write_count(), writes_before);
        assert!(result.context_event.is_some());
    }
}
