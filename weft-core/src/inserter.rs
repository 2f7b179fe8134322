//! `EventInserter` stores a run of non-overlapping events at successive
//! keys, attaches sender display-name/avatar, and delegates relation-target
//! updates to the external relation writer.

use weft_proto::{
    directional_append, Direction, Event, EventId, EventKey, EventStorageEntry, MemberSnapshot, RoomId, TimelineEntry, UserId,
};

use crate::error::GapWriterResult;
use crate::log::GapWriterLog;
use crate::storage_traits::{ChunkState, TimelineTxn};

#[derive(Debug, Default)]
pub struct InsertOutcome {
    pub entries: Vec<TimelineEntry>,
    pub updated_relation_entries: Vec<EventStorageEntry>,
}

/// Find the `m.room.member` event applying to `events[index].sender`,
/// scanning the chunk itself before falling back to `chunk_state`, and
/// finally to locally-stored member state (spec §2 item 5: "attaches sender
/// display-name/avatar from local member state or the chunk itself").
async fn resolve_sender(
    events: &[Event],
    index: usize,
    direction: Direction,
    chunk_state: &ChunkState,
    txn: &dyn TimelineTxn,
    room_id: &RoomId,
) -> GapWriterResult<Option<MemberSnapshot>> {
    let sender = &events[index].sender;

    let is_member_for = |e: &&Event| e.is_member_event() && sender_matches(e, sender);

    // Step 1: older events within the chunk (toward higher indices for
    // Backward, lower indices for Forward) — authoritative via `content`.
    let older = if direction.is_backward() { events[index + 1..].iter().find(is_member_for) } else { events[..index].iter().rev().find(is_member_for) };
    if let Some(member_event) = older {
        return Ok(Some(MemberSnapshot::from_member_content(&member_event.content)));
    }

    // Step 2: newer events within the chunk — authoritative via
    // `prev_content` (the membership this entry is "replacing").
    let newer = if direction.is_backward() { events[..index].iter().rev().find(is_member_for) } else { events[index + 1..].iter().find(is_member_for) };
    if let Some(member_event) = newer {
        if let Some(prev) = &member_event.prev_content {
            return Ok(Some(MemberSnapshot::from_member_content(prev)));
        }
    }

    // Step 3: server-supplied state events alongside the chunk.
    if let Some(state_event) = chunk_state.state.iter().find(is_member_for) {
        return Ok(Some(MemberSnapshot::from_member_content(&state_event.content)));
    }

    // Step 4: locally-stored member state, consulted only once the chunk
    // and chunk-state scans have both come up empty.
    if let Some(snapshot) = txn.members().display_name_for(room_id, sender).await? {
        return Ok(Some(snapshot));
    }

    // Step 5: no override.
    Ok(None)
}

fn sender_matches(e: &Event, sender: &UserId) -> bool { e.state_key.as_deref() == Some(sender.as_str()) }

/// Store `events` in order, starting just past `start_key` — the key of
/// the event already at the fragment's edge (or
/// `EventKey::default_fragment_key` for an empty fragment). The first
/// stored event lands at `start_key.next_key_for_direction(direction)`.
pub async fn store_events(
    txn: &dyn TimelineTxn,
    events: &[Event],
    start_key: EventKey,
    direction: Direction,
    chunk_state: &ChunkState,
    log: &dyn GapWriterLog,
) -> GapWriterResult<InsertOutcome> {
    let mut key = start_key;
    let mut entries = Vec::with_capacity(events.len());
    let mut updated_relation_entries = Vec::new();

    for (index, event) in events.iter().enumerate() {
        key = key.next_key_for_direction(direction);

        let mut entry = EventStorageEntry::new(key, event.room_id.clone(), event.clone());
        entry.member = resolve_sender(events, index, direction, chunk_state, txn, &event.room_id).await?;

        let related = txn.relations().write_gap_relation(&entry, direction, log).await?;
        updated_relation_entries.extend(related);

        txn.events().insert(&entry).await?;
        directional_append(&mut entries, TimelineEntry::Event(entry), direction);
    }

    Ok(InsertOutcome { entries, updated_relation_entries })
}

/// The key of the event currently sitting at `fragment_id`'s edge facing
/// `direction`, or `EventKey::default_fragment_key` if the fragment holds
/// no events on that side yet.
pub async fn fragment_edge_event_key(txn: &dyn TimelineTxn, room_id: &RoomId, fragment_id: i64, direction: Direction) -> GapWriterResult<EventKey> {
    let edge = if direction.is_backward() {
        txn.events().first_events(room_id, fragment_id, 1).await?
    } else {
        txn.events().last_events(room_id, fragment_id, 1).await?
    };
    Ok(edge.into_iter().next().map(|e| e.key).unwrap_or_else(|| EventKey::default_fragment_key(fragment_id)))
}

pub fn event_id_matches(entry: &TimelineEntry, id: &EventId) -> bool { entry.as_event().map(|e| e.event_id()) == Some(id) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryTxn;
    use weft_proto::RoomId;

    fn member_event(user: &str, display_name: Option<&str>, prev_display_name: Option<&str>) -> Event {
        Event {
            event_id: format!("$member-{user}").into(),
            room_id: "!room:example.org".into(),
            sender: user.into(),
            event_type: "m.room.member".into(),
            state_key: Some(user.to_string()),
            content: serde_json::json!({"membership": "join", "displayname": display_name}),
            prev_content: prev_display_name.map(|n| serde_json::json!({"membership": "join", "displayname": n})),
        }
    }

    fn message_event(id: &str, sender: &str) -> Event {
        Event {
            event_id: id.into(),
            room_id: "!room:example.org".into(),
            sender: sender.into(),
            event_type: "m.room.message".into(),
            state_key: None,
            content: serde_json::json!({"body": id}),
            prev_content: None,
        }
    }

    #[tokio::test]
    async fn stores_events_at_successive_keys_in_direction() {
        let txn = InMemoryTxn::new();
        let log = crate::log::TracingLog;
        let events = vec![message_event("$a", "@alice:example.org"), message_event("$b", "@alice:example.org")];
        let outcome = store_events(&txn, &events, EventKey::default_fragment_key(1), Direction::Forward, &ChunkState::default(), &log)
            .await
            .unwrap();

        assert_eq!(outcome.entries.len(), 2);
        let first_key = outcome.entries[0].as_event().unwrap().key;
        let second_key = outcome.entries[1].as_event().unwrap().key;
        assert!(first_key < second_key);
    }

    #[tokio::test]
    async fn backward_direction_prepends_so_entries_stay_chronological() {
        let txn = InMemoryTxn::new();
        let log = crate::log::TracingLog;
        // Server hands back a reverse-chronological chunk for Backward.
        let events = vec![message_event("$newer", "@alice:example.org"), message_event("$older", "@alice:example.org")];
        let outcome = store_events(&txn, &events, EventKey::default_fragment_key(1), Direction::Backward, &ChunkState::default(), &log)
            .await
            .unwrap();

        let ids: Vec<_> = outcome.entries.iter().map(|e| e.as_event().unwrap().event_id().clone()).collect();
        assert_eq!(ids, vec![weft_proto::EventId::from("$older"), weft_proto::EventId::from("$newer")]);
    }

    #[tokio::test]
    async fn sender_resolved_from_older_chunk_event_takes_priority() {
        let txn = InMemoryTxn::new();
        let log = crate::log::TracingLog;
        let room: RoomId = "!room:example.org".into();
        let mut member = member_event("@alice:example.org", Some("Alice"), None);
        member.room_id = room.clone();
        let mut message = message_event("$a", "@alice:example.org");
        message.room_id = room;
        let events = vec![message, member];

        let outcome = store_events(&txn, &events, EventKey::default_fragment_key(1), Direction::Forward, &ChunkState::default(), &log)
            .await
            .unwrap();

        let first = outcome.entries[0].as_event().unwrap();
        assert_eq!(first.member.as_ref().unwrap().display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn sender_resolved_from_chunk_state_when_chunk_has_no_member_event() {
        let txn = InMemoryTxn::new();
        let log = crate::log::TracingLog;
        let chunk_state = ChunkState { state: vec![member_event("@alice:example.org", Some("Alice"), None)] };
        let events = vec![message_event("$a", "@alice:example.org")];

        let outcome = store_events(&txn, &events, EventKey::default_fragment_key(1), Direction::Forward, &chunk_state, &log).await.unwrap();
        let first = outcome.entries[0].as_event().unwrap();
        assert_eq!(first.member.as_ref().unwrap().display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn sender_falls_back_to_locally_stored_member_state() {
        let txn = InMemoryTxn::new();
        let log = crate::log::TracingLog;
        let room: RoomId = "!room:example.org".into();
        txn.seed_member(
            room.clone(),
            "@alice:example.org".into(),
            MemberSnapshot { display_name: Some("Alice".into()), avatar_url: None },
        );
        let mut message = message_event("$a", "@alice:example.org");
        message.room_id = room;
        let events = vec![message];

        let outcome = store_events(&txn, &events, EventKey::default_fragment_key(1), Direction::Forward, &ChunkState::default(), &log)
            .await
            .unwrap();
        let first = outcome.entries[0].as_event().unwrap();
        assert_eq!(first.member.as_ref().unwrap().display_name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn sender_with_no_member_info_anywhere_has_no_override() {
        let txn = InMemoryTxn::new();
        let log = crate::log::TracingLog;
        let events = vec![message_event("$a", "@alice:example.org")];

        let outcome = store_events(&txn, &events, EventKey::default_fragment_key(1), Direction::Forward, &ChunkState::default(), &log)
            .await
            .unwrap();
        let first = outcome.entries[0].as_event().unwrap();
        assert!(first.member.is_none());
    }
}
