use serde::{Deserialize, Serialize};

use crate::event_key::EventKey;
use crate::ids::{EventId, RoomId, UserId};

/// A server-side event. `content`/`prev_content` are treated as opaque bags
/// of fields (spec §3) — this layer never interprets them beyond the
/// membership-content scanning done in sender resolution (spec §4.2.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub room_id: RoomId,
    pub sender: UserId,
    #[serde(rename = "type")]
    pub event_type: String,
    pub state_key: Option<String>,
    pub content: serde_json::Value,
    pub prev_content: Option<serde_json::Value>,
}

impl Event {
    /// `true` for `m.room.member` events, which is all sender resolution
    /// (spec §4.2.1) ever looks at.
    pub fn is_member_event(&self) -> bool { self.event_type == "m.room.member" && self.state_key.is_some() }
}

/// Display-name/avatar snapshot stamped onto a stored event at insert time,
/// per spec §4.2 step 3. `None` if no membership info could be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl MemberSnapshot {
    /// Build a snapshot from an `m.room.member` event's content (or
    /// prev_content, for the "replacing" resolution branch).
    pub fn from_member_content(content: &serde_json::Value) -> Self {
        let display_name = content.get("displayname").and_then(|v| v.as_str()).map(str::to_owned);
        let avatar_url = content.get("avatar_url").and_then(|v| v.as_str()).map(str::to_owned);
        Self { display_name, avatar_url }
    }
}

/// Opaque bookkeeping the relation writer attaches to an entry whose event
/// targets another event via `m.relates_to`. Deduplication of relations is
/// delegated to that collaborator (spec §1 Non-goals); this layer only
/// carries whatever target id it reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTarget {
    pub target_event_id: EventId,
}

/// An `Event` plus an `EventKey`, a member snapshot, and optional relation
/// bookkeeping. Exactly one per `event_id` per room once stored (spec §3).
/// Immutable after insert except the relation fields, which are owned by
/// the relation writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStorageEntry {
    pub key: EventKey,
    pub room_id: RoomId,
    pub event: Event,
    pub member: Option<MemberSnapshot>,
    pub relation: Option<RelationTarget>,
}

impl EventStorageEntry {
    pub fn new(key: EventKey, room_id: RoomId, event: Event) -> Self { Self { key, room_id, event, member: None, relation: None } }

    pub fn event_id(&self) -> &EventId { &self.event.event_id }
}
