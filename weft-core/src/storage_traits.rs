//! Collaborator interfaces consumed by the engine (spec §6). None of these
//! are implemented in this crate outside of `#[cfg(test)]` support — the
//! transactional storage layer, the relation writer, and member lookup are
//! all external collaborators per spec §1 Non-goals.

use async_trait::async_trait;
use weft_proto::{Direction, Event, EventId, EventKey, EventStorageEntry, Fragment, FragmentId, MemberSnapshot, RoomId, StorageError};

use crate::log::GapWriterLog;

/// `txn.timelineEvents` (spec §6).
#[async_trait]
pub trait TimelineEvents: Send + Sync {
    async fn insert(&self, entry: &EventStorageEntry) -> Result<(), StorageError>;

    async fn get_by_event_id(&self, room_id: &RoomId, id: &EventId) -> Result<Option<EventStorageEntry>, StorageError>;

    /// The first event in `ids` (in the given order) already stored for
    /// `room_id`, if any. The overlap detector relies on the returned id
    /// being a member of `ids` (spec §4.1 "Error conditions").
    async fn find_first_occurring_event_id(&self, room_id: &RoomId, ids: &[EventId]) -> Result<Option<EventId>, StorageError>;

    async fn first_events(&self, room_id: &RoomId, fragment_id: FragmentId, n: usize) -> Result<Vec<EventStorageEntry>, StorageError>;

    async fn last_events(&self, room_id: &RoomId, fragment_id: FragmentId, n: usize) -> Result<Vec<EventStorageEntry>, StorageError>;

    async fn events_after(&self, room_id: &RoomId, key: EventKey) -> Result<Vec<EventStorageEntry>, StorageError>;
}

/// `txn.timelineFragments` (spec §6).
#[async_trait]
pub trait TimelineFragments: Send + Sync {
    async fn add(&self, fragment: &Fragment) -> Result<(), StorageError>;

    async fn update(&self, fragment: &Fragment) -> Result<(), StorageError>;

    async fn get(&self, room_id: &RoomId, id: FragmentId) -> Result<Option<Fragment>, StorageError>;

    async fn get_max_fragment_id(&self, room_id: &RoomId) -> Result<Option<FragmentId>, StorageError>;
}

/// `relationWriter.writeGapRelation` (spec §6). Relation deduplication is
/// delegated entirely to the implementor (spec §1 Non-goals); this call may
/// return other entries that were mutated as a side effect (e.g. a reaction
/// count bumped on its target).
#[async_trait]
pub trait RelationWriter: Send + Sync {
    async fn write_gap_relation(
        &self,
        entry: &EventStorageEntry,
        direction: Direction,
        log: &dyn GapWriterLog,
    ) -> Result<Vec<EventStorageEntry>, StorageError>;
}

/// Member-event lookup for attaching sender display names (spec §1: "member
/// event lookup for attaching sender display names" is named explicitly as
/// an external collaborator). Consulted only as the last resort in sender
/// resolution (spec §4.2.1), after the chunk and `chunkState` have both
/// been scanned.
#[async_trait]
pub trait MemberLookup: Send + Sync {
    async fn display_name_for(&self, room_id: &RoomId, sender: &weft_proto::UserId) -> Result<Option<MemberSnapshot>, StorageError>;
}

/// The state events the server included alongside a chunk (spec §4.2.1
/// step 3), bundled with the original chunk the engine will scan.
#[derive(Debug, Clone, Default)]
pub struct ChunkState {
    pub state: Vec<Event>,
}

/// One caller-provided read-write transaction covering the object stores
/// named in spec §5: `{roomMembers, pendingEvents, timelineEvents,
/// timelineRelations, timelineFragments}`. The engine borrows this for the
/// duration of one `write_fragment_fill`/`write_context` call and never
/// commits it itself (spec §5 "Transactions").
pub trait TimelineTxn: Send + Sync {
    fn events(&self) -> &dyn TimelineEvents;
    fn fragments(&self) -> &dyn TimelineFragments;
    fn relations(&self) -> &dyn RelationWriter;
    fn members(&self) -> &dyn MemberLookup;
}
