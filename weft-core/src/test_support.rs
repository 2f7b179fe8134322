//! A minimal in-memory implementation of the collaborator traits (spec §6),
//! used by this crate's own test suite so the engine can be exercised
//! without a real transactional storage backend. Not part of the public
//! API contract — a real host application implements these traits against
//! its actual storage engine.

use std::sync::Mutex;

use async_trait::async_trait;
use weft_proto::{
    Direction, EventId, EventKey, EventStorageEntry, Fragment, FragmentId, MemberSnapshot, PaginationToken, RoomId, StorageError, UserId,
};

use crate::log::GapWriterLog;
use crate::storage_traits::{MemberLookup, RelationWriter, TimelineEvents, TimelineFragments, TimelineTxn};

pub fn fragment(id: FragmentId, previous_id: Option<FragmentId>, next_id: Option<FragmentId>, room_id: &RoomId) -> Fragment {
    Fragment { id, room_id: room_id.clone(), previous_id, next_id, previous_token: None, next_token: None, edge_reached: false }
}

#[derive(Default)]
struct State {
    events: Vec<EventStorageEntry>,
    fragments: Vec<Fragment>,
    members: std::collections::HashMap<(RoomId, UserId), MemberSnapshot>,
    bogus_duplicate: Option<EventId>,
    fragment_writes: usize,
}

/// `RecordingLog` accumulates warnings for assertions (e.g. "self-link
/// avoidance" in spec §8 scenario 4, "fully overlapping chunk" in spec §7).
/// Cloning shares the same underlying message list, so a clone can be moved
/// into a `GapWriter` while the original stays in the test for assertions.
#[derive(Default, Clone)]
pub struct RecordingLog {
    pub messages: std::sync::Arc<Mutex<Vec<String>>>,
}

impl GapWriterLog for RecordingLog {
    fn warn(&self, message: &str) { self.messages.lock().unwrap().push(message.to_string()); }
}

pub struct InMemoryTxn {
    state: Mutex<State>,
}

impl InMemoryTxn {
    pub fn new() -> Self { Self { state: Mutex::new(State::default()) } }

    pub fn seed_event(&self, entry: EventStorageEntry) { self.state.lock().unwrap().events.push(entry); }

    pub fn seed_fragment(&self, fragment: Fragment) { self.state.lock().unwrap().fragments.push(fragment); }

    pub fn seed_member(&self, room_id: RoomId, user_id: UserId, snapshot: MemberSnapshot) {
        self.state.lock().unwrap().members.insert((room_id, user_id), snapshot);
    }

    /// Forces `find_first_occurring_event_id` to report an id that is not
    /// actually present in whatever chunk it's asked about next, to
    /// exercise the "Error conditions" path in spec §4.1.
    pub fn force_bogus_duplicate(&self, id: EventId) { self.state.lock().unwrap().bogus_duplicate = Some(id); }

    pub fn all_events(&self) -> Vec<EventStorageEntry> { self.state.lock().unwrap().events.clone() }

    pub fn get_fragment(&self, id: FragmentId) -> Option<Fragment> { self.state.lock().unwrap().fragments.iter().find(|f| f.id == id).cloned() }

    pub fn fragment_write_count(&self) -> usize { self.state.lock().unwrap().fragment_writes }
}

#[async_trait]
impl TimelineEvents for InMemoryTxn {
    async fn insert(&self, entry: &EventStorageEntry) -> Result<(), StorageError> {
        self.state.lock().unwrap().events.push(entry.clone());
        Ok(())
    }

    async fn get_by_event_id(&self, room_id: &RoomId, id: &EventId) -> Result<Option<EventStorageEntry>, StorageError> {
        Ok(self.state.lock().unwrap().events.iter().find(|e| &e.room_id == room_id && e.event_id() == id).cloned())
    }

    async fn find_first_occurring_event_id(&self, room_id: &RoomId, ids: &[EventId]) -> Result<Option<EventId>, StorageError> {
        let state = self.state.lock().unwrap();
        if let Some(bogus) = &state.bogus_duplicate {
            return Ok(Some(bogus.clone()));
        }
        for id in ids {
            if state.events.iter().any(|e| &e.room_id == room_id && e.event_id() == id) {
                return Ok(Some(id.clone()));
            }
        }
        Ok(None)
    }

    async fn first_events(&self, room_id: &RoomId, fragment_id: FragmentId, n: usize) -> Result<Vec<EventStorageEntry>, StorageError> {
        let state = self.state.lock().unwrap();
        let mut matching: Vec<_> = state.events.iter().filter(|e| &e.room_id == room_id && e.key.fragment_id == fragment_id).cloned().collect();
        matching.sort_by_key(|e| e.key);
        matching.truncate(n);
        Ok(matching)
    }

    async fn last_events(&self, room_id: &RoomId, fragment_id: FragmentId, n: usize) -> Result<Vec<EventStorageEntry>, StorageError> {
        let state = self.state.lock().unwrap();
        let mut matching: Vec<_> = state.events.iter().filter(|e| &e.room_id == room_id && e.key.fragment_id == fragment_id).cloned().collect();
        matching.sort_by_key(|e| std::cmp::Reverse(e.key));
        matching.truncate(n);
        Ok(matching)
    }

    async fn events_after(&self, room_id: &RoomId, key: EventKey) -> Result<Vec<EventStorageEntry>, StorageError> {
        let state = self.state.lock().unwrap();
        let mut matching: Vec<_> =
            state.events.iter().filter(|e| &e.room_id == room_id && e.key.fragment_id == key.fragment_id && e.key > key).cloned().collect();
        matching.sort_by_key(|e| e.key);
        Ok(matching)
    }
}

#[async_trait]
impl TimelineFragments for InMemoryTxn {
    async fn add(&self, fragment: &Fragment) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.fragment_writes += 1;
        state.fragments.push(fragment.clone());
        Ok(())
    }

    async fn update(&self, fragment: &Fragment) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.fragment_writes += 1;
        if let Some(existing) = state.fragments.iter_mut().find(|f| f.id == fragment.id) {
            *existing = fragment.clone();
        } else {
            state.fragments.push(fragment.clone());
        }
        Ok(())
    }

    async fn get(&self, room_id: &RoomId, id: FragmentId) -> Result<Option<Fragment>, StorageError> {
        Ok(self.state.lock().unwrap().fragments.iter().find(|f| &f.room_id == room_id && f.id == id).cloned())
    }

    async fn get_max_fragment_id(&self, room_id: &RoomId) -> Result<Option<FragmentId>, StorageError> {
        Ok(self.state.lock().unwrap().fragments.iter().filter(|f| &f.room_id == room_id).map(|f| f.id).max())
    }
}

pub struct NoopRelationWriter;

#[async_trait]
impl RelationWriter for NoopRelationWriter {
    async fn write_gap_relation(
        &self,
        _entry: &EventStorageEntry,
        _direction: Direction,
        _log: &dyn GapWriterLog,
    ) -> Result<Vec<EventStorageEntry>, StorageError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl MemberLookup for InMemoryTxn {
    async fn display_name_for(&self, room_id: &RoomId, sender: &UserId) -> Result<Option<MemberSnapshot>, StorageError> {
        Ok(self.state.lock().unwrap().members.get(&(room_id.clone(), sender.clone())).cloned())
    }
}

impl TimelineTxn for InMemoryTxn {
    fn events(&self) -> &dyn TimelineEvents { self }
    fn fragments(&self) -> &dyn TimelineFragments { self }
    fn relations(&self) -> &dyn RelationWriter {
        // A fresh no-op writer each call is fine: it carries no state, and
        // the trait object is only ever borrowed for the duration of one
        // call. A real storage backend would own a real `RelationWriter`
        // implementation alongside its other collaborator trait objects.
        const WRITER: NoopRelationWriter = NoopRelationWriter;
        &WRITER
    }
    fn members(&self) -> &dyn MemberLookup { self }
}

pub fn token(s: &str) -> PaginationToken { s.into() }
