use crate::boundary::FragmentBoundaryEntry;
use crate::direction::Direction;
use crate::event::EventStorageEntry;

/// One item appended to the `entries` sequence the engine returns. Spec §9:
/// "`EventEntry`/`FragmentBoundaryEntry` are distinct variants emitted into
/// the `entries` sequence and callers discriminate on the variant" — rather
/// than duck-typing on shape, callers match on this enum.
#[derive(Debug, Clone)]
pub enum TimelineEntry {
    Event(EventStorageEntry),
    FragmentBoundary(FragmentBoundaryEntry),
}

impl TimelineEntry {
    pub fn as_event(&self) -> Option<&EventStorageEntry> {
        match self {
            TimelineEntry::Event(e) => Some(e),
            TimelineEntry::FragmentBoundary(_) => None,
        }
    }

    pub fn as_fragment_boundary(&self) -> Option<&FragmentBoundaryEntry> {
        match self {
            TimelineEntry::Event(_) => None,
            TimelineEntry::FragmentBoundary(b) => Some(b),
        }
    }
}

impl From<EventStorageEntry> for TimelineEntry {
    fn from(e: EventStorageEntry) -> Self { TimelineEntry::Event(e) }
}

impl From<FragmentBoundaryEntry> for TimelineEntry {
    fn from(b: FragmentBoundaryEntry) -> Self { TimelineEntry::FragmentBoundary(b) }
}

/// Pure helper: push `value` onto `sequence` respecting `direction` — append
/// to the tail for `Forward`, prepend for `Backward`. Spec §9: "isolate it:
/// every list of entries produced by the engine passes through it." Every
/// site that builds the `entries` output routes through this function
/// rather than calling `push`/`insert` directly.
pub fn directional_append<T>(sequence: &mut Vec<T>, value: T, direction: Direction) {
    if direction.is_forward() {
        sequence.push(value);
    } else {
        sequence.insert(0, value);
    }
}
