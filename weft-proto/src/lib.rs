pub mod boundary;
pub mod direction;
pub mod entries;
pub mod error;
pub mod event;
pub mod event_key;
pub mod fragment;
pub mod ids;
pub mod response;

pub use boundary::FragmentBoundaryEntry;
pub use direction::Direction;
pub use entries::{directional_append, TimelineEntry};
pub use error::StorageError;
pub use event::{Event, EventStorageEntry, MemberSnapshot, RelationTarget};
pub use event_key::EventKey;
pub use fragment::{Fragment, FragmentId};
pub use ids::{EventId, PaginationToken, RoomId, UserId};
pub use response::{ContextResponse, MessagesResponse};
