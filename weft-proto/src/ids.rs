use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, concat!(stringify!($name), "({:?})"), self.0) }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self { Self(s) }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self { Self(s.to_string()) }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str { &self.0 }
        }
    };
}

opaque_string_id!(EventId, "A globally unique Matrix event ID, e.g. `$abc123:example.org`.");
opaque_string_id!(RoomId, "A Matrix room ID, e.g. `!abc123:example.org`.");
opaque_string_id!(UserId, "A Matrix user ID, e.g. `@alice:example.org`.");

/// An opaque server-provided pagination cursor. Never inspected, only
/// compared for equality (the "token guard" in `GapWriter::write_fragment_fill`)
/// and passed back verbatim on the next request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationToken(String);

impl PaginationToken {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl fmt::Debug for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "PaginationToken({:?})", self.0) }
}

impl From<String> for PaginationToken {
    fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for PaginationToken {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}
