//! Timeline gap-filling and fragment-stitching engine.
//!
//! Given a backfill/context response from the server, this crate turns raw
//! events into stored [`weft_proto::EventStorageEntry`] records, stitches
//! fragments together across the overlap they discover, and maintains a
//! dynamic partial order over fragment ids so callers can sort entries from
//! different fragments without a full room-history scan. See
//! [`gap_writer::GapWriter`] for the entry points.

pub mod error;
pub mod fragment_id_comparer;
pub mod inserter;
pub mod linker;
pub mod log;
pub mod overlap;
pub mod storage_traits;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_support;

pub mod gap_writer;

pub use error::{GapWriterError, GapWriterResult};
pub use fragment_id_comparer::FragmentIdComparer;
pub use gap_writer::GapWriter;
pub use log::{GapWriterLog, TracingLog};
