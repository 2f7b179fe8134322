use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::ids::PaginationToken;

/// A `/messages` backfill response for a known fragment edge (spec §4.4.1,
/// §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub chunk: Vec<Event>,
    pub start: PaginationToken,
    pub end: Option<PaginationToken>,
    #[serde(default)]
    pub state: Vec<Event>,
}

/// A `/context` response centered on a specific event (spec §4.4.2, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub event: Event,
    pub events_before: Vec<Event>,
    pub events_after: Vec<Event>,
    pub start: PaginationToken,
    pub end: PaginationToken,
    #[serde(default)]
    pub state: Vec<Event>,
}
