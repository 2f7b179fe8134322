use crate::direction::Direction;
use crate::fragment::{Fragment, FragmentId};
use crate::ids::PaginationToken;

/// A transient view of "one end of a fragment": the fragment plus a
/// direction bit. Must not outlive the transaction it was produced in
/// (spec §9 "Ownership of Fragment records") — accordingly this holds an
/// owned snapshot of the `Fragment` as read within the current transaction,
/// not a long-lived reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentBoundaryEntry {
    pub fragment: Fragment,
    pub direction: Direction,
}

impl FragmentBoundaryEntry {
    pub fn new(fragment: Fragment, direction: Direction) -> Self { Self { fragment, direction } }

    pub fn fragment_id(&self) -> FragmentId { self.fragment.id }

    pub fn token(&self) -> Option<&PaginationToken> { self.fragment.token(self.direction) }

    pub fn linked_fragment_id(&self) -> Option<FragmentId> { self.fragment.linked_fragment_id(self.direction) }

    pub fn has_linked_fragment(&self) -> bool { self.linked_fragment_id().is_some() }

    pub fn set_token(&mut self, token: Option<PaginationToken>) { self.fragment.set_token(self.direction, token) }

    pub fn set_linked_fragment_id(&mut self, id: Option<FragmentId>) { self.fragment.set_linked_fragment_id(self.direction, id) }
}
