//! `FragmentIdComparer` — a dynamic partial order over fragment ids within
//! one room, rebuilt whenever fragment links change (spec §4.5).
//!
//! The fragment graph is always a collection of simple doubly-linked lists
//! (each fragment has at most one `previous_id` and one `next_id`), never a
//! branching tree, so "rebuild the chain containing a changed fragment" is
//! a backward walk to the head followed by a forward walk to the tail —
//! no general graph traversal is needed.
//!
//! This is process-wide shared state (spec §5 "Shared state"): mutate it
//! only via [`FragmentIdComparer::apply_changes`], and only after the
//! transaction that produced the `changed_fragments` list has committed.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;
use weft_proto::{Fragment, FragmentId};

/// Most chains touched by a single write are a handful of fragments; this
/// keeps `discover_chain` off the heap for the common case.
type Chain = SmallVec<[FragmentId; 8]>;

#[derive(Debug, Clone, Copy)]
struct ChainMembership {
    chain_id: u64,
    rank: i64,
}

#[derive(Debug, Default)]
pub struct FragmentIdComparer {
    known: HashMap<FragmentId, Fragment>,
    membership: HashMap<FragmentId, ChainMembership>,
    next_chain_id: u64,
    /// Counts fragments visited by `discover_chain` across this comparer's
    /// lifetime — single-threaded (spec §5), so a `Cell` is enough. Exists
    /// purely so tests can assert a rebuild stays `O(touched chain)` rather
    /// than re-walking every fragment the comparer has ever seen.
    rebuild_visits: Cell<u64>,
}

impl FragmentIdComparer {
    pub fn new() -> Self { Self::default() }

    /// Incorporate a batch of fragments that changed together (the
    /// `fragments` list returned by `writeFragmentFill`/`writeContext`),
    /// rebuilding the rank of every chain any of them belongs to. Touches
    /// only those chains — O(n) over the chains containing `changed`, not
    /// over every fragment the comparer has ever seen.
    pub fn apply_changes(&mut self, changed: &[Fragment]) {
        for fragment in changed {
            self.known.insert(fragment.id, fragment.clone());
        }

        let mut visited = HashSet::new();
        for fragment in changed {
            if visited.contains(&fragment.id) {
                continue;
            }
            let chain = self.discover_chain(fragment.id, &mut visited);
            self.assign_ranks(chain);
        }
    }

    /// Compare two fragment ids. `None` means they are not (yet) known to
    /// be in the same linked chain — callers must treat that as
    /// "incomparable", not as an error.
    pub fn compare(&self, a: FragmentId, b: FragmentId) -> Option<Ordering> {
        if a == b {
            return Some(Ordering::Equal);
        }
        let ma = self.membership.get(&a)?;
        let mb = self.membership.get(&b)?;
        if ma.chain_id != mb.chain_id {
            return None;
        }
        Some(ma.rank.cmp(&mb.rank))
    }

    /// Total fragments visited by `discover_chain` across this comparer's
    /// lifetime. Test-only instrumentation for the "rebuild stays bounded
    /// to the touched chain" property (spec §4.5).
    pub fn rebuild_visit_count(&self) -> u64 { self.rebuild_visits.get() }

    fn record_visit(&self) { self.rebuild_visits.set(self.rebuild_visits.get() + 1); }

    fn discover_chain(&self, start: FragmentId, visited: &mut HashSet<FragmentId>) -> Chain {
        // Walk backward to the head of the chain.
        let mut head = start;
        loop {
            self.record_visit();
            let Some(previous) = self.known.get(&head).and_then(|f| f.previous_id) else { break };
            if !self.known.contains_key(&previous) || previous == head {
                break;
            }
            head = previous;
        }

        // Walk forward from the head, collecting the ordered chain.
        let mut chain = Chain::new();
        let mut current = Some(head);
        while let Some(id) = current {
            if !visited.insert(id) {
                break; // guards against a malformed cycle
            }
            self.record_visit();
            chain.push(id);
            current = self.known.get(&id).and_then(|f| f.next_id).filter(|next| self.known.contains_key(next));
        }
        chain
    }

    fn assign_ranks(&mut self, chain: Chain) {
        let chain_id = self.next_chain_id;
        self.next_chain_id += 1;
        for (rank, id) in chain.into_iter().enumerate() {
            self.membership.insert(id, ChainMembership { chain_id, rank: rank as i64 });
        }
    }
}
