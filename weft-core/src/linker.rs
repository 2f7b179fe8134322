//! `FragmentLinker` (spec §4.3): mutates two `FragmentBoundaryEntry`s to
//! create a verified link, clearing both pagination tokens and refusing any
//! mutation that would overwrite an existing, conflicting link.

use weft_proto::{directional_append, FragmentBoundaryEntry, Fragment, PaginationToken, TimelineEntry};

use crate::error::{GapWriterError, GapWriterResult};
use crate::storage_traits::TimelineTxn;

/// `updateFragments(fragment_entry, neighbour_fragment_entry?, end_token,
/// entries, txn)` → `changed_fragments[]` (spec §4.3).
pub async fn update_fragments(
    txn: &dyn TimelineTxn,
    mut fragment_entry: FragmentBoundaryEntry,
    neighbour_fragment_entry: Option<FragmentBoundaryEntry>,
    end_token: Option<PaginationToken>,
    entries: &mut Vec<TimelineEntry>,
) -> GapWriterResult<Vec<Fragment>> {
    let direction = fragment_entry.direction;
    directional_append(entries, TimelineEntry::FragmentBoundary(fragment_entry.clone()), direction);

    let mut changed_fragments = Vec::new();

    match neighbour_fragment_entry {
        Some(mut neighbour) => {
            link_one_side(&mut fragment_entry, &neighbour)?;
            link_one_side(&mut neighbour, &fragment_entry)?;

            fragment_entry.set_token(None);
            neighbour.set_token(None);

            txn.fragments().update(&neighbour.fragment).await?;
            directional_append(entries, TimelineEntry::FragmentBoundary(neighbour.clone()), neighbour.direction);

            changed_fragments.push(fragment_entry.fragment.clone());
            changed_fragments.push(neighbour.fragment.clone());
        }
        None => {
            fragment_entry.set_token(end_token);
        }
    }

    txn.fragments().update(&fragment_entry.fragment).await?;
    if changed_fragments.is_empty() {
        changed_fragments.push(fragment_entry.fragment.clone());
    }

    Ok(changed_fragments)
}

/// Set `entry.linked_fragment_id` to `other`'s id, or confirm the existing
/// link already points there. Never silently overwrites a conflicting link
/// (spec §4.3 step 2, §7 "Link conflict").
fn link_one_side(entry: &mut FragmentBoundaryEntry, other: &FragmentBoundaryEntry) -> GapWriterResult<()> {
    match entry.linked_fragment_id() {
        None => {
            entry.set_linked_fragment_id(Some(other.fragment_id()));
            Ok(())
        }
        Some(existing) if existing == other.fragment_id() => Ok(()),
        Some(existing) => Err(GapWriterError::LinkConflict { fragment: entry.fragment_id(), existing, attempted: other.fragment_id() }),
    }
}
