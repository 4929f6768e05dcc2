//! Subtree discovery and cascading delete.
//!
//! Every descendant of an item at depth `d` carries that item's id in its
//! `ancestors[d]` slot, so one scan of the project's rows over that single
//! column finds the whole subtree. No parent-link walking is involved.

use crate::error::{EngineError, EngineResult};
use crate::store::RecordStore;
use crate::types::{ItemId, MAX_DEPTH, WorkItem};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Upper bound on scan passes. The comparison key never changes between
/// passes, so a maintained store settles on the second pass at the latest.
pub const MAX_SCAN_PASSES: usize = MAX_DEPTH;

/// Result of resolving a subtree against a project snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeScan {
    /// The root plus every row whose ancestor slot at the root's depth
    /// points at the root.
    pub ids: BTreeSet<ItemId>,
    /// Passes made before the set stopped growing.
    pub passes: usize,
}

/// Outcome of [`delete_subtree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub item_id: ItemId,
    pub deleted_count: usize,
    pub deleted_ids: Vec<ItemId>,
    pub scan_passes: usize,
    /// Rows whose `parent_id` chain leads into the deleted set but whose
    /// ancestor pointer does not. They are left in place.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stray_ids: Vec<ItemId>,
}

/// Compute the ids to remove when deleting `target`, given every row of its
/// project.
///
/// Rows are matched on `ancestors[target.depth] == target.id`, always against
/// the original target id. The scan repeats until the set stops growing,
/// bounded by [`MAX_SCAN_PASSES`]. With the invariant intact the first pass
/// finds everything and the second only confirms it; the re-scan stays as a
/// guard for rows written before the invariant was enforced.
pub fn resolve_subtree(target: &WorkItem, rows: &[WorkItem]) -> SubtreeScan {
    let column = target.depth;
    let mut ids = BTreeSet::from([target.id]);
    let mut passes = 0;

    loop {
        passes += 1;
        let before = ids.len();
        for row in rows {
            if row.ancestors.get(column) == target.id {
                ids.insert(row.id);
            }
        }
        if ids.len() == before || passes >= MAX_SCAN_PASSES {
            break;
        }
    }

    SubtreeScan { ids, passes }
}

/// Rows outside `ids` whose parent chain reaches into `ids`.
///
/// These exist only when ancestor pointers disagree with `parent_id`. The
/// delete does not touch them.
pub fn find_strays(ids: &BTreeSet<ItemId>, rows: &[WorkItem]) -> Vec<ItemId> {
    let parents: HashMap<ItemId, Option<ItemId>> =
        rows.iter().map(|r| (r.id, r.parent_item())).collect();

    rows.iter()
        .filter(|r| !ids.contains(&r.id))
        .filter(|r| {
            let mut cursor = r.parent_item();
            for _ in 0..MAX_DEPTH {
                match cursor {
                    Some(id) if ids.contains(&id) => return true,
                    Some(id) => cursor = parents.get(&id).copied().flatten(),
                    None => return false,
                }
            }
            false
        })
        .map(|r| r.id)
        .collect()
}

/// Delete `item_id` and its whole subtree.
///
/// Reads the project snapshot, resolves the subtree and removes it with one
/// bulk delete. Run inside a transaction: if the bulk delete fails, nothing
/// is removed.
pub fn delete_subtree<S: RecordStore + ?Sized>(
    store: &mut S,
    item_id: ItemId,
) -> EngineResult<DeleteReport> {
    let target = store.get(item_id)?.ok_or(EngineError::NotFound(item_id))?;
    let rows = store.get_all_by_project(target.project_id)?;

    let scan = resolve_subtree(&target, &rows);
    let stray_ids = find_strays(&scan.ids, &rows);
    if !stray_ids.is_empty() {
        warn!(
            item_id,
            project_id = target.project_id,
            strays = ?stray_ids,
            "rows reach the deleted subtree by parent_id only; leaving them in place"
        );
    }

    let deleted_count = store.bulk_delete(&scan.ids)?;
    debug!(
        item_id,
        depth = %target.depth,
        deleted_count,
        passes = scan.passes,
        "deleted subtree"
    );

    Ok(DeleteReport {
        item_id,
        deleted_count,
        deleted_ids: scan.ids.into_iter().collect(),
        scan_passes: scan.passes,
        stray_ids,
    })
}
