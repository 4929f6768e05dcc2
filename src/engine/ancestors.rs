//! Ancestor-pointer maintenance on item creation.

use crate::error::{EngineError, EngineResult};
use crate::store::RecordStore;
use crate::types::{
    Ancestors, Depth, ItemId, ItemPayload, NewItem, ProjectId, RowPatch, WorkItem, now_ms,
};
use tracing::debug;

/// Create a work item at `depth` under `parent_id`.
///
/// For tasks (`depth == 1`) the parent is the project itself: `parent_id` is
/// ignored and the project id is stored in its place. Deeper items must name
/// an existing item one level up in the same project.
///
/// The row is inserted with a zero placeholder at its own depth and then
/// patched with its assigned id. Callers run this inside one transaction so
/// the placeholder is never visible.
pub fn create_item<S: RecordStore + ?Sized>(
    store: &mut S,
    project_id: ProjectId,
    parent_id: ItemId,
    depth: i64,
    payload: ItemPayload,
) -> EngineResult<WorkItem> {
    let depth = Depth::try_from(depth)?;

    let (parent_id, mut ancestors) = match depth.parent() {
        None => (project_id, Ancestors::EMPTY),
        Some(parent_depth) => {
            let parent = store
                .get(parent_id)?
                .filter(|p| p.project_id == project_id && p.depth == parent_depth)
                .ok_or(EngineError::ParentNotFound {
                    project_id,
                    parent_id,
                })?;
            (parent.id, parent.ancestors)
        }
    };
    ancestors.set(depth, 0);

    let id = store.insert(&NewItem {
        project_id,
        parent_id,
        depth,
        ancestors,
        payload,
        created_at: now_ms(),
    })?;

    ancestors.set(depth, id);
    if !store.update(id, &RowPatch::ancestors(ancestors))? {
        return Err(EngineError::NotFound(id));
    }

    let item = store.get(id)?.ok_or(EngineError::NotFound(id))?;
    debug!(
        item_id = id,
        project_id,
        depth = %depth,
        ancestors = ?item.ancestors.slots(),
        "created work item"
    );
    Ok(item)
}
