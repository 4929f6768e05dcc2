//! Business-field edits.

use crate::error::{EngineError, EngineResult};
use crate::store::RecordStore;
use crate::types::{Depth, ItemId, ItemPatch, RowPatch, WorkItem, now_ms};
use tracing::debug;

/// Apply `patch` to an item's business fields.
///
/// When the estimate of an item below depth 1 changes, the value it had
/// before this edit is kept in `estimate_prev`. Only one prior value is
/// retained. Tasks never record it.
pub fn update_item<S: RecordStore + ?Sized>(
    store: &mut S,
    item_id: ItemId,
    patch: &ItemPatch,
) -> EngineResult<WorkItem> {
    let item = store.get(item_id)?.ok_or(EngineError::NotFound(item_id))?;
    if patch.is_empty() {
        return Ok(item);
    }

    let payload = patch.apply(&item.payload);
    let estimate_changed = payload.estimate_hours != item.payload.estimate_hours;
    let estimate_prev = (estimate_changed && item.depth != Depth::Task)
        .then_some(item.payload.estimate_hours);

    let row_patch = RowPatch {
        payload: Some(payload),
        estimate_prev,
        updated_at: Some(now_ms()),
        ..RowPatch::default()
    };
    if !store.update(item_id, &row_patch)? {
        return Err(EngineError::NotFound(item_id));
    }

    debug!(item_id, estimate_changed, "updated work item");
    store.get(item_id)?.ok_or(EngineError::NotFound(item_id))
}
