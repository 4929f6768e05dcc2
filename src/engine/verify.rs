//! Ancestor-pointer invariant checks over a project snapshot.

use crate::types::{Depth, ItemId, WorkItem};
use serde::Serialize;
use std::collections::HashMap;

/// One broken rule on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// `ancestors[depth]` is not the row's own id.
    MissingSelfPointer { item_id: ItemId, found: ItemId },
    /// A slot deeper than the row's depth is populated.
    DeepSlotSet { item_id: ItemId, depth: i64, found: ItemId },
    /// The populated slots imply a different depth than the stored one.
    DepthMismatch { item_id: ItemId, stored: i64, implied: i64 },
    /// The parent row is absent, in another project, or at the wrong depth.
    ParentMissing { item_id: ItemId, parent_id: ItemId },
    /// A shallower slot disagrees with the parent's slot at that depth.
    AncestorMismatch {
        item_id: ItemId,
        depth: i64,
        expected: ItemId,
        found: ItemId,
    },
}

impl Violation {
    pub fn item_id(&self) -> ItemId {
        match *self {
            Violation::MissingSelfPointer { item_id, .. }
            | Violation::DeepSlotSet { item_id, .. }
            | Violation::DepthMismatch { item_id, .. }
            | Violation::ParentMissing { item_id, .. }
            | Violation::AncestorMismatch { item_id, .. } => item_id,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::MissingSelfPointer { found, .. } => {
                write!(f, "own slot holds {} instead of the item id", found)
            }
            Violation::DeepSlotSet { depth, found, .. } => {
                write!(f, "slot {} below the item's depth holds {}", depth, found)
            }
            Violation::DepthMismatch { stored, implied, .. } => {
                write!(f, "stored depth {} but slots imply {}", stored, implied)
            }
            Violation::ParentMissing { parent_id, .. } => {
                write!(f, "parent {} missing or at the wrong depth", parent_id)
            }
            Violation::AncestorMismatch {
                depth,
                expected,
                found,
                ..
            } => write!(
                f,
                "slot {} holds {} but the parent chain says {}",
                depth, found, expected
            ),
        }
    }
}

/// Check every row of one project against the ancestor-pointer invariant.
pub fn verify_rows(rows: &[WorkItem]) -> Vec<Violation> {
    let by_id: HashMap<ItemId, &WorkItem> = rows.iter().map(|r| (r.id, r)).collect();
    let mut out = Vec::new();

    for row in rows {
        let own = row.ancestors.get(row.depth);
        if own != row.id {
            out.push(Violation::MissingSelfPointer {
                item_id: row.id,
                found: own,
            });
        }

        for depth in Depth::ALL.iter().copied().filter(|d| *d > row.depth) {
            let found = row.ancestors.get(depth);
            if found != 0 {
                out.push(Violation::DeepSlotSet {
                    item_id: row.id,
                    depth: depth.as_i64(),
                    found,
                });
            }
        }

        let implied = row.ancestors.classify();
        if implied != row.depth {
            out.push(Violation::DepthMismatch {
                item_id: row.id,
                stored: row.depth.as_i64(),
                implied: implied.as_i64(),
            });
        }

        let Some(parent_depth) = row.depth.parent() else {
            continue;
        };
        let parent = by_id
            .get(&row.parent_id)
            .filter(|p| p.project_id == row.project_id && p.depth == parent_depth);
        let Some(parent) = parent else {
            out.push(Violation::ParentMissing {
                item_id: row.id,
                parent_id: row.parent_id,
            });
            continue;
        };

        for depth in Depth::ALL.iter().copied().filter(|d| *d < row.depth) {
            let expected = parent.ancestors.get(depth);
            let found = row.ancestors.get(depth);
            if expected != found {
                out.push(Violation::AncestorMismatch {
                    item_id: row.id,
                    depth: depth.as_i64(),
                    expected,
                    found,
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::create_item;
    use crate::store::{MemoryStore, RecordStore};
    use crate::types::{Ancestors, ItemPayload};

    #[test]
    fn engine_built_rows_are_clean() {
        let mut store = MemoryStore::new();
        let t = create_item(&mut store, 1, 0, 1, ItemPayload::new("T")).unwrap();
        let s = create_item(&mut store, 1, t.id, 2, ItemPayload::new("S")).unwrap();
        let a = create_item(&mut store, 1, s.id, 3, ItemPayload::new("A")).unwrap();
        create_item(&mut store, 1, a.id, 4, ItemPayload::new("Z")).unwrap();

        let rows = store.get_all_by_project(1).unwrap();
        assert!(verify_rows(&rows).is_empty());
    }

    #[test]
    fn reports_placeholder_left_behind() {
        let mut store = MemoryStore::new();
        let t = create_item(&mut store, 1, 0, 1, ItemPayload::new("T")).unwrap();
        let mut s = create_item(&mut store, 1, t.id, 2, ItemPayload::new("S")).unwrap();
        s.ancestors = Ancestors::new([t.id, 0, 0, 0]);

        let violations = verify_rows(&[t, s.clone()]);

        assert!(violations.contains(&Violation::MissingSelfPointer {
            item_id: s.id,
            found: 0
        }));
        assert!(violations.contains(&Violation::DepthMismatch {
            item_id: s.id,
            stored: 2,
            implied: 1
        }));
    }

    #[test]
    fn reports_wrong_inherited_slot_and_missing_parent() {
        let mut store = MemoryStore::new();
        let t = create_item(&mut store, 1, 0, 1, ItemPayload::new("T")).unwrap();
        let s = create_item(&mut store, 1, t.id, 2, ItemPayload::new("S")).unwrap();
        let mut a = create_item(&mut store, 1, s.id, 3, ItemPayload::new("A")).unwrap();
        a.ancestors = Ancestors::new([99, s.id, a.id, 0]);

        let violations = verify_rows(&[t.clone(), s.clone(), a.clone()]);
        assert_eq!(
            violations,
            vec![Violation::AncestorMismatch {
                item_id: a.id,
                depth: 1,
                expected: t.id,
                found: 99
            }]
        );

        let violations = verify_rows(&[t, a.clone()]);
        assert_eq!(violations[0].item_id(), a.id);
        assert!(matches!(violations[0], Violation::ParentMissing { .. }));
    }
}
