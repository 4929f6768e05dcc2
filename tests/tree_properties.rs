//! Property tests over randomly grown forests.
//!
//! Forests are grown through the engine on a `MemoryStore`, so every row is
//! one the engine itself wrote.

use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use task_tree::engine::{build_tree, create_item, delete_subtree, flatten, verify_rows};
use task_tree::store::{MemoryStore, RecordStore};
use task_tree::types::{Depth, ItemId, ItemPayload, WorkItem};

const PROJECTS: [i64; 2] = [1, 2];

/// One growth step: which project, and a selector that either starts a new
/// task or picks an existing non-leaf item as parent.
fn steps() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..PROJECTS.len(), any::<usize>()), 1..48)
}

fn grow(steps: &[(usize, usize)]) -> MemoryStore {
    let mut store = MemoryStore::new();
    let mut parents: HashMap<i64, Vec<(ItemId, Depth)>> = HashMap::new();

    for (n, (project_idx, pick)) in steps.iter().enumerate() {
        let project_id = PROJECTS[*project_idx];
        let candidates = parents.entry(project_id).or_default();
        let choice = pick % (candidates.len() + 1);

        let (parent_id, depth) = match choice {
            0 => (0, Depth::Task),
            i => {
                let (id, d) = candidates[i - 1];
                (id, d.child().unwrap_or(Depth::SubActionItem))
            }
        };

        let item = create_item(
            &mut store,
            project_id,
            parent_id,
            depth.as_i64(),
            ItemPayload::new(format!("item {n}")),
        )
        .unwrap();
        if item.depth != Depth::SubActionItem {
            candidates.push((item.id, item.depth));
        }
    }

    store
}

fn rows(store: &MemoryStore, project_id: i64) -> Vec<WorkItem> {
    store.get_all_by_project(project_id).unwrap()
}

/// Ids reachable from `root` by following `parent_id` links downwards.
fn descendants_by_parent(rows: &[WorkItem], root: ItemId) -> BTreeSet<ItemId> {
    let mut found = BTreeSet::from([root]);
    loop {
        let before = found.len();
        for row in rows {
            if row.parent_item().is_some_and(|p| found.contains(&p)) {
                found.insert(row.id);
            }
        }
        if found.len() == before {
            return found;
        }
    }
}

proptest! {
    #[test]
    fn prop_engine_rows_hold_the_invariant(steps in steps()) {
        let store = grow(&steps);
        for project_id in PROJECTS {
            let rows = rows(&store, project_id);
            prop_assert!(verify_rows(&rows).is_empty());

            let by_id: HashMap<ItemId, &WorkItem> = rows.iter().map(|r| (r.id, r)).collect();
            for row in &rows {
                prop_assert_eq!(row.ancestors.get(row.depth), row.id);
                for depth in Depth::ALL.iter().copied().filter(|d| *d > row.depth) {
                    prop_assert_eq!(row.ancestors.get(depth), 0);
                }
                if let Some(parent) = row.parent_item() {
                    let parent = by_id[&parent];
                    for depth in Depth::ALL.iter().copied().filter(|d| *d < row.depth) {
                        prop_assert_eq!(row.ancestors.get(depth), parent.ancestors.get(depth));
                    }
                }
            }
        }
    }

    #[test]
    fn prop_tree_round_trips_every_row(steps in steps()) {
        let store = grow(&steps);
        for project_id in PROJECTS {
            let rows = rows(&store, project_id);
            let tree = build_tree(&rows);

            let mut flat: Vec<ItemId> = flatten(&tree).iter().map(|r| r.id).collect();
            flat.sort_unstable();
            let expected: Vec<ItemId> = rows.iter().map(|r| r.id).collect();
            prop_assert_eq!(flat, expected);
        }
    }

    #[test]
    fn prop_classification_is_idempotent(steps in steps()) {
        let store = grow(&steps);
        for project_id in PROJECTS {
            let rows = rows(&store, project_id);
            for row in &rows {
                prop_assert_eq!(row.ancestors.classify(), row.depth);
            }

            let tree = build_tree(&rows);
            let reflattened: Vec<WorkItem> = flatten(&tree).into_iter().cloned().collect();
            prop_assert_eq!(build_tree(&reflattened), tree);
        }
    }

    #[test]
    fn prop_delete_removes_exactly_the_subtree(steps in steps(), pick in any::<usize>()) {
        let mut store = grow(&steps);
        let all: Vec<ItemId> = store.ids().into_iter().collect();
        let target = store.get(all[pick % all.len()]).unwrap().unwrap();
        let before = rows(&store, target.project_id);
        let other_project = PROJECTS.iter().copied().find(|p| *p != target.project_id).unwrap();
        let untouched = rows(&store, other_project);

        let expected = descendants_by_parent(&before, target.id);
        let report = delete_subtree(&mut store, target.id).unwrap();

        prop_assert_eq!(report.deleted_count, expected.len());
        prop_assert!(report.stray_ids.is_empty());

        let after = rows(&store, target.project_id);
        prop_assert!(after.iter().all(|r| r.ancestors.get(target.depth) != target.id));
        prop_assert_eq!(after.len(), before.len() - expected.len());
        prop_assert!(after.iter().all(|r| !expected.contains(&r.id)));
        prop_assert_eq!(rows(&store, other_project), untouched);
        prop_assert!(verify_rows(&after).is_empty());
    }
}
