//! Rebuild the nested four-level tree from flat rows.
//!
//! Each row's level and parent are read off its ancestor slots, never off
//! `depth` or `parent_id`, and never by walking parent links. Children keep
//! the order they had in the input.

use crate::types::{
    ActionItemNode, Depth, ItemId, SubtaskNode, TaskNode, WorkItem,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A reconstructed tree plus the rows that could not be placed in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeReport {
    pub roots: Vec<TaskNode>,
    /// Rows whose computed parent is not in the row set (or is at the wrong
    /// level), together with everything hanging below them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<ItemId>,
}

/// Level and parent of a row as implied by its ancestor slots.
fn placement(item: &WorkItem) -> (Depth, Option<ItemId>) {
    let depth = item.ancestors.classify();
    (depth, depth.parent().map(|d| item.ancestors.get(d)))
}

/// Take a parent's children out of the bucket map, or an empty list.
fn take_children<T>(buckets: &mut HashMap<ItemId, Vec<T>>, id: ItemId) -> Vec<T> {
    buckets.remove(&id).unwrap_or_default()
}

/// Build the tree and report orphans.
///
/// Rows are grouped by computed parent in one pass, then nodes are assembled
/// bottom-up: sub-action items into action items, those into subtasks, those
/// into tasks. Whatever is left in a bucket afterwards had no parent at the
/// right level and is dropped.
pub fn build_tree_report(rows: &[WorkItem]) -> TreeReport {
    let mut levels: [Vec<(&WorkItem, Option<ItemId>)>; 4] = Default::default();
    for row in rows {
        let (depth, parent) = placement(row);
        levels[depth.slot()].push((row, parent));
    }

    let mut leaves: HashMap<ItemId, Vec<WorkItem>> = HashMap::new();
    for (row, parent) in &levels[Depth::SubActionItem.slot()] {
        if let Some(parent) = parent {
            leaves.entry(*parent).or_default().push((*row).clone());
        }
    }

    let mut action_items: HashMap<ItemId, Vec<ActionItemNode>> = HashMap::new();
    for (row, parent) in &levels[Depth::ActionItem.slot()] {
        let node = ActionItemNode {
            item: (*row).clone(),
            subaction_items: take_children(&mut leaves, row.id),
        };
        if let Some(parent) = parent {
            action_items.entry(*parent).or_default().push(node);
        }
    }

    let mut subtasks: HashMap<ItemId, Vec<SubtaskNode>> = HashMap::new();
    for (row, parent) in &levels[Depth::Subtask.slot()] {
        let node = SubtaskNode {
            item: (*row).clone(),
            action_items: take_children(&mut action_items, row.id),
        };
        if let Some(parent) = parent {
            subtasks.entry(*parent).or_default().push(node);
        }
    }

    let roots: Vec<TaskNode> = levels[Depth::Task.slot()]
        .iter()
        .map(|(row, _)| TaskNode {
            item: (*row).clone(),
            subtasks: take_children(&mut subtasks, row.id),
        })
        .collect();

    let placed: HashSet<ItemId> = flatten(&roots).iter().map(|item| item.id).collect();
    let orphans = rows
        .iter()
        .map(|r| r.id)
        .filter(|id| !placed.contains(id))
        .collect();

    TreeReport { roots, orphans }
}

/// Build the nested tree. Orphans are dropped silently.
pub fn build_tree(rows: &[WorkItem]) -> Vec<TaskNode> {
    build_tree_report(rows).roots
}

/// Walk a tree back into a flat row list, parents before children.
pub fn flatten(roots: &[TaskNode]) -> Vec<&WorkItem> {
    let mut out = Vec::new();
    for task in roots {
        out.push(&task.item);
        for subtask in &task.subtasks {
            out.push(&subtask.item);
            for action in &subtask.action_items {
                out.push(&action.item);
                out.extend(action.subaction_items.iter());
            }
        }
    }
    out
}

/// Field to order sibling lists by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    Priority,
    DueDate,
    Title,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortKey {
    /// Parse a sort key, falling back to creation order.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("priority") => SortKey::Priority,
            Some("due_date") => SortKey::DueDate,
            Some("title") => SortKey::Title,
            _ => SortKey::CreatedAt,
        }
    }

    fn compare(self, a: &WorkItem, b: &WorkItem) -> Ordering {
        match self {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Priority => a.payload.priority.cmp(&b.payload.priority),
            // Undated items go last.
            SortKey::DueDate => match (a.payload.due_date, b.payload.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Title => a.payload.title.cmp(&b.payload.title),
        }
        .then(a.id.cmp(&b.id))
    }
}

impl SortOrder {
    /// Parse a direction. Priority defaults to descending, everything else
    /// to ascending.
    pub fn parse(s: Option<&str>, key: SortKey) -> Self {
        match s {
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            _ if key == SortKey::Priority => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// Sort every sibling list in the tree. Presentation only; the engine never
/// calls this.
pub fn sort_tree(roots: &mut [TaskNode], key: SortKey, order: SortOrder) {
    let cmp = |a: &WorkItem, b: &WorkItem| match order {
        SortOrder::Asc => key.compare(a, b),
        SortOrder::Desc => key.compare(b, a),
    };

    roots.sort_by(|a, b| cmp(&a.item, &b.item));
    for task in roots.iter_mut() {
        task.subtasks.sort_by(|a, b| cmp(&a.item, &b.item));
        for subtask in &mut task.subtasks {
            subtask.action_items.sort_by(|a, b| cmp(&a.item, &b.item));
            for action in &mut subtask.action_items {
                action.subaction_items.sort_by(|a, b| cmp(a, b));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ancestors, ItemPayload};

    fn row(id: ItemId, slots: [ItemId; 4]) -> WorkItem {
        let ancestors = Ancestors::new(slots);
        let depth = ancestors.classify();
        WorkItem {
            id,
            project_id: 1,
            parent_id: ancestors.implied_parent().unwrap_or(1),
            depth,
            ancestors,
            payload: ItemPayload::new(format!("item-{id}")),
            estimate_prev: None,
            created_at: id,
            updated_at: id,
        }
    }

    fn chain_rows() -> Vec<WorkItem> {
        vec![
            row(1, [1, 0, 0, 0]),
            row(2, [1, 2, 0, 0]),
            row(3, [1, 2, 3, 0]),
            row(4, [1, 2, 3, 4]),
        ]
    }

    #[test]
    fn single_chain_nests_one_node_per_level() {
        let roots = build_tree(&chain_rows());

        assert_eq!(roots.len(), 1);
        let task = &roots[0];
        assert_eq!(task.item.id, 1);
        assert_eq!(task.subtasks.len(), 1);
        let subtask = &task.subtasks[0];
        assert_eq!(subtask.item.id, 2);
        assert_eq!(subtask.action_items.len(), 1);
        let action = &subtask.action_items[0];
        assert_eq!(action.item.id, 3);
        assert_eq!(action.subaction_items.len(), 1);
        assert_eq!(action.subaction_items[0].id, 4);
    }

    #[test]
    fn input_order_is_kept_regardless_of_row_order() {
        // Children listed before parents, siblings in non-id order.
        let rows = vec![
            row(6, [1, 6, 0, 0]),
            row(4, [1, 2, 3, 4]),
            row(2, [1, 2, 0, 0]),
            row(5, [1, 2, 3, 5]),
            row(3, [1, 2, 3, 0]),
            row(1, [1, 0, 0, 0]),
        ];

        let roots = build_tree(&rows);

        let subtask_ids: Vec<_> = roots[0].subtasks.iter().map(|s| s.item.id).collect();
        assert_eq!(subtask_ids, vec![6, 2]);
        let leaf_ids: Vec<_> = roots[0].subtasks[1].action_items[0]
            .subaction_items
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(leaf_ids, vec![4, 5]);
    }

    #[test]
    fn orphans_are_dropped_with_their_subtrees() {
        let rows = vec![
            row(1, [1, 0, 0, 0]),
            // Parent subtask 9 is missing.
            row(3, [1, 9, 3, 0]),
            row(4, [1, 9, 3, 4]),
        ];

        let report = build_tree_report(&rows);

        assert_eq!(report.roots.len(), 1);
        assert!(report.roots[0].subtasks.is_empty());
        assert_eq!(report.orphans, vec![3, 4]);
        assert_eq!(build_tree(&rows), report.roots);
    }

    #[test]
    fn classification_ignores_stored_depth() {
        let mut rows = chain_rows();
        // Stored depth disagrees with the slots; slots win.
        rows[3].depth = Depth::Task;

        let roots = build_tree(&rows);

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].subtasks[0].action_items[0].subaction_items[0].id, 4);
    }

    #[test]
    fn flatten_round_trips_ids() {
        let rows = chain_rows();
        let roots = build_tree(&rows);
        let mut ids: Vec<_> = flatten(&roots).iter().map(|i| i.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn building_twice_is_identical() {
        let rows = chain_rows();
        assert_eq!(build_tree(&rows), build_tree(&rows));
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        let report = build_tree_report(&[]);
        assert!(report.roots.is_empty());
        assert!(report.orphans.is_empty());
    }

    #[test]
    fn sort_tree_orders_siblings_by_priority_desc() {
        let mut rows = vec![
            row(1, [1, 0, 0, 0]),
            row(2, [1, 2, 0, 0]),
            row(3, [1, 3, 0, 0]),
        ];
        rows[1].payload.priority = -1;
        rows[2].payload.priority = 5;
        let mut roots = build_tree(&rows);

        let key = SortKey::parse(Some("priority"));
        sort_tree(&mut roots, key, SortOrder::parse(None, key));

        let ids: Vec<_> = roots[0].subtasks.iter().map(|s| s.item.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn due_date_sort_puts_undated_last() {
        let mut rows = vec![row(1, [1, 0, 0, 0]), row(2, [2, 0, 0, 0])];
        rows[1].payload.due_date = chrono::NaiveDate::from_ymd_opt(2026, 1, 1);
        let mut roots = build_tree(&rows);

        sort_tree(&mut roots, SortKey::DueDate, SortOrder::Asc);

        assert_eq!(roots[0].item.id, 2);
    }
}
