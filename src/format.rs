//! Output formatting utilities for markdown and JSON.

use crate::engine::{DeleteReport, Violation};
use crate::types::{TaskNode, WorkItem};
use std::fmt::Write;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

/// One outline line: checkbox, title, id and the fields worth a glance.
fn item_line(item: &WorkItem) -> String {
    let p = &item.payload;
    let check = if p.status == "done" { "x" } else { " " };
    let mut line = format!("- [{}] {} (`#{}`", check, p.title, item.id);

    if p.status != "done" && p.status != "todo" {
        let _ = write!(line, ", {}", p.status);
    }
    if p.priority != 0 {
        let _ = write!(line, ", priority {}", p.priority);
    }
    if let Some(hours) = p.estimate_hours {
        let _ = write!(line, ", {}h", hours);
    }
    if let Some(due) = p.due_date {
        let _ = write!(line, ", due {}", due);
    }
    if !p.assignees.is_empty() {
        let _ = write!(line, ", @{}", p.assignees.join(" @"));
    }
    line.push(')');
    line
}

/// Render a project tree as a nested markdown checklist.
pub fn format_tree_markdown(project_id: i64, roots: &[TaskNode], orphans: &[i64]) -> String {
    let mut md = String::new();
    md.push_str(&format!("# Project {}\n\n", project_id));

    if roots.is_empty() {
        md.push_str("_No tasks._\n");
    }

    for task in roots {
        md.push_str(&item_line(&task.item));
        md.push('\n');
        for subtask in &task.subtasks {
            md.push_str(&format!("  {}\n", item_line(&subtask.item)));
            for action in &subtask.action_items {
                md.push_str(&format!("    {}\n", item_line(&action.item)));
                for leaf in &action.subaction_items {
                    md.push_str(&format!("      {}\n", item_line(leaf)));
                }
            }
        }
    }

    if !orphans.is_empty() {
        let ids: Vec<String> = orphans.iter().map(|id| format!("`#{}`", id)).collect();
        md.push_str(&format!("\n**Orphaned rows**: {}\n", ids.join(", ")));
    }

    md
}

/// Render a single item with all of its fields.
pub fn format_item_markdown(item: &WorkItem) -> String {
    let p = &item.payload;
    let mut md = String::new();

    md.push_str(&format!("## {}: {}\n", item.depth, p.title));
    md.push_str(&format!("- **id**: `{}`\n", item.id));
    md.push_str(&format!("- **project**: `{}`\n", item.project_id));
    if let Some(parent) = item.parent_item() {
        md.push_str(&format!("- **parent**: `{}`\n", parent));
    }
    md.push_str(&format!("- **ancestors**: {:?}\n", item.ancestors.slots()));
    md.push_str(&format!("- **status**: {}\n", p.status));
    md.push_str(&format!("- **priority**: {}\n", p.priority));

    if let Some(hours) = p.estimate_hours {
        match item.estimate_prev {
            Some(prev) => md.push_str(&format!("- **estimate**: {}h (was {}h)\n", hours, prev)),
            None => md.push_str(&format!("- **estimate**: {}h\n", hours)),
        }
    }
    if let Some(due) = p.due_date {
        md.push_str(&format!("- **due**: {}\n", due));
    }
    if !p.assignees.is_empty() {
        md.push_str(&format!("- **assignees**: {}\n", p.assignees.join(", ")));
    }

    if let Some(ref desc) = p.description {
        md.push_str("\n### Description\n");
        md.push_str(desc);
        md.push('\n');
    }

    if !p.comments.is_empty() {
        md.push_str("\n### Comments\n");
        for comment in &p.comments {
            md.push_str(&format!("- {}\n", comment));
        }
    }

    md
}

/// Summarize a subtree delete.
pub fn format_delete_markdown(report: &DeleteReport) -> String {
    let mut md = format!(
        "Deleted {} item(s) under `#{}`.\n",
        report.deleted_count, report.item_id
    );
    if !report.stray_ids.is_empty() {
        let ids: Vec<String> = report.stray_ids.iter().map(|id| format!("`#{}`", id)).collect();
        md.push_str(&format!(
            "**Warning**: rows with stale ancestor pointers were left in place: {}\n",
            ids.join(", ")
        ));
    }
    md
}

/// List invariant violations, or confirm there are none.
pub fn format_violations_markdown(project_id: i64, violations: &[Violation]) -> String {
    if violations.is_empty() {
        return format!("Project {}: ancestor pointers consistent.\n", project_id);
    }

    let mut md = format!(
        "Project {}: {} violation(s)\n\n",
        project_id,
        violations.len()
    );
    for violation in violations {
        md.push_str(&format!("- `#{}`: {}\n", violation.item_id(), violation));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_tree;
    use crate::types::{Ancestors, Depth, ItemPayload};

    fn item(id: i64, depth: Depth, slots: [i64; 4], title: &str) -> WorkItem {
        WorkItem {
            id,
            project_id: 1,
            parent_id: depth.parent().map(|d| slots[d.slot()]).unwrap_or(1),
            depth,
            ancestors: Ancestors::new(slots),
            payload: ItemPayload::new(title),
            estimate_prev: None,
            created_at: id,
            updated_at: id,
        }
    }

    #[test]
    fn tree_outline_indents_by_level() {
        let mut done = item(2, Depth::Subtask, [1, 2, 0, 0], "Schema");
        done.payload.status = "done".to_string();
        let rows = vec![
            item(1, Depth::Task, [1, 0, 0, 0], "Ship v1"),
            done,
            item(3, Depth::ActionItem, [1, 2, 3, 0], "Write migration"),
        ];
        let md = format_tree_markdown(1, &build_tree(&rows), &[]);

        assert!(md.contains("- [ ] Ship v1 (`#1`)\n"));
        assert!(md.contains("  - [x] Schema (`#2`)\n"));
        assert!(md.contains("    - [ ] Write migration (`#3`)\n"));
        assert!(!md.contains("Orphaned"));
    }

    #[test]
    fn tree_outline_lists_orphans() {
        let md = format_tree_markdown(4, &[], &[9, 10]);
        assert!(md.contains("_No tasks._"));
        assert!(md.contains("**Orphaned rows**: `#9`, `#10`"));
    }

    #[test]
    fn item_markdown_shows_previous_estimate() {
        let mut row = item(5, Depth::Subtask, [1, 5, 0, 0], "Estimate me");
        row.payload.estimate_hours = Some(3.0);
        row.estimate_prev = Some(2.0);
        let md = format_item_markdown(&row);
        assert!(md.contains("## subtask: Estimate me"));
        assert!(md.contains("- **parent**: `1`"));
        assert!(md.contains("- **estimate**: 3h (was 2h)"));
    }
}
