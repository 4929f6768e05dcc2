//! Core types for the work-item tree.

use crate::error::EngineError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Store-assigned work item identifier. Zero is never a valid id; it marks an
/// empty ancestor slot.
pub type ItemId = i64;

/// Owning project identifier.
pub type ProjectId = i64;

/// Number of fixed hierarchy levels.
pub const MAX_DEPTH: usize = 4;

/// Item priority as an integer (higher = more important).
pub type Priority = i32;

pub const PRIORITY_HIGH: Priority = 1;
pub const PRIORITY_MEDIUM: Priority = 0;
pub const PRIORITY_LOW: Priority = -1;

/// Status assigned to newly created items.
pub const DEFAULT_STATUS: &str = "todo";

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse a priority string ("high", "medium", "low") or a plain integer.
/// Returns 0 (medium) for unrecognized values.
pub fn parse_priority(s: &str) -> Priority {
    match s.to_lowercase().as_str() {
        "high" => PRIORITY_HIGH,
        "medium" => PRIORITY_MEDIUM,
        "low" => PRIORITY_LOW,
        _ => s.parse().unwrap_or(PRIORITY_MEDIUM),
    }
}

/// Hierarchy level of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Depth {
    Task = 1,
    Subtask = 2,
    ActionItem = 3,
    SubActionItem = 4,
}

impl Depth {
    pub const ALL: [Depth; MAX_DEPTH] = [
        Depth::Task,
        Depth::Subtask,
        Depth::ActionItem,
        Depth::SubActionItem,
    ];

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Zero-based ancestor slot for this depth.
    pub fn slot(self) -> usize {
        self as usize - 1
    }

    /// The depth one level up, or `None` for tasks.
    pub fn parent(self) -> Option<Depth> {
        match self {
            Depth::Task => None,
            Depth::Subtask => Some(Depth::Task),
            Depth::ActionItem => Some(Depth::Subtask),
            Depth::SubActionItem => Some(Depth::ActionItem),
        }
    }

    /// The depth one level down, or `None` for sub-action items.
    pub fn child(self) -> Option<Depth> {
        match self {
            Depth::Task => Some(Depth::Subtask),
            Depth::Subtask => Some(Depth::ActionItem),
            Depth::ActionItem => Some(Depth::SubActionItem),
            Depth::SubActionItem => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Task => "task",
            Depth::Subtask => "subtask",
            Depth::ActionItem => "action_item",
            Depth::SubActionItem => "sub_action_item",
        }
    }
}

impl TryFrom<i64> for Depth {
    type Error = EngineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Depth::Task),
            2 => Ok(Depth::Subtask),
            3 => Ok(Depth::ActionItem),
            4 => Ok(Depth::SubActionItem),
            other => Err(EngineError::InvalidDepth(other)),
        }
    }
}

impl From<Depth> for i64 {
    fn from(depth: Depth) -> Self {
        depth.as_i64()
    }
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four denormalized ancestor pointers of a row.
///
/// Slot `d` holds the id of the row's ancestor at depth `d`. The slot at the
/// row's own depth holds its own id, and every deeper slot is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ancestors([ItemId; MAX_DEPTH]);

impl Ancestors {
    pub const EMPTY: Ancestors = Ancestors([0; MAX_DEPTH]);

    pub fn new(slots: [ItemId; MAX_DEPTH]) -> Self {
        Self(slots)
    }

    pub fn get(&self, depth: Depth) -> ItemId {
        self.0[depth.slot()]
    }

    pub fn set(&mut self, depth: Depth, id: ItemId) {
        self.0[depth.slot()] = id;
    }

    pub fn slots(&self) -> [ItemId; MAX_DEPTH] {
        self.0
    }

    /// Depth implied by which slots are populated: the deepest non-zero
    /// slot wins, and a row with no deeper slot set is a task.
    pub fn classify(&self) -> Depth {
        if self.get(Depth::SubActionItem) != 0 {
            Depth::SubActionItem
        } else if self.get(Depth::ActionItem) != 0 {
            Depth::ActionItem
        } else if self.get(Depth::Subtask) != 0 {
            Depth::Subtask
        } else {
            Depth::Task
        }
    }

    /// Parent id implied by the populated slots, `None` for tasks.
    pub fn implied_parent(&self) -> Option<ItemId> {
        self.classify().parent().map(|d| self.get(d))
    }
}

/// Business fields of a work item. The tree engine carries these through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub estimate_hours: Option<f64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub comments: Vec<String>,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

impl ItemPayload {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: default_status(),
            priority: PRIORITY_MEDIUM,
            assignees: Vec::new(),
            estimate_hours: None,
            due_date: None,
            comments: Vec::new(),
        }
    }

    pub fn with_estimate(mut self, hours: f64) -> Self {
        self.estimate_hours = Some(hours);
        self
    }
}

impl Default for ItemPayload {
    fn default() -> Self {
        Self::new("")
    }
}

/// A single row in the flat work-item store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    pub project_id: ProjectId,
    /// Immediate parent item, or the project id for tasks.
    pub parent_id: i64,
    pub depth: Depth,
    pub ancestors: Ancestors,
    #[serde(flatten)]
    pub payload: ItemPayload,
    /// Estimate before the most recent estimate edit (depth > 1 only).
    pub estimate_prev: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WorkItem {
    /// Parent item id, `None` when the parent is the project itself.
    pub fn parent_item(&self) -> Option<ItemId> {
        match self.depth {
            Depth::Task => None,
            _ => Some(self.parent_id),
        }
    }
}

/// A row ready for insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub project_id: ProjectId,
    pub parent_id: i64,
    pub depth: Depth,
    pub ancestors: Ancestors,
    pub payload: ItemPayload,
    pub created_at: i64,
}

/// Store-level row update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPatch {
    pub ancestors: Option<Ancestors>,
    pub payload: Option<ItemPayload>,
    pub estimate_prev: Option<Option<f64>>,
    pub updated_at: Option<i64>,
}

impl RowPatch {
    pub fn ancestors(ancestors: Ancestors) -> Self {
        Self {
            ancestors: Some(ancestors),
            ..Self::default()
        }
    }

    /// Apply this patch to an in-memory row.
    pub fn apply_to(&self, item: &mut WorkItem) {
        if let Some(ancestors) = self.ancestors {
            item.ancestors = ancestors;
        }
        if let Some(ref payload) = self.payload {
            item.payload = payload.clone();
        }
        if let Some(prev) = self.estimate_prev {
            item.estimate_prev = prev;
        }
        if let Some(ts) = self.updated_at {
            item.updated_at = ts;
        }
    }
}

/// Deserialize a present-but-null field as `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Business-field edit. Structural fields are not patchable.
///
/// Nullable fields use `Option<Option<_>>`: absent leaves the value alone,
/// `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignees: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub estimate_hours: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub comments: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Return `payload` with this patch applied.
    pub fn apply(&self, payload: &ItemPayload) -> ItemPayload {
        let mut next = payload.clone();
        if let Some(ref title) = self.title {
            next.title = title.clone();
        }
        if let Some(ref description) = self.description {
            next.description = description.clone();
        }
        if let Some(ref status) = self.status {
            next.status = status.clone();
        }
        if let Some(priority) = self.priority {
            next.priority = priority;
        }
        if let Some(ref assignees) = self.assignees {
            next.assignees = assignees.clone();
        }
        if let Some(estimate) = self.estimate_hours {
            next.estimate_hours = estimate;
        }
        if let Some(due) = self.due_date {
            next.due_date = due;
        }
        if let Some(ref comments) = self.comments {
            next.comments = comments.clone();
        }
        next
    }
}

/// Depth-1 node of a reconstructed tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNode {
    #[serde(flatten)]
    pub item: WorkItem,
    pub subtasks: Vec<SubtaskNode>,
}

/// Depth-2 node of a reconstructed tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtaskNode {
    #[serde(flatten)]
    pub item: WorkItem,
    pub action_items: Vec<ActionItemNode>,
}

/// Depth-3 node of a reconstructed tree. Its children are leaves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionItemNode {
    #[serde(flatten)]
    pub item: WorkItem,
    pub subaction_items: Vec<WorkItem>,
}
