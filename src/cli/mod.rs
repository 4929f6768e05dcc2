//! CLI command definitions for task-tree
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::format::OutputFormat;
use crate::types::{ItemId, ItemPatch, ItemPayload, ProjectId, parse_priority};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatArg {
    #[default]
    Json,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

/// Hierarchical work-item tree server and CLI tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the REST API server (default if no subcommand given)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a work item under a project or parent item
    Create(CreateArgs),

    /// Edit an item's fields
    Update(UpdateArgs),

    /// Delete an item and everything below it
    Delete {
        /// Item to delete
        id: ItemId,

        #[arg(short, long, value_enum, default_value_t)]
        format: FormatArg,
    },

    /// List a project's items as flat rows
    List {
        /// Project id
        project: ProjectId,
    },

    /// Print a project's nested tree
    Tree(TreeArgs),

    /// Check stored ancestor pointers for consistency
    Verify {
        /// Project to check (all projects when omitted)
        project: Option<ProjectId>,

        #[arg(short, long, value_enum, default_value_t)]
        format: FormatArg,
    },
}

/// Fields shared by `create` and `update`.
#[derive(Args, Debug, Default, Clone)]
pub struct ItemFieldArgs {
    /// Longer description
    #[arg(long)]
    pub description: Option<String>,

    /// Status label, e.g. todo, doing, done
    #[arg(long)]
    pub status: Option<String>,

    /// Priority: high, medium, low, or an integer
    #[arg(long)]
    pub priority: Option<String>,

    /// Assignee (repeatable)
    #[arg(long = "assignee")]
    pub assignees: Vec<String>,

    /// Estimated effort in hours
    #[arg(long)]
    pub estimate: Option<f64>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<NaiveDate>,

    /// Comment (repeatable)
    #[arg(long = "comment")]
    pub comments: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Owning project
    #[arg(short, long)]
    pub project: ProjectId,

    /// Level: 1 task, 2 subtask, 3 action item, 4 sub-action item
    #[arg(long, default_value_t = 1)]
    pub depth: i64,

    /// Parent item (required below depth 1)
    #[arg(long, default_value_t = 0)]
    pub parent: ItemId,

    /// Item title
    pub title: String,

    #[command(flatten)]
    pub fields: ItemFieldArgs,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: FormatArg,
}

impl CreateArgs {
    pub fn payload(&self) -> ItemPayload {
        let f = &self.fields;
        let mut payload = ItemPayload::new(self.title.clone());
        payload.description = f.description.clone();
        if let Some(ref status) = f.status {
            payload.status = status.clone();
        }
        if let Some(ref priority) = f.priority {
            payload.priority = parse_priority(priority);
        }
        payload.assignees = f.assignees.clone();
        payload.estimate_hours = f.estimate;
        payload.due_date = f.due;
        payload.comments = f.comments.clone();
        payload
    }
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Item to edit
    pub id: ItemId,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    #[command(flatten)]
    pub fields: ItemFieldArgs,

    /// Remove the estimate
    #[arg(long, conflicts_with = "estimate")]
    pub clear_estimate: bool,

    /// Remove the due date
    #[arg(long, conflicts_with = "due")]
    pub clear_due: bool,

    #[arg(short, long, value_enum, default_value_t)]
    pub format: FormatArg,
}

impl UpdateArgs {
    /// Only flags that were given end up in the patch. Repeatable flags
    /// replace the whole list.
    pub fn patch(&self) -> ItemPatch {
        let f = &self.fields;
        ItemPatch {
            title: self.title.clone(),
            description: f.description.clone().map(Some),
            status: f.status.clone(),
            priority: f.priority.as_deref().map(parse_priority),
            assignees: (!f.assignees.is_empty()).then(|| f.assignees.clone()),
            estimate_hours: if self.clear_estimate {
                Some(None)
            } else {
                f.estimate.map(Some)
            },
            due_date: if self.clear_due {
                Some(None)
            } else {
                f.due.map(Some)
            },
            comments: (!f.comments.is_empty()).then(|| f.comments.clone()),
        }
    }
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Project id
    pub project: ProjectId,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: FormatArg,

    /// Sort siblings by: created_at, priority, due_date, title
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort direction: asc or desc
    #[arg(long)]
    pub order: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_builds_payload_from_flags() {
        let cli = Cli::parse_from([
            "task-tree",
            "create",
            "--project",
            "3",
            "--depth",
            "2",
            "--parent",
            "10",
            "Write tests",
            "--priority",
            "high",
            "--estimate",
            "1.5",
            "--assignee",
            "ana",
            "--assignee",
            "bo",
        ]);
        let Some(Command::Create(args)) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.project, 3);
        assert_eq!(args.depth, 2);
        assert_eq!(args.parent, 10);

        let payload = args.payload();
        assert_eq!(payload.title, "Write tests");
        assert_eq!(payload.priority, 1);
        assert_eq!(payload.estimate_hours, Some(1.5));
        assert_eq!(payload.assignees, vec!["ana", "bo"]);
        assert_eq!(payload.status, "todo");
    }

    #[test]
    fn update_patch_only_carries_given_flags() {
        let cli = Cli::parse_from(["task-tree", "update", "7", "--status", "done"]);
        let Some(Command::Update(args)) = cli.command else {
            panic!("expected update");
        };
        let patch = args.patch();
        assert_eq!(patch.status.as_deref(), Some("done"));
        assert_eq!(patch.title, None);
        assert_eq!(patch.estimate_hours, None);
        assert_eq!(patch.assignees, None);
        assert_eq!(args.format, FormatArg::Json);

        let cli = Cli::parse_from(["task-tree", "update", "7", "--clear-estimate", "-f", "markdown"]);
        let Some(Command::Update(args)) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.patch().estimate_hours, Some(None));
        assert_eq!(args.format, FormatArg::Markdown);
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::parse_from(["task-tree", "tree", "4", "--format", "markdown", "-d", "x.db"]);
        assert_eq!(cli.database.as_deref(), Some("x.db"));
        let Some(Command::Tree(args)) = cli.command else {
            panic!("expected tree");
        };
        assert_eq!(args.format, FormatArg::Markdown);
    }
}
