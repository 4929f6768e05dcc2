//! task-tree server and CLI
//!
//! Runs the REST API by default; the other subcommands operate on the
//! database directly and print JSON or markdown.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use task_tree::cli::{Cli, Command, TreeArgs};
use task_tree::config::{Config, ConfigLoader, ConfigPaths};
use task_tree::db::Database;
use task_tree::engine::sort_tree;
use task_tree::format::{self, OutputFormat};
use task_tree::logging::{self, LogTarget};
use task_tree::server::{AppState, TreeResponse, start_server};
use task_tree::types::WorkItem;
use tracing::{debug, info, warn};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_item(item: &WorkItem, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => print_json(item),
        OutputFormat::Markdown => {
            print!("{}", format::format_item_markdown(item));
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = match &cli.config {
        Some(path) => ConfigLoader::load_file(PathBuf::from(path), ConfigPaths::discover())?,
        None => ConfigLoader::load()?,
    };

    logging::init(
        &LogTarget::parse(&cli.log),
        cli.verbose,
        &loader.config().logging.filter,
    )?;
    if let Some(path) = loader.config_path() {
        debug!(path = %path.display(), "configuration loaded");
    }

    // Override paths from CLI arguments
    if let Some(db_path) = &cli.database {
        loader.config_mut().server.db_path = db_path.into();
    }
    let config = loader.into_config();

    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path).with_context(|| {
        format!("opening database {}", config.server.db_path.display())
    })?;
    let db = Arc::new(db);

    match cli.command {
        Some(Command::Serve { port }) => run_server(db, config, port).await?,
        None => run_server(db, config, None).await?,
        Some(Command::Create(args)) => {
            let item = db.create_item(args.project, args.parent, args.depth, args.payload())?;
            print_item(&item, args.format.into())?;
        }
        Some(Command::Update(args)) => {
            let item = db.update_item(args.id, &args.patch())?;
            print_item(&item, args.format.into())?;
        }
        Some(Command::Delete { id, format: output }) => {
            let report = db.delete_subtree(id)?;
            match OutputFormat::from(output) {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Markdown => print!("{}", format::format_delete_markdown(&report)),
            }
        }
        Some(Command::List { project }) => {
            print_json(&db.list_items(project)?)?;
        }
        Some(Command::Tree(args)) => run_tree(&db, &config, args)?,
        Some(Command::Verify {
            project,
            format: output,
        }) => {
            let projects = match project {
                Some(project) => vec![project],
                None => db.project_ids()?,
            };

            let mut results = BTreeMap::new();
            for project_id in projects {
                results.insert(project_id, db.verify_project(project_id)?);
            }
            let total: usize = results.values().map(Vec::len).sum();

            match OutputFormat::from(output) {
                OutputFormat::Json => print_json(&results)?,
                OutputFormat::Markdown => {
                    for (project_id, violations) in &results {
                        print!(
                            "{}",
                            format::format_violations_markdown(*project_id, violations)
                        );
                    }
                }
            }

            if total > 0 {
                warn!(violations = total, "ancestor pointer violations found");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn run_tree(db: &Database, config: &Config, args: TreeArgs) -> Result<()> {
    let report = db.project_tree(args.project)?;
    let mut tasks = report.roots;
    if let Some((key, order)) = config
        .tree
        .resolve_sort(args.sort.as_deref(), args.order.as_deref())
    {
        sort_tree(&mut tasks, key, order);
    }

    match OutputFormat::from(args.format) {
        OutputFormat::Json => print_json(&TreeResponse {
            project_id: args.project,
            tasks,
            orphans: report.orphans,
        })?,
        OutputFormat::Markdown => print!(
            "{}",
            format::format_tree_markdown(args.project, &tasks, &report.orphans)
        ),
    }
    Ok(())
}

async fn run_server(db: Arc<Database>, config: Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    let state = AppState::new(db, config.tree.clone());
    let handle = start_server(state, &config.server.host, port).await?;

    info!(addr = %handle.addr(), "server ready, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    handle.shutdown().await;
    Ok(())
}
