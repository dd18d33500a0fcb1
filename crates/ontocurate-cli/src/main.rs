//! Ontocurate CLI
//!
//! Command-line access to the curation core:
//! - Refreshing a repository's release and rendering class closures as DOT
//! - Resolving class metadata and release labels
//! - Issuing identifiers and searching the sheet index
//! - Validating and reconciling curation sheets
//!
//! Sheets are read as JSON: `{ "header": [..], "rows": [ { "<column>": "<value>", .. }, .. ] }`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;

use ontocurate_graph::StatusFilter;
use ontocurate_service::{Config, CurationService};
use ontocurate_storage::{SearchQuery, SheetUpdate};
use ontocurate_table::Table;

#[derive(Parser)]
#[command(name = "ontocurate")]
#[command(author, version, about = "Ontocurate: ontology curation core")]
struct Cli {
    /// Config file (default: ./ontocurate.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration.
    InitConfig,

    /// Fetch and ingest a repository's release.
    Ingest { repo: String },

    /// DOT closure of identifiers, with superclasses.
    Graph {
        repo: String,
        /// Class identifiers (`PREFIX:0000001`)
        #[arg(required = true)]
        ids: Vec<String>,
        /// Emit the closure as JSON instead of DOT
        #[arg(long)]
        json: bool,
    },

    /// DOT closure of a sheet after overlaying its rows.
    SheetGraph {
        repo: String,
        sheet: PathBuf,
        /// Zero-based rows to seed from (default: every row)
        #[arg(long, value_delimiter = ',')]
        rows: Vec<usize>,
        /// Only seed rows with one of these curation statuses
        #[arg(long, value_delimiter = ',')]
        status: Vec<String>,
    },

    /// Label, definition and synonyms of release classes.
    Metadata {
        repo: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Every class label of the release.
    Labels { repo: String },

    /// Issue fresh identifiers.
    NextId {
        repo: String,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Re-index a saved sheet.
    Index {
        repo: String,
        folder: String,
        sheet_name: String,
        sheet: PathBuf,
    },

    /// Search indexed sheets.
    Search {
        repo: String,
        /// Terms (ANDed); separate alternatives with ` OR `
        text: Option<String>,
        #[arg(long)]
        reviewer: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Report blank and duplicate cells in a sheet.
    Validate { sheet: PathBuf },

    /// Three-way reconcile a locally edited sheet against the server copy.
    Reconcile {
        #[arg(long)]
        base: PathBuf,
        #[arg(long)]
        server: PathBuf,
        #[arg(long)]
        local: PathBuf,
        /// Write the highlighted diff here
        #[arg(long)]
        html: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct SheetFile {
    header: Vec<String>,
    #[serde(default)]
    rows: Vec<Value>,
}

fn read_sheet(path: &Path) -> Result<Table> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let sheet: SheetFile =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Table::from_records(&sheet.header, &sheet.rows)?)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::InitConfig = cli.command {
        print!("{}", Config::default_config_string());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let service = CurationService::from_config(config)?;

    match cli.command {
        Commands::InitConfig => {}
        Commands::Ingest { repo } => {
            let report = service.ingest_release(&repo)?;
            let stats = service.graph_stats(&repo)?;
            println!(
                "{} {} ({} nodes, {} edges)",
                "Ingested".green(),
                repo,
                stats.nodes,
                stats.edges
            );
            if !report.is_complete() {
                eprintln!("{} {} entries skipped", "warning:".yellow(), report.skipped.len());
            }
        }
        Commands::Graph { repo, ids, json } => {
            let view = service.closure(&repo, &ids)?;
            if json {
                print_json(&view)?;
            } else {
                print!("{}", view.dot);
            }
        }
        Commands::SheetGraph {
            repo,
            sheet,
            rows,
            status,
        } => {
            let table = read_sheet(&sheet)?;
            let filter = if status.is_empty() {
                StatusFilter::All
            } else {
                StatusFilter::any_of(status)
            };
            let view = if rows.is_empty() {
                service.closure_for_table(&repo, &table, &filter)?
            } else {
                service.closure_for_selection(&repo, &table, &rows, &filter)?
            };
            print!("{}", view.dot);
        }
        Commands::Metadata { repo, ids } => {
            print_json(&service.metadata(&repo, &ids)?)?;
        }
        Commands::Labels { repo } => {
            for label in service.release_labels(&repo)? {
                println!("{label}");
            }
        }
        Commands::NextId { repo, count } => {
            if count == 0 {
                return Err(anyhow!("--count must be at least 1"));
            }
            for id in service.next_identifiers(&repo, count)? {
                println!("{id}");
            }
        }
        Commands::Index {
            repo,
            folder,
            sheet_name,
            sheet,
        } => {
            let table = read_sheet(&sheet)?;
            let rows = table.len();
            service.enqueue_index_update(SheetUpdate {
                repo,
                folder,
                sheet_name,
                table,
            })?;
            // Waits for the queued update.
            service.shutdown();
            println!("{} {rows} rows", "Indexed".green());
            return Ok(());
        }
        Commands::Search {
            repo,
            text,
            reviewer,
            limit,
        } => {
            let mut query = SearchQuery::new(repo);
            if let Some(text) = text {
                query = query.with_text(text);
            }
            if let Some(reviewer) = reviewer {
                query = query.with_reviewer(reviewer);
            }
            if let Some(limit) = limit {
                query = query.with_limit(limit);
            }
            print_json(&service.search(&query)?)?;
        }
        Commands::Validate { sheet } => {
            let report = service.validate(&read_sheet(&sheet)?);
            if report.is_valid() {
                println!("{}", "Valid.".green());
            } else {
                print_json(&report)?;
                return Err(anyhow!("{} rows with issues", report.rows.len()));
            }
        }
        Commands::Reconcile {
            base,
            server,
            local,
            html,
        } => {
            let outcome = service.reconcile(&read_sheet(&base)?, &read_sheet(&server)?, &read_sheet(&local)?);
            if let Some(path) = html {
                fs::write(&path, &outcome.diff_html)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            if outcome.has_conflicts() {
                eprintln!(
                    "{} {} cell and {} row conflicts",
                    "conflicts:".red(),
                    outcome.cell_conflicts.len(),
                    outcome.row_conflicts.len()
                );
            } else if !outcome.has_difference() {
                eprintln!("{}", "No differences.".green());
            }
            print_json(&outcome.merged_records())?;
        }
    }

    service.shutdown();
    Ok(())
}
