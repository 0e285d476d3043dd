//! Intelhub CLI - operate the multi-domain record store from a terminal

use clap::{Parser, Subcommand};
use intelhub::config::{self, IntelhubConfig};
use intelhub::storage::schema;
use intelhub::ui::{self, Icons};
use intelhub::insight::{insight_context, InsightProvider, UnconfiguredInsights};
use intelhub::{Fields, FilterPolicy, IntoValue, Page, RecordStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "intelhub")]
#[command(version)]
#[command(about = "Multi-Domain Intelligence Platform - record store for incidents, datasets and tickets")]
#[command(long_about = r#"
Intelhub keeps cybersecurity incidents, dataset metadata and IT tickets in a
single SQLite file, with:
  • Filtered, paginated and substring listing of any table
  • Legacy user-file migration and CSV bulk loading
  • Point-in-time backups and restore
  • Per-domain dashboard summaries

Example usage:
  intelhub init
  intelhub migrate-users --file users.txt
  intelhub list cyber_incidents --filter status=Open
  intelhub summary
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides intelhub.toml)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Fail on invalid filter columns instead of ignoring them
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and write intelhub.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show row counts for every table
    Stats,

    /// List rows of a table
    List {
        /// Table name
        table: String,

        /// Equality filter, repeatable (column=value)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Page size
        #[arg(short, long)]
        limit: Option<usize>,

        /// Rows to skip before the page
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Show one row by id
    Show {
        table: String,
        id: i64,
    },

    /// Substring search on one column
    Search {
        table: String,

        #[arg(short, long)]
        column: String,

        #[arg(short, long)]
        query: String,
    },

    /// Delete one row by id
    Delete {
        table: String,
        id: i64,
    },

    /// Show the columns of a table
    Columns {
        table: String,
    },

    /// Import users from a `username,password_hash,role` file
    MigrateUsers {
        /// Input file (defaults to users_file from intelhub.toml)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Append a CSV file into a table
    LoadCsv {
        table: String,

        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write a point-in-time copy of the database
    Backup {
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Replace the database contents with a backup
    Restore {
        #[arg(short, long = "in")]
        input: PathBuf,
    },

    /// Insert demo rows into empty domain tables
    Seed,

    /// Show the most recent user activity
    Activity {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Dashboard figures for every domain
    Summary,

    /// Ask the assistant a question with the dashboard figures as context
    Ask {
        prompt: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let file_config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = resolve_database(cli.database.as_deref(), &file_config)?;
    let policy = if cli.strict {
        FilterPolicy::Strict
    } else {
        file_config.filter_policy()
    };

    if let Commands::Init { force } = &cli.command {
        return run_init(&database, &file_config, cli.config.as_deref(), *force, cli.json);
    }

    let mut store = RecordStore::open(&database)?.with_filter_policy(policy);
    tracing::debug!("Using database {}", database.display());

    match cli.command {
        // Handled before the store is opened
        Commands::Init { .. } => {}

        Commands::Stats => {
            let counts = store.counts_by_table()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                ui::header(Icons::STATS, &format!("Intelhub Statistics ({})", database.display()));
                let rows: Vec<(&str, String)> =
                    counts.iter().map(|(t, n)| (t, n.to_string())).collect();
                println!("{}", ui::stats_table(&rows));
            }
        }

        Commands::List { table, filters, limit, offset } => {
            let filters = parse_filters(&filters)?;
            let page = (limit.is_some() || offset > 0).then_some(Page { limit, offset });
            let rows = store.newest_first(&table, &filters, page)?;
            print_records(&store, &table, &rows, cli.json)?;
        }

        Commands::Show { table, id } => match store.get_by_id(&table, id)? {
            Some(row) => print_records(&store, &table, &[row], cli.json)?,
            None => anyhow::bail!("no row with id {} in {}", id, table),
        },

        Commands::Search { table, column, query } => {
            if !cli.json {
                ui::header(Icons::SEARCH, &format!("Searching {}.{} for '{}'", table, column, query));
            }
            let rows = store.search(&table, &column, &query)?;
            print_records(&store, &table, &rows, cli.json)?;
        }

        Commands::Delete { table, id } => {
            if store.delete(&table, id)? {
                ui::success(&format!("Deleted {} #{}", table, id));
            } else {
                ui::warn(&format!("No row with id {} in {}", id, table));
            }
        }

        Commands::Columns { table } => {
            let columns = store.columns_of(&table)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&columns)?);
            } else if columns.is_empty() {
                ui::warn(&format!("Table {} does not exist", table));
            } else {
                for column in columns {
                    println!("  {}", column);
                }
            }
        }

        Commands::MigrateUsers { file } => {
            let file = file
                .or_else(|| file_config.users_file.as_ref().map(PathBuf::from))
                .ok_or_else(|| anyhow::anyhow!("no users file given (use --file or users_file in intelhub.toml)"))?;
            let report = store.migrate_users_from_file(&file)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                ui::header(Icons::PERSON, &format!("Migrating users from {}", file.display()));
                println!("{}", report);
            }
        }

        Commands::LoadCsv { table, file } => {
            let loaded = store.load_csv(&table, &file)?;
            ui::success(&format!("Loaded {} rows into {}", loaded, table));
        }

        Commands::Backup { out } => {
            store.backup_to(&out)?;
            ui::success(&format!("Backup written to {}", out.display()));
        }

        Commands::Restore { input } => {
            store.restore_from(&input)?;
            ui::success(&format!("Restored from {}", input.display()));
        }

        Commands::Seed => {
            let inserted = store.seed_demo_data()?;
            if inserted == 0 {
                ui::info("Seed", "domain tables already contain data");
            } else {
                ui::success(&format!("Inserted {} demo rows", inserted));
            }
        }

        Commands::Activity { limit } => {
            let rows = store.recent_activity(limit)?;
            print_records(&store, schema::USER_ACTIVITY, &rows, cli.json)?;
        }

        Commands::Summary => run_summary(&store, cli.json)?,

        Commands::Ask { prompt } => {
            let context = insight_context(&store)?;
            let reply = UnconfiguredInsights.respond(&prompt, &context);
            if cli.json {
                println!("{}", serde_json::json!({ "prompt": prompt, "reply": reply }));
            } else {
                ui::header(Icons::INFO, &prompt);
                println!("{}", reply);
            }
        }
    }

    store.close()?;
    Ok(())
}

fn resolve_database(flag: Option<&Path>, file_config: &IntelhubConfig) -> anyhow::Result<PathBuf> {
    let path = match (flag, &file_config.database) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(configured)) => PathBuf::from(configured),
        (None, None) => config::default_database_path_in(&std::env::current_dir()?),
    };
    config::ensure_db_dir(&path)?;
    Ok(path)
}

fn run_init(
    database: &Path,
    file_config: &IntelhubConfig,
    config_path: Option<&Path>,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config_path = config_path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);
    let new_config = IntelhubConfig {
        database: Some(database.display().to_string()),
        ..file_config.clone()
    };
    config::write_config(&config_path, &new_config, force)?;

    let mut store = RecordStore::open(database)?;
    let counts = store.counts_by_table()?;
    store.close()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "config": config_path.display().to_string(),
                "database": database.display().to_string(),
                "tables": counts,
            })
        );
    } else {
        ui::success(&format!("Initialized {}", database.display()));
        ui::info("Config", &config_path.display().to_string());
    }
    Ok(())
}

fn parse_filters(raw: &[String]) -> anyhow::Result<Fields> {
    let mut fields = Fields::new();
    for item in raw {
        let (column, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("filter must look like column=value, got {:?}", item))?;
        fields.insert(column.trim().to_string(), value.trim().into_value());
    }
    Ok(fields)
}

fn print_records(
    store: &RecordStore,
    table: &str,
    rows: &[intelhub::Record],
    json: bool,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("{} No rows found.", Icons::CROSS);
        return Ok(());
    }
    let columns = store.columns_of(table)?;
    println!("{}", ui::records_table(&columns, rows));
    println!("{}", ui::dim(&format!("{} row(s)", rows.len())));
    Ok(())
}

fn run_summary(store: &RecordStore, json: bool) -> anyhow::Result<()> {
    let incidents = store.incident_summary()?;
    let datasets = store.dataset_summary()?;
    let tickets = store.ticket_summary()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "cybersecurity": incidents,
                "data_science": datasets,
                "it_operations": tickets,
            }))?
        );
        return Ok(());
    }

    ui::section(&format!("{} Cybersecurity", Icons::LOCK));
    ui::summary_row("Total incidents", &incidents.total.to_string());
    ui::summary_row("Open incidents", &incidents.open.to_string());
    ui::summary_row("Critical", &incidents.critical.to_string());
    ui::summary_row(
        "Avg resolution",
        &incidents
            .avg_resolution_hours
            .map_or_else(|| "n/a".to_string(), |h| format!("{:.1}h", h)),
    );
    for (severity, n) in &incidents.by_severity {
        ui::summary_row(&format!("  {}", severity), &n.to_string());
    }

    ui::section(&format!("{} Data Science", Icons::PACKAGE));
    ui::summary_row("Total datasets", &datasets.total.to_string());
    ui::summary_row("Archived", &datasets.archived.to_string());
    ui::summary_row(
        "Avg quality",
        &datasets
            .avg_quality
            .map_or_else(|| "n/a".to_string(), |q| format!("{:.2}", q)),
    );
    ui::summary_row("Storage used", &format!("{:.1} MB", datasets.storage_mb));
    for (department, n) in &datasets.by_department {
        ui::summary_row(&format!("  {}", department), &n.to_string());
    }

    ui::section(&format!("{} IT Operations", Icons::DESKTOP));
    ui::summary_row("Total tickets", &tickets.total.to_string());
    ui::summary_row("Open tickets", &tickets.open.to_string());
    ui::summary_row("Urgent", &tickets.urgent.to_string());
    for (priority, n) in &tickets.by_priority {
        ui::summary_row(&format!("  {}", priority), &n.to_string());
    }
    Ok(())
}
