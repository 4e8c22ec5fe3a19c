use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env, Target};
use ldbview::index::RecordIndex;
use ldbview::output::{self, DumpOptions};
use ldbview::query::filter_with_threshold;
#[cfg(feature = "interactive")]
use ldbview::query::SearchConfig;
use ldbview::session::resolve_store_path;
use ldbview::store::{LevelDbEngine, StoreSession};
use ldbview::utils::progress::Spinner;
use ldbview::utils::{get_config_path, get_log_path, AppConfig};
use log::{warn, LevelFilter};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ldbview")]
#[command(about = "Terminal-first LevelDB viewer with incremental search and repair")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Database directory (or a file inside it) to open
    path: Option<PathBuf>,

    /// Initial filter query
    #[arg(short, long)]
    query: Option<String>,

    /// Quiet period after the last keystroke before filtering (overrides config)
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse a database interactively (default)
    View {
        /// Database directory (or a file inside it)
        path: Option<PathBuf>,

        /// Initial filter query
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Print the records of a database
    Dump {
        /// Database directory (or a file inside it)
        path: PathBuf,

        /// Only print records matching this query
        #[arg(short, long)]
        query: Option<String>,

        /// Print keys and values as hex
        #[arg(long)]
        hex: bool,

        /// Print one JSON object per line
        #[arg(long, conflicts_with = "hex")]
        json: bool,

        /// Stop after this many records
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Count the records of a database
    Count {
        /// Database directory (or a file inside it)
        path: PathBuf,

        /// Only count records matching this query
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Repair a corrupted database in place
    Repair {
        /// Database directory (or a file inside it)
        path: PathBuf,

        /// Reopen the database afterwards and report its record count
        #[arg(long)]
        verify: bool,
    },
    /// Show the configuration file
    Config {
        /// Write the current settings, defaults included, to the config file
        #[arg(long)]
        write_defaults: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, None | Some(Commands::View { .. }));
    init_logging(interactive);

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("using default configuration: {:#}", e);
        AppConfig::default()
    });
    if let Some(ms) = cli.debounce_ms {
        config.debounce_ms = ms;
    }

    match cli.command {
        Some(Commands::View { path, query }) => {
            run_viewer(&config, path, query)?;
        }
        Some(Commands::Dump {
            path,
            query,
            hex,
            json,
            limit,
            no_color,
        }) => {
            let path = resolve_store_path(&path);
            let index = load(&path)?;
            let view = filter_with_threshold(
                &index,
                query.as_deref().unwrap_or(""),
                config.parallel_filter_threshold,
            );
            let options = DumpOptions {
                hex,
                json,
                limit,
                color: !no_color,
            };
            output::print_records(view.iter(), &options)?;
        }
        Some(Commands::Count { path, query }) => {
            let path = resolve_store_path(&path);
            let index = load(&path)?;
            let query = query.unwrap_or_default();
            let view = filter_with_threshold(&index, &query, config.parallel_filter_threshold);
            output::print_count(view.len(), index.len(), !query.trim().is_empty())?;
        }
        Some(Commands::Repair { path, verify }) => {
            let path = resolve_store_path(&path);
            repair(&path, verify)?;
        }
        Some(Commands::Config { write_defaults }) => {
            let config_path = get_config_path()?;
            if write_defaults {
                config.save()?;
                println!("Wrote {}", config_path.display());
            } else {
                println!("# {}", config_path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        None => {
            run_viewer(&config, cli.path, cli.query)?;
        }
    }

    Ok(())
}

/// Log to stderr, or to the log file while the TUI owns the terminal
fn init_logging(interactive: bool) {
    let default_level = if interactive { "info" } else { "warn" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format_timestamp_millis();

    if interactive {
        let file = get_log_path().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))
        });
        match file {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(_) => {
                builder.filter_level(LevelFilter::Off);
            }
        }
    }

    let _ = builder.try_init();
}

#[cfg(feature = "interactive")]
fn run_viewer(config: &AppConfig, path: Option<PathBuf>, query: Option<String>) -> Result<()> {
    use ldbview::session::SessionController;

    let search = SearchConfig {
        debounce: config.debounce(),
        parallel_threshold: config.parallel_filter_threshold,
        cache_size: config.search_cache_size,
    };
    let session = SessionController::new(LevelDbEngine::new(), search)
        .context("Failed to start store worker")?;
    ldbview::tui::run(session, path, query, config.show_hex)
}

#[cfg(not(feature = "interactive"))]
fn run_viewer(_config: &AppConfig, _path: Option<PathBuf>, _query: Option<String>) -> Result<()> {
    Err(anyhow!(
        "ldbview was built without the `interactive` feature; use dump or count"
    ))
}

/// Open a database and load every record
fn load(path: &Path) -> Result<RecordIndex> {
    let spinner = Spinner::start(format!("Loading {}", path.display()));
    let mut session = StoreSession::new(LevelDbEngine::new());
    let result = session.open(path);
    spinner.finish();

    result.map_err(|e| {
        if e.is_corruption() {
            anyhow!(
                "{}: {}\nThe database looks corrupted; try `ldbview repair {}`",
                path.display(),
                e,
                path.display()
            )
        } else {
            anyhow!("{}: {}", path.display(), e)
        }
    })
}

fn repair(path: &Path, verify: bool) -> Result<()> {
    let spinner = Spinner::start(format!("Repairing {}", path.display()));
    let mut session = StoreSession::new(LevelDbEngine::new());
    let result = session.repair(path);
    spinner.finish();
    result.with_context(|| format!("Could not repair {}", path.display()))?;

    println!("Repaired {}", path.display());

    if verify {
        let index = load(path)?;
        println!("{} entries readable", index.len());
    }

    Ok(())
}
