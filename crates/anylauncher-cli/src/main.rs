//! AnyLauncher
//!
//! Command-line front end: manages the game catalog and launches games.

mod session;

use anyhow::{Context, Result};
use anylauncher_catalog::{CatalogError, GameId, GameRecord, IntegrityChecker, Saved};
use anylauncher_config::LauncherConfig;
use anylauncher_launcher::{LaunchOutcome, Started};
use clap::{Parser, Subcommand};
use session::{Session, SessionError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

/// How often attached mode checks whether games are still running
const ATTACH_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "anylauncher")]
#[command(author, version, about = "Keep a catalog of games and launch them")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file to use instead of the default one
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered games, the selected one first
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a game file
    Import {
        /// Game executable or HTML page
        path: PathBuf,
        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Rename a game or point it at another file
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Remove a game from the catalog
    Remove { id: String },

    /// Make a game the selected one
    Select { id: String },

    /// Show the selected game
    Selected,

    /// Launch the selected game or the given one
    Launch {
        #[arg(long)]
        id: Option<String>,
        /// Wait for the game to exit; Ctrl-C stops it
        #[arg(long)]
        attach: bool,
    },

    /// Print the integrity digest of a file
    Hash { path: PathBuf },

    /// Show where the catalog is stored
    Where,
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(hint) = hint_for(&e) {
                eprintln!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<SessionError>() {
        return e.hint();
    }
    err.downcast_ref::<CatalogError>().and_then(CatalogError::hint)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_file = cli.config;
    let open_session = || -> Result<Session> {
        let config = LauncherConfig::load_layered(config_file.as_deref())
            .context("Failed to load configuration")?;
        Ok(Session::open(config)?)
    };

    match cli.command {
        Commands::List { json } => {
            let session = open_session()?;
            let games = session.catalog().list_games()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&games)?);
            } else if games.is_empty() {
                println!("No games registered");
            } else {
                for game in &games {
                    print_game(game);
                }
            }
        }
        Commands::Import { path, name } => {
            let session = open_session()?;
            let saved = session.catalog().import_file(&path, name.as_deref())?;
            report_saved("Imported", &saved);
        }
        Commands::Edit { id, name, path } => {
            let session = open_session()?;
            let saved = session.catalog().edit_game(
                &GameId::from(id),
                name.as_deref(),
                path.as_deref(),
            )?;
            report_saved("Updated", &saved);
        }
        Commands::Remove { id } => {
            let session = open_session()?;
            let removed = session.catalog().delete_game(&GameId::from(id))?;
            println!("Removed '{}'", removed.name);
        }
        Commands::Select { id } => {
            let session = open_session()?;
            let selected = session.catalog().select_game(&GameId::from(id))?;
            println!("Selected '{}'", selected.name);
        }
        Commands::Selected => match open_session()?.catalog().get_selected()? {
            Some(game) => print_game(&game),
            None => println!("No game selected"),
        },
        Commands::Launch { id, attach } => {
            let mut session = open_session()?;
            let (game, outcome) = match id {
                Some(id) => session.launch_game(&GameId::from(id))?,
                None => session.launch_selected()?,
            };

            println!("{}: {}", game.name, outcome);
            if !outcome.is_started() {
                return Ok(ExitCode::FAILURE);
            }

            if attach && matches!(outcome, LaunchOutcome::Started(Started::Spawned { .. })) {
                wait_for_games(&mut session)?;
            }
        }
        Commands::Where => {
            let session = open_session()?;
            let location = session.location();
            println!("{}", location.catalog_file().display());
            println!("  source: {}", location.source.describe());
            println!("  lock:   {}", location.lock_file().display());
            println!(
                "  lock timeout: {:?}",
                session.config().catalog.lock_timeout()
            );
        }
        Commands::Hash { path } => {
            let hash = IntegrityChecker::try_hash(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            println!("{}", hash);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Block until every spawned game exits or Ctrl-C arrives, then stop the rest
fn wait_for_games(session: &mut Session) -> Result<()> {
    for process in session.launcher_mut().registry().processes() {
        println!(
            "Waiting for {} (pid {}); press Ctrl-C to stop it",
            process.path().display(),
            process.pid()
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                result = &mut ctrl_c => {
                    result.context("Failed to listen for Ctrl-C")?;
                    info!("Interrupted, stopping games");
                    break;
                }
                _ = tokio::time::sleep(ATTACH_POLL_INTERVAL) => {
                    if session.launcher_mut().registry_mut().running() == 0 {
                        info!("All games exited");
                        break;
                    }
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    })?;

    let report = session.shutdown();
    if report.terminated + report.killed > 0 {
        println!(
            "Stopped {} game(s)",
            report.terminated + report.killed
        );
    }
    if report.failed > 0 {
        println!("{} game(s) could not be stopped", report.failed);
    }
    Ok(())
}

fn print_game(game: &GameRecord) {
    let marker = if game.is_selected { "*" } else { " " };
    let hash = game
        .content_hash
        .as_ref()
        .map(|h| h.short().to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{} {}  {}  [{}]  {}",
        marker,
        game.id(),
        game.name,
        hash,
        game.path.display()
    );
}

fn report_saved(action: &str, saved: &Saved) {
    println!("{} '{}' as {}", action, saved.record.name, saved.record.id());
    if saved.name_collision {
        println!("Note: another game is already named '{}'", saved.record.name);
    }
}
