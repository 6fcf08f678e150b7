//! idle-agent: autonomous incremental-game player.
//!
//! Usage:
//!   idle-agent setup               Run the setup wizard
//!   idle-agent run [--simulate]    Play one session
//!   idle-agent status              Show the last session
//!   idle-agent report              Rebuild the last session's report

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use idle_agent::agent::run_recorded;
use idle_agent::config::{self, AgentConfig, CONFIG_FILE};
use idle_agent::game::{BridgeClient, GameInterface, SimulatedGame};
use idle_agent::report::{Effectiveness, PerformanceReport};
use idle_agent::state::{Database, LAST_SESSION_KEY};

#[derive(Parser, Debug)]
#[command(name = "idle-agent")]
#[command(version)]
#[command(about = "Autonomous incremental-game player")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the agent home directory [default: ~/.idle-agent].
    #[arg(long)]
    home: Option<String>,

    /// Log level (debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the first-time setup wizard.
    Setup,

    /// Play one session against the game bridge.
    Run {
        /// Play an in-process simulated game instead of the bridge.
        #[arg(long)]
        simulate: bool,

        /// Override the session duration.
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Override the game bridge URL.
        #[arg(long)]
        bridge_url: Option<String>,

        /// Seed the decision randomness (and the simulated game).
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the last session and its latest persisted stats.
    Status,

    /// Rebuild the performance report of the last session.
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let home_dir = cli
        .home
        .as_deref()
        .map(|h| PathBuf::from(shellexpand::tilde(h).into_owned()))
        .unwrap_or_else(config::default_home_dir);

    match cli.command {
        Commands::Setup => cmd_setup(&home_dir),
        Commands::Run {
            simulate,
            duration_secs,
            bridge_url,
            seed,
        } => cmd_run(&home_dir, simulate, duration_secs, bridge_url, seed).await,
        Commands::Status => cmd_status(&home_dir),
        Commands::Report => cmd_report(&home_dir),
    }
}

fn cmd_setup(home_dir: &Path) -> Result<()> {
    idle_agent::setup::run_setup_wizard(home_dir)?;
    Ok(())
}

async fn cmd_run(
    home_dir: &Path,
    simulate: bool,
    duration_secs: Option<u64>,
    bridge_url: Option<String>,
    seed: Option<u64>,
) -> Result<()> {
    let (mut config, db) = bootstrap(home_dir, simulate)?;
    if let Some(secs) = duration_secs {
        config.session_duration_secs = secs;
    }
    if let Some(url) = bridge_url {
        config.bridge_url = url;
    }
    if seed.is_some() {
        config.rng_seed = seed;
    }
    config.validate()?;

    let game: Arc<dyn GameInterface> = if simulate {
        Arc::new(SimulatedGame::new(config.rng_seed.unwrap_or_else(rand::random)))
    } else {
        Arc::new(BridgeClient::new(&config.bridge_url)?)
    };

    println!(
        "{} Starting '{}' session ({}, {} s at {} clicks/s)",
        ">>>".green().bold(),
        config.name,
        if simulate { "simulated game".to_string() } else { config.bridge_url.clone() },
        config.session_duration_secs,
        config.click_frequency,
    );

    let reports_dir = PathBuf::from(config.resolved_reports_dir());

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n{} Stopping after the current iteration...", "<<<".red().bold());
            stop.cancel();
        }
    });

    let db = Arc::new(Mutex::new(db));
    let outcome = run_recorded(db, config, game, cancel).await?;
    if !outcome.final_flush_ok {
        warn!("Final stats were not persisted; the report below is the only record");
    }

    let report = PerformanceReport::from_outcome(&outcome);
    let path = report.write_json(&reports_dir)?;
    print_report(&report);
    info!("Report written to {}", path.display());
    Ok(())
}

fn cmd_status(home_dir: &Path) -> Result<()> {
    let (config, db) = bootstrap(home_dir, true)?;

    println!();
    println!("{}", "=== idle-agent Status ===".bold());
    println!();
    println!("  {}:     {}", "Name".bold(), config.name);
    println!("  {}:   {}", "Bridge".bold(), config.bridge_url);
    println!("  {}: {}", "Sessions".bold(), db.session_count()?);

    let Some(session) = db.last_session()? else {
        println!("\n  No sessions yet. Run `idle-agent run` to start one.\n");
        return Ok(());
    };

    println!();
    println!("  {}:", "Last session".bold());
    println!("    Id:       {}", session.id);
    println!("    Started:  {}", session.started_at.to_rfc3339());
    match session.ended_at {
        Some(ended) => println!("    Ended:    {}", ended.to_rfc3339()),
        None => println!("    Ended:    {}", "running or interrupted".yellow()),
    }

    match db.latest_stats(&session.id)? {
        Some(record) => {
            let s = record.stats;
            println!("    Recorded: {}", record.recorded_at.to_rfc3339());
            println!("    Strategy: {}", s.strategy);
            println!("    Resources: {:.0} (+{:.1}/s)", s.resources, s.production_rate);
            println!(
                "    Clicks {}, purchases {}, bonuses {}",
                s.total_clicks, s.total_purchases, s.bonuses_claimed
            );
        }
        None => println!("    {}", "No stats persisted".dimmed()),
    }
    match db.latest_save(&session.id)? {
        Some(save) => println!("    Save:     {} bytes", save.len()),
        None => println!("    Save:     {}", "none".dimmed()),
    }
    println!();
    Ok(())
}

fn cmd_report(home_dir: &Path) -> Result<()> {
    let (config, db) = bootstrap(home_dir, true)?;

    let session_id = match db.kv_get(LAST_SESSION_KEY)? {
        Some(id) => id,
        None => db
            .last_session()?
            .map(|s| s.id)
            .context("No sessions recorded yet")?,
    };
    let session = db
        .session(&session_id)?
        .with_context(|| format!("Session {session_id} is not recorded"))?;
    let record = db
        .latest_stats(&session.id)?
        .with_context(|| format!("Session {} has no persisted stats", session.id))?;

    let ended_at = session.ended_at.unwrap_or(record.recorded_at);
    let report = PerformanceReport::new(session.id, session.started_at, ended_at, record.stats);
    let path = report.write_json(Path::new(&config.resolved_reports_dir()))?;
    print_report(&report);
    println!("  Written: {}\n", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load config and open the progress database.
///
/// Without a config file the defaults are used when `allow_defaults` is
/// set (simulated runs, read-only commands).
fn bootstrap(home_dir: &Path, allow_defaults: bool) -> Result<(AgentConfig, Database)> {
    if !home_dir.exists() {
        std::fs::create_dir_all(home_dir).with_context(|| {
            format!("Failed to create home directory: {}", home_dir.display())
        })?;
    }

    let config_path = home_dir.join(CONFIG_FILE);
    if !config_path.exists() && !allow_defaults {
        eprintln!(
            "{} No config found at {:?}. Run `idle-agent setup` first, or use `run --simulate`.",
            "Error:".red().bold(),
            config_path
        );
        std::process::exit(1);
    }

    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = cfg.resolved_db_path();
    let db_path = Path::new(&db_path);
    let db = Database::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    Ok((cfg, db))
}

fn print_report(report: &PerformanceReport) {
    println!();
    println!("{}", "=== Session Report ===".bold());
    println!();
    for line in report.summary().lines() {
        println!("  {}", line);
    }
    println!(
        "\n  Rating: {}\n",
        colorize_effectiveness(report.metrics.effectiveness)
    );
}

fn colorize_effectiveness(e: Effectiveness) -> String {
    match e {
        Effectiveness::High => "high".green().bold().to_string(),
        Effectiveness::Medium => "medium".yellow().to_string(),
        Effectiveness::Low => "low".red().to_string(),
    }
}
