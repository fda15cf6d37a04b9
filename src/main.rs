//! homers: builds a dataset of MLB home runs, enriches it with game and play
//! identifiers, park counts and video links, and plays a guessing game on it.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod client;
mod config;
mod error;
mod ingest;
mod matcher;
mod model;
mod names;
mod park_count;
mod progress;
mod record;
mod savant;
mod schedule;
mod trivia;
mod video;

use client::Client;
use config::Config;
use record::Dataset;
use schedule::Schedule;

#[derive(Parser)]
#[command(name = "homers")]
#[command(about = "Build and enrich a home-run dataset, then play trivia on it", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "homers.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Dataset CSV (overrides the config)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the results table day by day and write a fresh dataset
    Scrape {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day, inclusive
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Download the regular-season schedule CSV
    Schedule {
        /// Season year (defaults to the scrape start year)
        #[arg(long)]
        season: Option<i32>,
        /// Schedule CSV (overrides the config)
        #[arg(long)]
        schedule: Option<PathBuf>,
    },
    /// Fill missing gamePk values from the schedule
    GamePks {
        /// Schedule CSV (overrides the config)
        #[arg(long)]
        schedule: Option<PathBuf>,
    },
    /// Fill missing playId values from the live game feeds
    PlayIds,
    /// Fill missing x/30 ballparks values
    ParkCounts,
    /// Fill missing video URLs, optionally downloading the clips
    Videos {
        /// Also download the clips
        #[arg(long)]
        download: bool,
        /// Download directory (overrides the config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Guess how many parks each home run would have cleared
    Trivia {
        /// Number of rounds (overrides the config)
        #[arg(long)]
        rounds: Option<u32>,
        /// Seed for picking home runs
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn init_logging(log_path: &Path, verbose: bool) -> anyhow::Result<()> {
    let default_filter = if verbose { "homers=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(log_file)))
        .init();

    Ok(())
}

fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let dataset = Dataset::load(path).with_context(|| format!("loading {}", path.display()))?;
    if dataset.is_empty() {
        warn!("{} has no home runs", path.display());
    }
    Ok(dataset)
}

fn save_if_changed(dataset: &Dataset, changed: usize) -> anyhow::Result<()> {
    if changed == 0 {
        info!("Nothing new; {} left as it was", dataset.path().display());
        return Ok(());
    }
    dataset
        .save()
        .with_context(|| format!("saving {}", dataset.path().display()))?;
    info!("Updated {} ({} rows changed)", dataset.path().display(), changed);
    Ok(())
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    let dataset_path = config.paths.dataset.as_path();

    match command {
        Commands::Scrape { start, end } => {
            let client = Client::new(&config.http)?;
            let start = start.unwrap_or(config.scrape.start);
            let end = end.unwrap_or(config.scrape.end);
            info!("Scraping home runs from {start} to {end}");
            ingest::scrape_range(&client, start, end, &config.scrape, dataset_path).await?;
        }
        Commands::Schedule { season, schedule } => {
            let client = Client::new(&config.http)?;
            let season = season.unwrap_or_else(|| config.scrape.start.year());
            let path = schedule.unwrap_or_else(|| config.paths.schedule.clone());
            let fetched = Schedule::fetch(&client, season).await?;
            fetched
                .save(&path)
                .with_context(|| format!("saving {}", path.display()))?;
            info!("Saved {} games to {}", fetched.len(), path.display());
        }
        Commands::GamePks { schedule } => {
            let schedule_path = schedule.unwrap_or_else(|| config.paths.schedule.clone());
            let mut dataset = load_dataset(dataset_path)?;
            let schedule = Schedule::load(&schedule_path)?;
            let populated = schedule::populate_game_pks(&mut dataset, &schedule);
            save_if_changed(&dataset, populated)?;
        }
        Commands::PlayIds => {
            let client = Client::new(&config.http)?;
            let mut dataset = load_dataset(dataset_path)?;
            let filled = matcher::populate_play_ids(&client, &mut dataset, &config.matching).await;
            save_if_changed(&dataset, filled)?;
        }
        Commands::ParkCounts => {
            let client = Client::new(&config.http)?;
            let mut dataset = load_dataset(dataset_path)?;
            let filled = park_count::populate_park_counts(&client, &mut dataset, config.scrape.page_delay()).await;
            save_if_changed(&dataset, filled)?;
        }
        Commands::Videos { download, dir } => {
            let client = Client::new(&config.http)?;
            let mut dataset = load_dataset(dataset_path)?;
            let filled = video::populate_video_urls(&client, &mut dataset, config.scrape.page_delay()).await;
            save_if_changed(&dataset, filled)?;

            if download {
                let dir = dir.unwrap_or_else(|| config.paths.video_dir.clone());
                let saved = video::download_videos(&client, &dataset, &dir).await?;
                info!("Downloaded {} videos to {}", saved, dir.display());
            }
        }
        Commands::Trivia { rounds, seed } => {
            let dataset = load_dataset(dataset_path)?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let rounds = rounds.unwrap_or(config.trivia.rounds);
            let mut session = trivia::GameSession::new(&dataset.records, rounds, &mut rng)?;

            let stdin = std::io::stdin();
            trivia::play(&mut session, &mut rng, stdin.lock(), std::io::stdout())?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(dataset) = cli.dataset {
        config.paths.dataset = dataset;
    }
    init_logging(&config.paths.log, cli.verbose)?;

    if let Err(e) = run(cli.command, &config).await {
        error!("{e:#}");
        std::process::exit(1);
    }

    Ok(())
}
