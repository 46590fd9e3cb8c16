//! `astrocast` command line entry point

use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use astrocast::climate::{DEFAULT_HISTORICAL, DEFAULT_RECENT, YearSpan};
use astrocast::compare::WeekendDay;
use astrocast::config::LoggingConfig;
use astrocast::error::user_message;
use astrocast::{AstrocastConfig, Planner};

/// Will it rain on my parade? Weather, climate and air quality planning for outdoor events
#[derive(Parser)]
#[command(name = "astrocast", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Forecast, climatology, air quality and parade score for a city
    Report {
        /// City name or "lat,lon"
        #[arg(long)]
        city: String,
        /// Event date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Skip the AI summary
        #[arg(long)]
        no_ai: bool,
    },
    /// Rank cities for the coming weekend
    Compare {
        /// City to compare; repeat for each city
        #[arg(long = "city", required = true, num_args = 1)]
        cities: Vec<String>,
        #[arg(long, default_value = "saturday")]
        day: WeekendDay,
        #[arg(long)]
        no_ai: bool,
    },
    /// NASA POWER monthly averages for a past month
    History {
        #[arg(long)]
        city: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// Compare a recent period's climate against a historical one
    Climate {
        #[arg(long)]
        city: String,
        /// Month 1-12, defaults to the current month
        #[arg(long)]
        month: Option<u32>,
        #[arg(long, default_value_t = DEFAULT_HISTORICAL.start)]
        hist_start: i32,
        #[arg(long, default_value_t = DEFAULT_HISTORICAL.end)]
        hist_end: i32,
        #[arg(long, default_value_t = DEFAULT_RECENT.start)]
        recent_start: i32,
        #[arg(long, default_value_t = DEFAULT_RECENT.end)]
        recent_end: i32,
        #[arg(long)]
        no_ai: bool,
    },
    /// Current air quality for a city
    Pollution {
        #[arg(long)]
        city: String,
    },
    /// Ask the weather assistant a question
    Ask {
        question: String,
        /// Ground the answer in this city's forecast
        #[arg(long)]
        city: Option<String>,
    },
    /// Weather at a map pin
    Point {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        no_ai: bool,
    },
    /// NASA GIBS map layer templates
    Layers {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Provider configuration and AI health probe
    Health,
    /// Serve the JSON API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print<T: Serialize + Display>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value).context("Failed to encode output")?);
    } else {
        print!("{value}");
    }
    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn run(cli: Cli, config: AstrocastConfig) -> Result<()> {
    if let Command::Layers { date } = &cli.command {
        return print(&Planner::layers(date.unwrap_or_else(today)), cli.json);
    }

    let planner = Planner::from_config(&config)?;
    match cli.command {
        Command::Report { city, date, no_ai } => {
            let report = planner.report(&city, date.unwrap_or_else(today), !no_ai).await?;
            print(&report, cli.json)
        }
        Command::Compare { cities, day, no_ai } => {
            let comparison = planner.compare(&cities, day, today(), !no_ai).await?;
            print(&comparison, cli.json)
        }
        Command::History { city, year, month } => print(&planner.history(&city, year, month).await?, cli.json),
        Command::Climate {
            city,
            month,
            hist_start,
            hist_end,
            recent_start,
            recent_end,
            no_ai,
        } => {
            let report = planner
                .climate(
                    &city,
                    month.unwrap_or_else(|| today().month()),
                    YearSpan::new(hist_start, hist_end),
                    YearSpan::new(recent_start, recent_end),
                    !no_ai,
                )
                .await?;
            print(&report, cli.json)
        }
        Command::Pollution { city } => print(&planner.pollution(&city).await?, cli.json),
        Command::Ask { question, city } => print(&planner.ask(&question, city.as_deref()).await?, cli.json),
        Command::Point { lat, lon, date, no_ai } => {
            let report = planner.point(lat, lon, date.unwrap_or_else(today), !no_ai).await?;
            print(&report, cli.json)
        }
        Command::Health => print(&planner.health().await, cli.json),
        Command::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let timeout = Duration::from_secs(config.server.request_timeout_seconds.into());
            astrocast::web::run(planner, port, timeout).await
        }
        Command::Layers { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AstrocastConfig::load_from_path(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", user_message(&e));
            eprintln!("   {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging, cli.verbose);
    debug!("Cache location: {}", config.cache.location);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:#}", e);
            eprintln!("❌ {}", user_message(&e));
            ExitCode::FAILURE
        }
    }
}
