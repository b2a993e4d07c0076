use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};

use wager_tracker::advantage::{transform, Leader};
use wager_tracker::config::Config;
use wager_tracker::data_fetcher::{RetryPolicy, YahooQuoteSource};
use wager_tracker::error::{Error, Result};
use wager_tracker::mailer::{BrevoMailer, Mailer};
use wager_tracker::output::{leader_label, pct_str};
use wager_tracker::{dashboard, history, logging, output, report};

#[derive(Parser)]
#[command(name = "wager-tracker", about = "Track a market-cap wager between two tickers")]
struct Cli {
    /// Configuration file (defaults to ./wager.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch today's market caps and append them to the history
    Record {
        /// Snapshot date (YYYY-MM-DD), defaults to today (UTC)
        #[arg(long)]
        date: Option<String>,

        /// Use this value for party A instead of fetching
        #[arg(long, requires = "value_b")]
        value_a: Option<f64>,

        /// Use this value for party B instead of fetching
        #[arg(long, requires = "value_a")]
        value_b: Option<f64>,
    },

    /// Render the static dashboard page
    Dashboard {
        /// Output directory, overrides paths.site_dir
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Render the weekly chart and email the summary
    Report {
        /// Write the email HTML next to the chart instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the current standing
    Standing,

    /// Export the advantage series as CSV
    Export {
        #[arg(long, default_value = "output/advantage.csv")]
        output: PathBuf,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::Validation(format!("invalid date '{}' (use YYYY-MM-DD): {}", raw, e)))
}

fn run_record(
    config: &Config,
    date: Option<String>,
    manual: Option<(f64, f64)>,
    today: NaiveDate,
) -> Result<()> {
    let date = match date {
        Some(raw) => parse_date(&raw)?,
        None => today,
    };
    let path = &config.paths.history;

    let outcome = match manual {
        Some((value_a, value_b)) => history::record(path, date, value_a, value_b)?,
        None => {
            let source = YahooQuoteSource::new(&config.fetch)?;
            history::record_fetched(
                path,
                date,
                &source,
                &config.wager.party_a.ticker,
                &config.wager.party_b.ticker,
                RetryPolicy::from_config(&config.fetch),
            )?
        }
    };

    println!(
        "{} {}: {} / {}",
        if outcome.replaced { "Replaced" } else { "Recorded" },
        date,
        output::money_str(outcome.snapshot.value_a),
        output::money_str(outcome.snapshot.value_b)
    );
    Ok(())
}

fn run_standing(config: &Config, today: NaiveDate) -> Result<()> {
    let history = history::load(&config.paths.history)?;
    let advantage = transform(&history, config.wager.resolution_date, today);

    match &advantage.standing {
        Some(s) => {
            let leader = leader_label(s.leader, &config.wager);
            println!("As of {}", s.as_of);
            match s.leader {
                Leader::Tie => println!("  Tied"),
                _ => println!("  {} ahead by {}", leader, pct_str(s.percent_ahead)),
            }
            println!("  Days left: {}", s.days_remaining);
            println!(
                "  Snapshots: {}, sign changes: {}",
                history.len(),
                advantage.crossings().count()
            );
        }
        None => println!("No data yet ({})", config.paths.history.display()),
    }
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Record {
            date,
            value_a,
            value_b,
        } => {
            let manual = value_a.zip(value_b);
            run_record(&config, date, manual, today)
        }

        Commands::Dashboard { output_dir } => {
            let history = history::load(&config.paths.history)?;
            if history.is_empty() {
                warn!("history is empty, rendering placeholder dashboard");
            }
            let site_dir = output_dir.unwrap_or_else(|| config.paths.site_dir.clone());
            let path = dashboard::render(&history, &config.wager, today, &site_dir)?;
            println!("Dashboard written to {}", path.display());
            Ok(())
        }

        Commands::Report { dry_run } => {
            let history = history::load(&config.paths.history)?;
            let mailer = if dry_run {
                None
            } else {
                Some(BrevoMailer::from_config(&config)?)
            };
            let outcome = report::run(
                &config,
                &history,
                today,
                mailer.as_ref().map(|m| m as &dyn Mailer),
            )?;
            match outcome.html_path {
                Some(path) => println!("Report written to {}", path.display()),
                None => println!("Report sent to {} recipient(s)", outcome.recipients),
            }
            Ok(())
        }

        Commands::Standing => run_standing(&config, today),

        Commands::Export { output: out_path } => {
            let history = history::load(&config.paths.history)?;
            let advantage = transform(&history, config.wager.resolution_date, today);
            output::save_series_csv(&advantage.series, &out_path)?;
            println!(
                "Saved {} points to {}",
                advantage.series.len(),
                out_path.display()
            );
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    if let Err(e) = logging::init(&level) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
