use std::io;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kanji_core::model::CardId;
use kanji_core::selector::DuePolicy;
use services::{AppServices, Clock};
use storage::seed::DEFAULT_COLLECTION;
use tracing_subscriber::EnvFilter;

mod commands;

/// Study kanji with SM-2 spaced repetition.
#[derive(Debug, Parser)]
#[command(name = "kanji")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spaced-repetition flash cards for kanji")]
struct Cli {
    /// SQLite database URL or file path
    #[arg(long = "db", env = "KANJI_DB_URL", default_value = "sqlite://kanji.sqlite3", global = true)]
    db_url: String,

    /// Collection to study
    #[arg(long, env = "KANJI_COLLECTION", default_value = DEFAULT_COLLECTION, global = true)]
    collection: String,

    /// Treat this day (YYYY-MM-DD) as today
    #[arg(long, env = "KANJI_TODAY", global = true)]
    today: Option<NaiveDate>,

    /// Also offer cards whose review day has already passed
    #[arg(long, global = true)]
    overdue: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add the sample kanji and one card per kanji to the collection
    Seed,

    /// Add a card for a kanji already in the catalogue
    Add {
        /// The kanji character
        #[arg(long)]
        kanji: char,
        /// Story that ties the character to its keyword
        #[arg(long)]
        mnemonic: String,
    },

    /// Show the next card due for review
    Next,

    /// Score one card
    Review {
        /// Card id
        #[arg(long)]
        card: CardId,
        /// Recall quality, 0 (blackout) to 5 (perfect)
        #[arg(long, allow_negative_numbers = true)]
        score: i64,
    },

    /// Review due cards interactively until none are left
    Study,

    /// Show card counts for today
    Stats,
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[derive(Debug)]
struct InvalidDbUrl(String);

impl std::fmt::Display for InvalidDbUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid --db value: {}", self.0)
    }
}

impl std::error::Error for InvalidDbUrl {}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| InvalidDbUrl(db_url.to_string()))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(InvalidDbUrl(db_url.to_string()).into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.db_url.trim().is_empty() {
        return Err(InvalidDbUrl(cli.db_url).into());
    }
    let db_url = normalize_sqlite_url(cli.db_url);
    let clock = cli.today.map_or_else(Clock::default_clock, Clock::fixed_on);
    let policy = if cli.overdue {
        DuePolicy::IncludeOverdue
    } else {
        DuePolicy::ScheduledToday
    };

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, clock, &cli.collection, policy).await?;
    tracing::debug!(
        db = %db_url,
        collection = services.collection().name(),
        today = %clock.today(),
        "services ready"
    );

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Seed => commands::seed(&services, &mut out, cli.json).await,
        Command::Add { kanji, mnemonic } => {
            commands::add(&services, kanji, &mnemonic, &mut out, cli.json).await
        }
        Command::Next => commands::next(&services, &mut out, cli.json).await,
        Command::Review { card, score } => {
            commands::review(&services, card, score, &mut out, cli.json).await
        }
        Command::Study => {
            let input = io::stdin().lock();
            commands::study(&services, input, &mut out, cli.json)
                .await
                .map(|_| ())
        }
        Command::Stats => commands::stats(&services, &mut out, cli.json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(err) = run(cli).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
