use std::fmt;
use std::sync::Arc;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{
    FileQuestionSource, HttpQuestionSource, QuestionSource, QuizEngine, QuizError, QuizIntent,
    SharedQuiz,
};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod render;

use render::{Command, parse_command, render_help, render_view};

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Multiple-choice quiz in the terminal. Progress is kept between runs.
#[derive(Debug, Parser)]
#[command(name = "quiz", version, about)]
struct Cli {
    /// SQLite database that stores progress
    #[arg(long, env = "QUIZ_DB_URL", default_value = "sqlite:quiz.sqlite3")]
    db: String,

    /// Keep progress in memory only
    #[arg(long)]
    in_memory: bool,

    /// Question bank: a JSON file path or an http(s) URL
    #[arg(long, env = "QUIZ_BANK", default_value = "data/canadatestprep/questions.json")]
    bank: String,

    /// Seed for the shuffle, for reproducible sessions
    #[arg(long, env = "QUIZ_SEED")]
    seed: Option<u64>,
}

impl Cli {
    fn question_source(&self) -> Arc<dyn QuestionSource> {
        if self.bank.starts_with("http://") || self.bank.starts_with("https://") {
            Arc::new(HttpQuestionSource::new(self.bank.clone()))
        } else {
            Arc::new(FileQuestionSource::new(&self.bank))
        }
    }

    fn rng(&self) -> StdRng {
        self.seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_string();
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
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

/// Store chosen at startup.
struct OpenedStorage {
    storage: Storage,
    /// The configured database could not be used and progress lives in memory.
    fell_back: bool,
}

impl OpenedStorage {
    fn configured(storage: Storage) -> Self {
        Self {
            storage,
            fell_back: false,
        }
    }

    fn fallback(db_url: &str, err: &dyn std::error::Error) -> Self {
        tracing::warn!(url = %db_url, error = %err, "sqlite unavailable, progress will not be saved");
        Self {
            storage: Storage::in_memory(),
            fell_back: true,
        }
    }
}

async fn open_storage(cli: &Cli) -> Result<OpenedStorage, ArgsError> {
    if cli.in_memory {
        return Ok(OpenedStorage::configured(Storage::in_memory()));
    }
    if cli.db.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: cli.db.clone(),
        });
    }

    let db_url = normalize_sqlite_url(&cli.db);
    if let Err(err) = prepare_sqlite_file(&db_url) {
        return Ok(OpenedStorage::fallback(&db_url, err.as_ref()));
    }
    match Storage::sqlite(&db_url).await {
        Ok(storage) => Ok(OpenedStorage::configured(storage)),
        Err(err) => Ok(OpenedStorage::fallback(&db_url, &err)),
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let opened = open_storage(&cli).await?;

    let mut engine =
        QuizEngine::initialize(cli.question_source(), opened.storage.kv, cli.rng()).await?;
    if opened.fell_back {
        engine.mark_persistence_degraded();
    }
    let quiz = SharedQuiz::new(engine);

    println!("{}", render_view(&quiz.view().await));
    println!("{}", render_help());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let intent = match parse_command(&line) {
            Some(Command::Quit) => break,
            Some(Command::Help) => {
                println!("{}", render_help());
                continue;
            }
            Some(Command::Intent(intent)) => intent,
            None => {
                println!("Unknown command. Type `h` for help.");
                continue;
            }
        };

        match quiz.dispatch(intent).await {
            Ok(view) => println!("{}", render_view(&view)),
            Err(QuizError::InvalidSelection { available, .. }) => {
                println!("Pick an answer between 1 and {available}.");
            }
            Err(err @ QuizError::Load(_)) if intent == QuizIntent::Reset => {
                println!("Reset failed, keeping your current progress: {err}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
