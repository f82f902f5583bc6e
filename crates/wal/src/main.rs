mod opener;
mod render;
mod shell;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use wal_core::{
    config::Config,
    phone::normalize,
    ports::{ChatOpener, HistoryStorage},
    session::ChatSession,
    storage::{JsonFileStorage, MemoryStorage},
    store::HistoryStore,
};
use wal_gemini::GeminiExtractor;

use crate::{
    opener::{PrintOpener, SystemOpener},
    render::{history_lines, resolve_target},
};

#[derive(Debug, Parser)]
#[command(
    name = "wal",
    version,
    about = "Open a WhatsApp chat with any number, no contact needed"
)]
struct Cli {
    /// History file (overrides WAL_HISTORY_FILE)
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,
    /// Keep history in memory only
    #[arg(long, global = true, conflicts_with = "history_file")]
    ephemeral: bool,
    /// Print chat links instead of opening them
    #[arg(long, global = true)]
    print: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open a chat with a typed or pasted number
    Open {
        /// Country calling code for local numbers, e.g. 44
        #[arg(long, short)]
        country: Option<String>,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Open a number from the history again
    Reuse { number: String },
    /// Let the AI find a number in messy text (e.g. an email signature)
    Extract {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show the normalized number without opening or recording anything
    Normalize {
        #[arg(long, short)]
        country: Option<String>,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List recent numbers
    History,
    /// Delete a history entry by list position or id
    Delete { target: String },
    /// Forget all recent numbers
    Clear,
    /// Interactive session with undo
    Shell,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = wal_core::logging::init("wal", cli.verbose) {
        eprintln!("{e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<wal_core::Error>() {
                Some(
                    e @ (wal_core::Error::InvalidInput(_)
                    | wal_core::Error::ExtractionUnavailable(_)
                    | wal_core::Error::ExtractionInFlight),
                ) => {
                    tracing::debug!(error = %e, "command rejected");
                    eprintln!("{}", e.user_message());
                }
                _ => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = Config::load().context("failed to load configuration")?;
    if let Some(path) = cli.history_file.clone() {
        cfg.history_file = path;
    }

    let cfg = Arc::new(cfg);
    let session = Arc::new(build_session(cfg.clone(), &cli)?);

    match cli.command {
        Command::Open { country, text } => {
            let cc = country.unwrap_or_else(|| cfg.default_country_code.clone());
            let opened = session.submit_direct(&text.join(" "), Some(&cc)).await?;
            if !cli.print {
                println!("Opened {}", opened.url);
            }
        }
        Command::Reuse { number } => {
            let opened = session.submit_from_history(&number).await?;
            if !cli.print {
                println!("Opened {}", opened.url);
            }
        }
        Command::Extract { text } => {
            let opened = session.submit_via_extraction(&text.join(" ")).await?;
            eprintln!("Number extracted successfully: +{}", opened.entry.number);
            if !cli.print {
                println!("Opened {}", opened.url);
            }
        }
        Command::History => {
            for line in history_lines(&session.entries().await) {
                println!("{line}");
            }
        }
        Command::Delete { target } => {
            let entries = session.entries().await;
            let id = resolve_target(&entries, &target)
                .with_context(|| format!("no history entry matches `{target}`"))?;
            if let Some(entry) = session.delete(&id).await {
                println!("Deleted +{}", entry.number);
            }
        }
        Command::Clear => {
            session.clear().await;
            println!("History cleared.");
        }
        Command::Normalize { country, text } => {
            let cc = country.unwrap_or_else(|| cfg.default_country_code.clone());
            let text = text.join(" ");
            let number =
                normalize(&text, Some(&cc)).ok_or(wal_core::Error::InvalidInput(text))?;
            println!("{number}\t{}", number.chat_url(&cfg.chat_base_url));
            if !number.has_plausible_length() {
                eprintln!("warning: {} digits is an unusual length", number.len());
            }
        }
        Command::Shell => shell::run(session, cli.print).await?,
    }

    Ok(())
}

fn build_session(cfg: Arc<Config>, cli: &Cli) -> Result<ChatSession> {
    let storage: Arc<dyn HistoryStorage> = if cli.ephemeral {
        Arc::new(MemoryStorage::default())
    } else {
        tracing::debug!(path = %cfg.history_file.display(), "using history file");
        Arc::new(JsonFileStorage::new(cfg.history_file.clone()))
    };
    let store = HistoryStore::open(storage, cfg.history_limit, cfg.undo_window);

    let extractor = GeminiExtractor::from_config(&cfg).context("failed to set up extraction")?;

    let opener: Arc<dyn ChatOpener> = if cli.print {
        Arc::new(PrintOpener)
    } else {
        Arc::new(SystemOpener)
    };

    Ok(ChatSession::new(cfg, store, Arc::new(extractor), opener))
}
