//! CLI entry point for Vitae: ask questions about a resume from the terminal.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use vitae_core::config::default_config_path;
use vitae_core::{
    app_data_dir, load_config, load_default_config, load_document, status, Answer, Config, ConfigError,
    LoadError, SessionController, SessionError,
};

#[derive(Parser)]
#[command(name = "vitae")]
#[command(about = "Vitae: resume assistant using retrieval-augmented generation")]
struct Cli {
    /// Config file to use instead of config.toml in the app data directory.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Resume to answer questions about (overrides the config).
    #[arg(long, global = true, value_name = "PATH")]
    document: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where Vitae stores its config and index (app data directory).
    DataDir,
    /// Print the effective configuration as TOML.
    Config,
    /// Extract a document's pages and list them.
    Pages {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Build the vector index for the resume now.
    Index,
    /// Answer a single question and exit.
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,
        /// Print the answer and its context as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Ask questions interactively, one per line (default).
    Chat,
}

#[derive(Serialize)]
struct AnswerOutput<'a> {
    question: &'a str,
    answer: &'a str,
    context: Vec<ContextOutput<'a>>,
}

#[derive(Serialize)]
struct ContextOutput<'a> {
    pages: (u32, u32),
    text: &'a str,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("vitae=info,vitae_core=info"))
        .init();
    let cli = Cli::parse();

    let config = match resolve_config(cli.config.as_deref(), cli.document) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Commands::Chat) {
        Commands::Status => {
            println!("Vitae backend");
            println!("  core: {}", status());
            Ok(())
        }
        Commands::DataDir => {
            match app_data_dir() {
                Some(p) => println!("{}", p.display()),
                None => eprintln!("Could not determine app data directory."),
            }
            Ok(())
        }
        Commands::Config => {
            if let Some(path) = default_config_path() {
                println!("# default location: {}", path.display());
            }
            match toml::to_string_pretty(&config) {
                Ok(s) => println!("{}", s),
                Err(e) => eprintln!("Error: {}", e),
            }
            Ok(())
        }
        Commands::Pages { path } => pages(&path).map_err(SessionError::from),
        Commands::Index => index(&config).await,
        Commands::Ask { question, json } => ask(&config, &question, json).await,
        Commands::Chat => chat(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the config from `path`, or the app data directory when none is given, then applies
/// the `--document` override. A missing file means defaults; an unreadable one is an error.
fn resolve_config(path: Option<&Path>, document: Option<PathBuf>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => load_default_config()?,
    };
    if let Some(document) = document {
        config.document.path = document;
    }
    Ok(config)
}

fn pages(path: &Path) -> Result<(), LoadError> {
    let pages = load_document(path)?;
    println!("Extracted {} page(s) from {}", pages.len(), path.display());
    for p in pages {
        println!("  page {:>3}  {} chars  {}", p.page, p.text.chars().count(), preview(&p.text));
    }
    Ok(())
}

async fn index(config: &Config) -> Result<(), SessionError> {
    let mut session = SessionController::open(config)?;
    session.start().await?;
    println!(
        "Indexed {} chunk(s) from {} into {}",
        session.indexed_chunks().unwrap_or(0),
        session.document().display(),
        session.index_dir().display()
    );
    Ok(())
}

async fn ask(config: &Config, question: &str, json: bool) -> Result<(), SessionError> {
    let mut session = SessionController::open(config)?;
    let answer = session.ask(question).await?;
    if json {
        let output = answer_output(question, &answer);
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else {
        println!("### Answer:\n{}", answer.text);
    }
    Ok(())
}

/// Reads one question per line and answers it. A blank line, `exit`, or EOF ends the session.
/// Errors on a single question are printed and the loop continues.
async fn chat(config: &Config) -> Result<(), SessionError> {
    println!("Resume Assistant using RAG approach");
    let mut session = SessionController::open(config)?;

    println!("Processing resume...");
    match session.start().await {
        Ok(()) => println!("Resume processed successfully! You can now ask questions."),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => eprintln!("Error: {} (ask a question to retry)", e),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Ask a question about the resume: ");
        let _ = std::io::stdout().flush();
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::warn!("stdin: {}", e);
                break;
            }
        };
        let question = line.trim();
        if question.is_empty() || question == "exit" || question == "quit" {
            break;
        }
        println!("Searching for answer...");
        match session.ask(question).await {
            Ok(answer) => println!("\n### Answer:\n{}\n", answer.text),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}

fn answer_output<'a>(question: &'a str, answer: &'a Answer) -> AnswerOutput<'a> {
    AnswerOutput {
        question,
        answer: &answer.text,
        context: answer
            .context
            .iter()
            .map(|c| ContextOutput {
                pages: (c.page_start, c.page_end),
                text: &c.text,
            })
            .collect(),
    }
}

fn preview(text: &str) -> String {
    let p = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    if p.chars().count() > 60 {
        format!("{}...", p.chars().take(60).collect::<String>())
    } else {
        p.to_string()
    }
}
