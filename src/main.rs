use std::panic;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lms_judge::config::JudgeConfig;
use lms_judge::core::domain::TestCase;
use lms_judge::engine::Engine;
use lms_judge::grading::redaction::redact;

#[derive(Parser, Debug)]
#[clap(name = "lms-judge", version, about = "Run code locally or through a remote judge")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(long, global = true, help = "JSON config file; JUDGE_* variables override it")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a source file once and print the result
    Exec {
        file: PathBuf,
        #[clap(long, short)]
        language: String,
        #[clap(long, help = "File fed to the program's standard input")]
        stdin: Option<PathBuf>,
    },
    /// Run a source file against a JSON list of test cases
    Test {
        file: PathBuf,
        #[clap(long, short)]
        language: String,
        #[clap(long)]
        cases: PathBuf,
        #[clap(long, help = "Mask input and output of hidden cases")]
        redact: bool,
    },
}

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    let config = JudgeConfig::load(cli.config.as_deref())?;
    let engine = Engine::new(&config)?;

    let ctrl_c = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.shutdown();
        }
    });

    match cli.command {
        Command::Exec {
            file,
            language,
            stdin,
        } => {
            let code = read(&file).await?;
            let stdin = match stdin {
                Some(path) => read(&path).await?,
                None => String::new(),
            };
            let result = engine.execute_code(&code, &language, &stdin).await;
            print_json(&result)?;
        }
        Command::Test {
            file,
            language,
            cases,
            redact: hide,
        } => {
            let code = read(&file).await?;
            let cases: Vec<TestCase> = serde_json::from_str(&read(&cases).await?)?;
            let results = engine.run_test_cases(&code, &language, &cases).await;
            let results = if hide { redact(&results) } else { results };
            print_json(&results)?;
        }
    }

    Ok(())
}

async fn read(path: &Path) -> Result<String, std::io::Error> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        tracing::error!("Failed to read {}: {}", path.display(), e);
        e
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
