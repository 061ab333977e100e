//! `lightschool` command-line interface.
//!
//! ```text
//! lightschool ask "What is 12 plus 7?" --subject math --grade 2
//! lightschool calc "3 times (4 + 1)"
//! lightschool lessons validate data/lessons/en/math/grade1.json
//! lightschool lessons show --root data/lessons --subject math --grade 1 --locale en
//! lightschool providers --check
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use lightschool_core::lessons::validate_lesson_pack;
use lightschool_core::{extract_expression, evaluate, LessonStore, TutorRequest};
use lightschool_runtime::{ProviderRegistry, RuntimeConfig, TutorOrchestrator};

#[derive(Debug, Parser)]
#[command(name = "lightschool", version, about = "LightSchool tutor tools")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask the tutor a question
    Ask {
        message: String,

        #[arg(long, default_value = "math")]
        subject: String,

        #[arg(long, default_value_t = 1)]
        grade: u32,

        #[arg(long, default_value = "en")]
        locale: String,

        /// YAML or JSON runtime config
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the LLM backend; answer with calculator and rules only
        #[arg(long)]
        no_backend: bool,

        /// Print the reply as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract and evaluate an arithmetic expression
    Calc { expression: String },

    /// Work with lesson packs
    Lessons {
        #[command(subcommand)]
        command: LessonsCommand,
    },

    /// List backend providers compiled into this binary
    Providers {
        /// Also check that the configured backend is reachable
        #[arg(long)]
        check: bool,

        /// YAML or JSON runtime config
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum LessonsCommand {
    /// Check a lesson pack file against the lesson schema
    Validate { file: PathBuf },

    /// Load a lesson pack from a lesson directory and summarize it
    Show {
        #[arg(long, default_value = "data/lessons")]
        root: PathBuf,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        grade: u32,

        #[arg(long, default_value = "en")]
        locale: String,

        /// Print the full pack as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Ask {
            message,
            subject,
            grade,
            locale,
            config,
            no_backend,
            json,
        } => ask(message, subject, grade, locale, config, no_backend, json).await,
        Command::Calc { expression } => calc(&expression),
        Command::Lessons { command } => match command {
            LessonsCommand::Validate { file } => validate_lessons(&file),
            LessonsCommand::Show {
                root,
                subject,
                grade,
                locale,
                json,
            } => show_lessons(root, &subject, grade, &locale, json),
        },
        Command::Providers { check, config } => providers(check, config).await,
    }
}

async fn ask(
    message: String,
    subject: String,
    grade: u32,
    locale: String,
    config: Option<PathBuf>,
    no_backend: bool,
    json: bool,
) -> Result<()> {
    let mut config = RuntimeConfig::load(config.as_deref()).context("Failed to load config")?;
    if no_backend {
        config.backend.enabled = false;
    }

    let orchestrator =
        TutorOrchestrator::from_config(config).context("Failed to build tutor runtime")?;
    tracing::debug!(backend = orchestrator.has_backend(), "Tutor runtime ready");
    let reply = orchestrator
        .get_tutor_reply(&TutorRequest::new(message, subject, grade, locale))
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        println!("{}", reply.reply);
        println!("(source: {})", reply.source);
    }
    Ok(())
}

fn calc(input: &str) -> Result<()> {
    let expression = match extract_expression(input) {
        Some(expression) => expression,
        None => bail!("No arithmetic expression found in '{}'", input),
    };
    let value = evaluate(&expression)
        .with_context(|| format!("Could not evaluate '{}'", expression))?;
    println!("{} = {}", expression, value);
    Ok(())
}

fn validate_lessons(file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    if let Err(errors) = validate_lesson_pack(&value) {
        for error in &errors {
            eprintln!("  - {}", error);
        }
        bail!("{} has {} schema error(s)", file.display(), errors.len());
    }

    let units = value["units"].as_array().map(|u| u.len()).unwrap_or(0);
    println!("{}: valid ({} units)", file.display(), units);
    Ok(())
}

fn show_lessons(root: PathBuf, subject: &str, grade: u32, locale: &str, json: bool) -> Result<()> {
    let pack = LessonStore::new(root).load(subject, grade, locale)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pack)?);
        return Ok(());
    }

    println!("{} grade {} ({})", pack.subject, pack.grade, pack.locale);
    for unit in &pack.units {
        println!(
            "  {}: {} [{} cards, {} questions]",
            unit.id,
            unit.title,
            unit.cards.len(),
            unit.quiz.len()
        );
    }
    Ok(())
}

async fn providers(check: bool, config: Option<PathBuf>) -> Result<()> {
    for info in ProviderRegistry::with_defaults().describe() {
        println!(
            "{:<8} {} (default {})",
            info.provider_type, info.description, info.default_base_url
        );
    }
    if !check {
        return Ok(());
    }

    let config = RuntimeConfig::load(config.as_deref()).context("Failed to load config")?;
    let orchestrator =
        TutorOrchestrator::from_config(config).context("Failed to build tutor runtime")?;
    match (orchestrator.backend_name(), orchestrator.backend_healthy().await) {
        (Some(name), Some(true)) => println!("backend {}: reachable", name),
        (Some(name), _) => bail!("backend {} is not reachable", name),
        (None, _) => println!("backend disabled"),
    }
    Ok(())
}
