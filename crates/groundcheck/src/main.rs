use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use groundcheck_core::{CritiqueLoop, LoopSettings, TurnError, TurnReport};
use groundcheck_index::load_passages;
use groundcheck_logging::{init_tracing, LogFormat, Logger};
use groundcheck_model::{ModelConfig, OllamaEmbedder, OllamaService};

mod config;

use config::ProjectConfig;

#[derive(Parser, Debug)]
#[command(
    name = "groundcheck",
    about = "Grounded customer-support answers with an LLM-as-judge critique loop",
    version,
    author
)]
struct Cli {
    /// The customer question to answer
    question: String,

    /// Path to the JSONL passage index
    #[arg(short, long)]
    index: Option<PathBuf>,

    /// Working directory to load groundcheck.toml from (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Passages to retrieve
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Maximum generate/judge cycles
    #[arg(short = 'n', long)]
    max_cycles: Option<usize>,

    /// Generator model name
    #[arg(long)]
    gen_model: Option<String>,

    /// Judge model name
    #[arg(long)]
    judge_model: Option<String>,

    /// Embedding model name
    #[arg(long)]
    embed_model: Option<String>,

    /// Ollama base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also append JSONL events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output the final report as JSON
    #[arg(long)]
    json_output: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Effective settings after merging CLI flags over groundcheck.toml
/// over defaults.
struct Resolved {
    index_path: PathBuf,
    settings: LoopSettings,
    generation: ModelConfig,
    judge: ModelConfig,
    embedding: ModelConfig,
}

fn role_model_config(
    base_url: &str,
    cli_model: Option<&str>,
    role: &config::RoleConfig,
    default_model: &str,
    default_temp: f32,
    default_timeout: u64,
) -> ModelConfig {
    let model = cli_model
        .map(str::to_string)
        .or_else(|| role.model.clone())
        .unwrap_or_else(|| default_model.to_string());
    ModelConfig::new(base_url, model)
        .with_temperature(role.temperature.unwrap_or(default_temp))
        .with_timeout(Duration::from_secs(
            role.timeout_secs.unwrap_or(default_timeout),
        ))
}

fn resolve(cli: &Cli, file: Option<ProjectConfig>) -> Result<Resolved> {
    let file = file.unwrap_or_default();

    let max_cycles = cli.max_cycles.or(file.max_cycles).unwrap_or(3);
    if max_cycles == 0 {
        bail!("max-cycles must be at least 1");
    }

    let base_url = cli
        .base_url
        .clone()
        .or(file.ollama.base_url)
        .unwrap_or_else(|| "http://localhost:11434".to_string());

    Ok(Resolved {
        index_path: cli
            .index
            .clone()
            .or(file.index_path)
            .unwrap_or_else(|| PathBuf::from("data/passages.jsonl")),
        settings: LoopSettings {
            top_k: cli.top_k.or(file.retrieval.top_k).unwrap_or(5),
            max_cycles,
        },
        generation: role_model_config(
            &base_url,
            cli.gen_model.as_deref(),
            &file.generation,
            "gemma3:1b",
            0.1,
            120,
        ),
        judge: role_model_config(
            &base_url,
            cli.judge_model.as_deref(),
            &file.judge,
            "llama3.1:8b",
            0.0,
            120,
        ),
        embedding: role_model_config(
            &base_url,
            cli.embed_model.as_deref(),
            &file.embedding,
            "nomic-embed-text",
            0.0,
            30,
        ),
    })
}

fn error_exit_code(err: &TurnError) -> i32 {
    match err {
        TurnError::Interrupted => 130,
        _ => 2,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let log_format: LogFormat = cli.log_format.into();
    init_tracing("warn", log_format);
    let logger = match cli.log_file {
        Some(ref path) => {
            Logger::with_file(log_format, path).context("Failed to open log file")?
        }
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);

    let file_config = ProjectConfig::load(&working_dir)?;
    let resolved = resolve(&cli, file_config)?;

    let (corpus, index) = load_passages(&resolved.index_path).with_context(|| {
        format!(
            "Failed to load passage index from {}",
            resolved.index_path.display()
        )
    })?;

    let generator = OllamaService::new(resolved.generation)?;
    let judge = OllamaService::new(resolved.judge)?;
    let embedder = OllamaEmbedder::new(resolved.embedding)?;

    let critique = CritiqueLoop::new(
        &generator,
        &judge,
        &embedder,
        &index,
        &corpus,
        resolved.settings,
        logger,
    );

    // Handle Ctrl+C gracefully
    let interrupt_handle = critique.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current cycle...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let report = match critique.ask(&cli.question).await {
        Ok(report) => report,
        Err(err) => {
            let code = error_exit_code(&err);
            eprintln!("{} {:#}", "Error:".red().bold(), anyhow::Error::from(err));
            std::process::exit(code);
        }
    };

    if cli.json_output {
        let json = serde_json::to_string_pretty(&report)?;
        println!("{}", json);
    } else {
        print_report(&report);
    }

    std::process::exit(report.exit_code());
}

fn print_report(report: &TurnReport) {
    println!();
    println!("{}", report.answer);
    println!();

    let verdict_line = format!(
        "{} after {} {}",
        report.verdict.label,
        report.cycle_count,
        if report.cycle_count == 1 { "cycle" } else { "cycles" },
    );
    if report.is_resolved() {
        println!("{}", verdict_line.green());
    } else {
        println!("{}", verdict_line.yellow());
        if !report.verdict.rationale.is_empty() {
            println!("{}", report.verdict.rationale.dimmed());
        }
    }

    if !report.sources.is_empty() {
        println!();
        println!("{}", "Sources:".bold());
        for source in &report.sources {
            println!(
                "  {} (score {:.3})",
                format!("{} p.{}", source.source_document, source.page).cyan(),
                source.score
            );
        }
    }
}
