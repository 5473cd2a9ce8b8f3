//! # Datagent CLI
//!
//! Command-line interface for running data agents.
//!
//! Usage:
//!   datagent [--preset <preset>] [task]
//!
//! Examples:
//!   datagent
//!   datagent --preset analyst
//!   datagent -p qa --transcript run.json
//!   datagent --resume run.json "Now compare the revenue columns."

mod config;
mod presets;

use anyhow::Context;
use clap::Parser;
use config::Settings;
use datagent_agent::{Agent, AgentConfig, AgentRun, RunOutcome, UnknownActionPolicy};
use datagent_core::{
    CachedGenerator, Environment, FunctionCallingLanguage, GenerationOptions, MaybeCached, Memory,
    OpenAIProvider, ProviderGenerator, ResponseCache, ResultEnvelope,
};
use presets::PresetKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "datagent")]
#[command(author, version, about = "Datagent - a tool-calling agent for tabular data")]
struct Cli {
    /// Task to execute (defaults to the preset's task)
    #[arg(trailing_var_arg = true)]
    task: Vec<String>,

    /// Agent preset
    #[arg(short, long, value_enum, default_value_t = PresetKind::Describe)]
    preset: PresetKind,

    /// Maximum model calls for this run
    #[arg(short = 'n', long, default_value_t = 50)]
    max_iterations: usize,

    /// Data directory (overrides DATAGENT_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Model name (overrides DATAGENT_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Let the model retry after naming an unknown action instead of stopping
    #[arg(long)]
    retry_unknown: bool,

    /// Write the final transcript to this file
    #[arg(short, long)]
    transcript: Option<PathBuf>,

    /// Resume from a transcript written by --transcript
    #[arg(short, long)]
    resume: Option<PathBuf>,

    /// Also write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose output (debug logs and the full transcript)
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only show final answer
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();
    Ok(())
}

fn load_memory(path: Option<&Path>) -> anyhow::Result<Option<Memory>> {
    match path {
        Some(path) => {
            let memory = Memory::load(path)
                .with_context(|| format!("Failed to resume from {}", path.display()))?;
            info!(entries = memory.len(), path = %path.display(), "resuming transcript");
            Ok(Some(memory))
        }
        None => Ok(None),
    }
}

fn print_run(run: &AgentRun, verbose: bool, quiet: bool) {
    if verbose {
        println!("\n--- Transcript ({} entries) ---", run.memory.len());
        for (i, entry) in run.memory.entries().iter().enumerate() {
            println!("  {:3}. [{:?}] {}", i, entry.kind, entry.content);
        }
    }

    match &run.outcome {
        RunOutcome::Terminated { envelope } => {
            if !quiet {
                println!("\n--- FINAL ANSWER ---\n");
            }
            println!("{}", envelope.display_result());
        }
        RunOutcome::Exhausted => {
            eprintln!("\nIteration limit reached after {} iterations.", run.iterations);
            if let Some(answer) = run.best_effort_answer() {
                if !quiet {
                    println!("\n--- LAST RESULT ---\n");
                }
                println!("{}", ResultEnvelope::success(answer).display_result());
            }
        }
        RunOutcome::UnknownAction { tool } => {
            eprintln!("\nStopped: the model requested unknown action '{}'.", tool);
        }
        RunOutcome::Cancelled => {
            eprintln!("\nCancelled after {} iterations.", run.iterations);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(&cli)?;

    let mut settings = Settings::from_env()?;
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    info!(model = %settings.model, data_dir = %settings.data_dir.display(), preset = ?cli.preset, "loaded configuration");

    let preset = cli.preset.build()?;
    let task = if cli.task.is_empty() {
        preset.task.to_string()
    } else {
        cli.task.join(" ")
    };

    let provider = OpenAIProvider::new(settings.provider_config())?;
    let options = GenerationOptions::default().with_model(settings.model.clone());
    let provider_generator = ProviderGenerator::with_options(provider, options);
    let generator = if settings.use_cache {
        info!(dir = %settings.cache_dir.display(), "response cache enabled");
        MaybeCached::Cached(CachedGenerator::new(
            &provider_generator,
            ResponseCache::new(&settings.cache_dir)?,
        ))
    } else {
        MaybeCached::Direct(&provider_generator)
    };

    let config = AgentConfig {
        max_iterations: cli.max_iterations,
        unknown_action_policy: if cli.retry_unknown {
            UnknownActionPolicy::Retry
        } else {
            UnknownActionPolicy::Terminate
        },
    };
    let mut agent = Agent::new(
        preset.goals,
        FunctionCallingLanguage::new(),
        preset.registry,
        generator,
        Environment::with_data_dir(&settings.data_dir),
    )
    .with_config(config);

    let memory = load_memory(cli.resume.as_deref())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current step");
            on_interrupt.cancel();
        }
    });

    let run = agent.run_with_cancellation(&task, memory, cancel).await?;

    let usage = provider_generator.usage();
    info!(
        calls = usage.calls,
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        total_tokens = usage.total_tokens(),
        "token usage"
    );

    if let Some(path) = &cli.transcript {
        run.memory
            .save(path)
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
        info!(path = %path.display(), "transcript written");
    }

    print_run(&run, cli.verbose, cli.quiet);

    Ok(match run.outcome {
        RunOutcome::Terminated { .. } => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
