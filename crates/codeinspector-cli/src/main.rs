use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use codeinspector_ai::LLMProviderFactory;
use codeinspector_core::{ConfigManager, LoggingConfig, PipelineError, StateField};
use codeinspector_pipeline::{
    format_report, save_output, score_quality, timestamped_filename, Pipeline, QualityReport,
};
use colored::*;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

mod samples;

#[derive(Parser)]
#[command(
    name = "code-inspector",
    version,
    about = "Code Inspector - staged LLM analysis of a code snippet",
    long_about = "Runs a snippet through parse, knowledge graph, analysis, diagram and explanation stages and prints the combined result."
)]
#[command(group(ArgGroup::new("input").args(["code", "file", "sample"])))]
struct Cli {
    /// Code snippet to analyze
    #[arg(long)]
    code: Option<String>,

    /// Path to a source file to analyze
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Name of a built-in sample
    #[arg(long)]
    sample: Option<String>,

    /// List the built-in samples and exit
    #[arg(long)]
    list_samples: bool,

    /// Programming language (auto-detected if not specified)
    #[arg(long)]
    language: Option<String>,

    /// Output file (default: <output dir>/analysis_TIMESTAMP.json)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Do not write the result to disk
    #[arg(long)]
    no_save: bool,

    /// Score code quality after the analysis
    #[arg(long)]
    quality: bool,

    /// Console output format
    #[arg(long, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Explicit config file instead of the default search path
    #[arg(long, env = "CODEINSPECTOR_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_samples {
        print_samples();
        return Ok(());
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    let config = manager.config();

    init_tracing(cli.verbose, &config.logging);
    if let Some(path) = manager.config_path() {
        debug!("Using config file {}", path.display());
    }

    let (code, language) = resolve_input(&cli)?;

    let provider = LLMProviderFactory::create_from_config(&config.llm)
        .context("Failed to create LLM provider")?;
    info!(
        "Using {} model {}",
        provider.provider_name(),
        provider.model_name()
    );
    let pipeline = Pipeline::from_config(provider, &config.llm);

    let state = match pipeline.run_detect(&code, language.as_deref()).await {
        Ok(state) => state,
        Err(PipelineError::Stage(failure)) => {
            eprintln!(
                "{} stage {} failed: {}",
                "Error:".red().bold(),
                failure.stage_name().yellow(),
                failure.cause
            );
            let completed: Vec<&str> = [
                StateField::ParsedStructure,
                StateField::KnowledgeGraph,
                StateField::Analysis,
                StateField::Flowchart,
                StateField::CallGraph,
                StateField::Explanations,
            ]
            .into_iter()
            .filter(|field| failure.state.is_populated(*field))
            .map(|field| field.as_str())
            .collect();
            if !completed.is_empty() {
                eprintln!("{} {}", "Completed:".cyan(), completed.join(", "));
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let quality = if cli.quality {
        Some(
            score_quality(pipeline.provider().as_ref(), &state, pipeline.generation_config())
                .await?,
        )
    } else {
        None
    };

    print_result(cli.format, &state, quality.as_ref())?;

    let save = !cli.no_save && (config.output.save || cli.output.is_some());
    if save {
        let path = cli.output.clone().unwrap_or_else(|| {
            config
                .output
                .dir
                .join(timestamped_filename("analysis", "json"))
        });
        let written = save_output(&state, &path)
            .with_context(|| format!("Failed to save output to {}", path.display()))?;
        eprintln!("{} {}", "Output saved to:".green(), written.display());
    }

    Ok(())
}

fn init_tracing(verbose: bool, logging: &LoggingConfig) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    // Logs go to stderr so JSON on stdout stays machine-readable
    let registry = Registry::default().with(filter);
    if logging.format == "compact" {
        let subscriber = registry.with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        );
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber =
            registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// Source text plus the language, when one is known up front.
fn resolve_input(cli: &Cli) -> Result<(String, Option<String>)> {
    if let Some(code) = &cli.code {
        return Ok((code.clone(), cli.language.clone()));
    }

    if let Some(path) = &cli.file {
        let code = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok((code, cli.language.clone()));
    }

    if let Some(name) = &cli.sample {
        let Some(sample) = samples::find(name) else {
            bail!(
                "unknown sample '{}' (available: {})",
                name,
                samples::names().join(", ")
            );
        };
        let language = cli
            .language
            .clone()
            .unwrap_or_else(|| sample.language.to_string());
        return Ok((sample.code.to_string(), Some(language)));
    }

    bail!("no code provided; use --code, --file or --sample (see --list-samples)")
}

fn print_samples() {
    println!("{}", "Available samples:".bold());
    for (i, sample) in samples::SAMPLES.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            sample.name.cyan(),
            format!("({})", sample.language).dimmed()
        );
    }
}

fn print_result(
    format: OutputFormat,
    state: &codeinspector_core::PipelineState,
    quality: Option<&QualityReport>,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = match quality {
                Some(report) => serde_json::json!({ "analysis": state, "quality": report }),
                None => serde_json::to_value(state)?,
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Pretty => {
            println!("{}", format_report(state));
            if let Some(report) = quality {
                println!("{}", report.to_markdown());
            }
        }
    }
    Ok(())
}
