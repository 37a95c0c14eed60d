//! Trendline CLI
//!
//! Command-line front end for:
//! - Running the whole pipeline (references → generator → validated payload → chart)
//! - Ingesting references on their own
//! - Recovering and validating a saved generator response
//! - Charting a saved payload
//!
//! JSON goes to stdout (or `--out`); status lines and logs go to stderr.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use trendline_ingest::{
    DocumentUpload, EncodedDocument, EvidenceIntake, IngestConfig, IngestionResult, IngestionStatus,
    ReferenceIngestor,
};
use trendline_llm::{
    recover_object, validate_payload, GenerationOrchestrator, LLMConfig, Pipeline, PipelineError,
    Provider, ScriptedGenerator, TextGenerator, UnifiedClient,
};
use trendline_series::{DualAxisChart, GeneratedPayload};

mod logging;

/// Timed-out document parsers keep their blocking thread, so cap the pool.
const MAX_BLOCKING_THREADS: usize = 16;

#[derive(Parser)]
#[command(name = "trendline")]
#[command(author, version, about = "Trendline: narrative trends as charts")]
struct Cli {
    /// Debug-level logs for trendline crates (overridden by TRENDLINE_LOG / RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print `{ ingestion, payload, chart }` JSON.
    Generate {
        /// What to chart, e.g. "The rise and fall of X" (overrides the intake's prompt)
        #[arg(short, long)]
        prompt: Option<String>,

        #[command(flatten)]
        evidence: EvidenceArgs,

        #[command(flatten)]
        generator: GeneratorArgs,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Ingest references only and print the `IngestionResult`.
    Ingest {
        #[command(flatten)]
        evidence: EvidenceArgs,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Recover and validate a saved generator response (`-` reads stdin).
    Recover {
        input: PathBuf,

        /// Require a source digest, as when references were ingested
        #[arg(long)]
        with_references: bool,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Chart a saved payload: points and axis ranges (`-` reads stdin).
    Chart {
        input: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct EvidenceArgs {
    /// JSON evidence intake (`{ prompt, text, urls, documents }`); flags below add to it
    #[arg(long)]
    intake: Option<PathBuf>,

    /// Free-text reference
    #[arg(long)]
    text: Option<String>,

    /// Web page to use as a reference (repeatable)
    #[arg(long = "url")]
    urls: Vec<String>,

    /// Document to use as a reference: PDF, DOCX, RTF or text (repeatable)
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Concurrent source limit (default from TRENDLINE_INGEST_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-link fetch timeout in seconds
    #[arg(long)]
    fetch_timeout_secs: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Openai,
    Anthropic,
    Local,
}

impl From<ProviderArg> for Provider {
    fn from(value: ProviderArg) -> Self {
        match value {
            ProviderArg::Openai => Provider::OpenAI,
            ProviderArg::Anthropic => Provider::Anthropic,
            ProviderArg::Local => Provider::Local,
        }
    }
}

#[derive(Args)]
struct GeneratorArgs {
    /// Generator provider (default: detected from the environment)
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    #[arg(long)]
    model: Option<String>,

    /// Override the provider base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Per-call generator timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Replay saved responses instead of calling a provider (repeatable, in order)
    #[arg(long = "replay", conflicts_with_all = ["provider", "model", "base_url"])]
    replay: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .max_blocking_threads(MAX_BLOCKING_THREADS)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match cli.command {
        Commands::Generate {
            prompt,
            evidence,
            generator,
            out,
        } => runtime.block_on(cmd_generate(prompt, &evidence, &generator, out.as_deref())),
        Commands::Ingest { evidence, out } => runtime.block_on(cmd_ingest(&evidence, out.as_deref())),
        Commands::Recover {
            input,
            with_references,
            out,
        } => cmd_recover(&input, with_references, out.as_deref()),
        Commands::Chart { input, out } => cmd_chart(&input, out.as_deref()),
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Serialize)]
struct GenerateReport<'a> {
    generated_at: String,
    model: String,
    attempts: usize,
    strategy: String,
    repaired: bool,
    ingestion: &'a IngestionResult,
    payload: &'a GeneratedPayload,
    chart: DualAxisChart,
}

async fn cmd_generate(
    prompt: Option<String>,
    evidence: &EvidenceArgs,
    generator_args: &GeneratorArgs,
    out: Option<&Path>,
) -> Result<()> {
    let mut intake = evidence.build_intake()?;
    if let Some(prompt) = prompt {
        intake.prompt = prompt;
    }

    let ingestor = ReferenceIngestor::http(evidence.ingest_config()?)
        .context("failed to build HTTP client for link fetching")?;
    let generator = generator_args.build()?;
    let model = generator.model_name();

    let mut orchestrator = GenerationOrchestrator::new(generator);
    if let Some(secs) = generator_args.timeout_secs {
        orchestrator = orchestrator.with_timeout(Duration::from_secs(secs));
    }
    let pipeline = Pipeline::new(ingestor, orchestrator);

    eprintln!("{} {}", "generating".cyan().bold(), intake.prompt.bold());
    let output = match pipeline.run(&intake).await {
        Ok(output) => output,
        Err(err) => return Err(report_pipeline_error(&err)),
    };

    report_ingestion(&output.ingestion);
    let report = GenerateReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        model,
        attempts: output.attempts,
        strategy: output.strategy.to_string(),
        repaired: output.repaired,
        ingestion: &output.ingestion,
        payload: &output.payload,
        chart: output.chart(),
    };
    write_json(&report, out)?;
    eprintln!(
        "{} {} phases (attempt {}, {})",
        "ok".green().bold(),
        output.payload.phases.len(),
        output.attempts,
        output.strategy
    );
    Ok(())
}

async fn cmd_ingest(evidence: &EvidenceArgs, out: Option<&Path>) -> Result<()> {
    let intake = evidence.build_intake()?;
    let ingestor = ReferenceIngestor::http(evidence.ingest_config()?)
        .context("failed to build HTTP client for link fetching")?;

    let result = ingestor.ingest_intake(&intake).await;
    report_ingestion(&result);
    write_json(&result, out)
}

#[derive(Serialize)]
struct RecoverReport {
    strategy: String,
    repaired: bool,
    payload: GeneratedPayload,
}

fn cmd_recover(input: &Path, with_references: bool, out: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let recovered = recover_object(&text).ok_or_else(|| {
        anyhow!(
            "no JSON object could be recovered from {}",
            input.display()
        )
    })?;

    let strategy = recovered.strategy.to_string();
    let repaired = recovered.repaired;
    let payload = validate_payload(recovered.into_value(), with_references)
        .with_context(|| format!("recovered object from {} failed validation", input.display()))?;

    eprintln!(
        "{} recovered via {}{}",
        "ok".green().bold(),
        strategy.bold(),
        if repaired { " (repaired)" } else { "" }
    );
    write_json(
        &RecoverReport {
            strategy,
            repaired,
            payload,
        },
        out,
    )
}

fn cmd_chart(input: &Path, out: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let payload: GeneratedPayload = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid payload", input.display()))?;

    let chart = DualAxisChart::from_payload(&payload);
    eprintln!(
        "{} {} points{}",
        "ok".green().bold(),
        chart.primary.points.len(),
        chart
            .secondary
            .as_ref()
            .map(|s| format!(" + {} secondary", s.points.len()))
            .unwrap_or_default()
    );
    write_json(&chart, out)
}

// ============================================================================
// Argument plumbing
// ============================================================================

impl EvidenceArgs {
    fn build_intake(&self) -> Result<EvidenceIntake> {
        let mut intake = match &self.intake {
            Some(path) => {
                let raw = read_input(path)?;
                serde_json::from_str::<EvidenceIntake>(&raw)
                    .with_context(|| format!("{} is not a valid evidence intake", path.display()))?
            }
            None => EvidenceIntake::default(),
        };

        if let Some(text) = &self.text {
            intake.text = Some(match intake.text.take() {
                Some(existing) => format!("{existing}\n\n{text}"),
                None => text.clone(),
            });
        }
        intake.urls.extend(self.urls.iter().cloned());

        for path in &self.files {
            let upload = DocumentUpload::from_path(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            intake = intake.with_document(EncodedDocument::from_bytes(
                upload.name,
                upload.media_type,
                &upload.bytes,
            ));
        }
        Ok(intake)
    }

    fn ingest_config(&self) -> Result<IngestConfig> {
        let mut config = IngestConfig::from_env()?;
        if let Some(n) = self.concurrency {
            config = config.with_max_concurrency(n);
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config = config.with_fetch_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

impl GeneratorArgs {
    fn build(&self) -> Result<Arc<dyn TextGenerator>> {
        if !self.replay.is_empty() {
            let generator = ScriptedGenerator::new();
            for path in &self.replay {
                generator.push_text(read_input(path)?);
            }
            debug!(responses = self.replay.len(), "replaying saved responses");
            return Ok(Arc::new(generator));
        }

        let mut config = match self.provider {
            Some(provider) => LLMConfig::from_env_for(Some(provider.into()))?,
            None => LLMConfig::from_env()?,
        };
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs);
        }

        debug!(
            provider = ?config.provider,
            model = %config.model,
            timeout_secs = config.timeout_secs,
            "configured generator"
        );
        let client = UnifiedClient::from_config(config)?;
        Ok(Arc::new(client))
    }
}

// ============================================================================
// IO + reporting
// ============================================================================

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            debug!(path = %path.display(), bytes = json.len(), "writing output");
            fs::write(path, json + "\n").with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn report_ingestion(result: &IngestionResult) {
    let status = match result.status {
        IngestionStatus::Empty => return,
        IngestionStatus::Success => "references".green().bold(),
        IngestionStatus::Partial => "references".yellow().bold(),
        IngestionStatus::Failed => "references".red().bold(),
    };
    eprintln!(
        "{status} {} ingested, {} failed",
        result.entries.len(),
        result.errors.len()
    );
    for error in &result.errors {
        eprintln!("  {} {error}", "-".yellow());
    }
}

fn report_pipeline_error(err: &PipelineError) -> anyhow::Error {
    eprintln!("{} {}", "error".red().bold(), err.user_message());
    for detail in err.details() {
        eprintln!("  {} {detail}", "-".dimmed());
    }
    anyhow!("{err}")
}
