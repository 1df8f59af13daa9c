//! CLI binary for edgequake-studycards.
//!
//! A thin shim over the library crate: maps flags to `StudyConfig` /
//! `ServerConfig`, runs the service or a local pipeline, and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_studycards::client::{ApiClient, StudyController};
use edgequake_studycards::pipeline::extract::extract_pdf_text;
use edgequake_studycards::pipeline::input::{load_document, DocumentKind};
use edgequake_studycards::{
    build_models, generate_flashcards, server, summarize, AppState, DocumentExtractor,
    ExtractedContent, FlashcardSet, ProgressCallback, ServerConfig, StudyConfig,
    SummaryProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for chunked summaries. Chunks may finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading text…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Summarizing");
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_summary_start(&self, total_chunks: usize) {
        self.activate_bar(total_chunks);
        if total_chunks > 1 {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Summarizing {total_chunks} chunks…"))
            ));
        }
    }

    fn on_chunk_complete(&self, chunk: usize, total: usize, summary_len: usize) {
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}",
            green("✓"),
            chunk,
            total,
            dim(&format!("{summary_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, chunk: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}",
            red("✗"),
            chunk,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_summary_complete(&self, total_chunks: usize, summary_words: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} chunks summarized into {} words",
                green("✔"),
                bold(&total_chunks.to_string()),
                summary_words
            );
        } else {
            eprintln!(
                "{} {}/{} chunks summarized  ({} used leading sentences)",
                cyan("⚠"),
                bold(&(total_chunks - failed).to_string()),
                total_chunks,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 8000
  studycards serve

  # Print the text of a PDF
  studycards extract lecture.pdf

  # Summarize a PDF or a text file locally
  studycards summarize notes.pdf
  studycards summarize https://example.org/chapter3.pdf --json

  # Eight flashcards from a text file
  studycards flashcards notes.txt -n 8

  # Drive a running service end to end
  studycards study notes.pdf --server http://localhost:8000

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY              OpenAI API key
  ANTHROPIC_API_KEY           Anthropic API key
  GEMINI_API_KEY              Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER      Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL             Override model ID
  STUDYCARDS_HOST / _PORT     Bind address for `serve` (0.0.0.0:8000)
  STUDYCARDS_CORS_ORIGINS     Comma-separated allowed origins
  STUDYCARDS_MAX_WORDS        Upload word limit (5000)
  STUDYCARDS_MAX_CARDS        Largest num_cards (10)
  STUDYCARDS_FALLBACK_MODEL   Secondary summarization model
  PDFIUM_LIB_PATH             Path to libpdfium (pdf-extract is used when absent)
"#;

/// Summaries and flashcards from PDFs and notes.
#[derive(Parser, Debug)]
#[command(
    name = "studycards",
    version,
    about = "Summaries and flashcards from PDFs and notes, via LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "STUDYCARDS_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "STUDYCARDS_PROVIDER")]
    provider: Option<String>,

    /// Model tried when a summarization call fails.
    #[arg(long, global = true, env = "STUDYCARDS_FALLBACK_MODEL")]
    fallback_model: Option<String>,

    /// Dedicated flashcard model (falls back to the summarization model).
    #[arg(long, global = true, env = "STUDYCARDS_FLASHCARD_MODEL")]
    flashcard_model: Option<String>,

    /// Concurrent model calls per request.
    #[arg(short, long, global = true)]
    concurrency: Option<usize>,

    /// Retries per model call.
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Per-call LLM timeout in seconds.
    #[arg(long, global = true)]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, global = true, env = "STUDYCARDS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "STUDYCARDS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "STUDYCARDS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Bind host.
        #[arg(long)]
        host: Option<String>,
        /// Bind port.
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the text of a PDF or text file.
    Extract {
        /// Local file path or HTTP/HTTPS URL.
        input: String,
    },
    /// Summarize a PDF or text file.
    Summarize {
        /// Local file path or HTTP/HTTPS URL.
        input: String,
    },
    /// Generate flashcards from a PDF or text file.
    Flashcards {
        /// Local file path or HTTP/HTTPS URL.
        input: String,
        /// Number of cards.
        #[arg(short = 'n', long, default_value_t = 5)]
        num_cards: usize,
    },
    /// Upload, summarize and generate cards against a running service.
    Study {
        /// Local file path or HTTP/HTTPS URL.
        input: String,
        /// Service base URL.
        #[arg(long, env = "STUDYCARDS_SERVER", default_value = "http://localhost:8000")]
        server: String,
        /// Number of cards.
        #[arg(short = 'n', long, default_value_t = 5)]
        num_cards: usize,
        /// HTTP request timeout in seconds (reqwest default when unset).
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The server always logs at info; local runs stay quiet behind the bar.
    let serving = matches!(cli.command, Command::Serve { .. });
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !serving;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Serve { host, port } => run_serve(&cli, host.clone(), *port).await,
        Command::Extract { input } => run_extract(&cli, input).await,
        Command::Summarize { input } => run_summarize(&cli, input, show_progress).await,
        Command::Flashcards { input, num_cards } => run_flashcards(&cli, input, *num_cards).await,
        Command::Study {
            input,
            server,
            num_cards,
            timeout,
        } => run_study(&cli, input, server, *num_cards, *timeout).await,
    }
}

/// `STUDYCARDS_*` environment first, then explicit flags.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StudyConfig> {
    let mut config = StudyConfig::from_env().context("Invalid configuration")?;

    if cli.model.is_some() {
        config.model = cli.model.clone();
    }
    if cli.provider.is_some() {
        config.provider_name = cli.provider.clone();
    }
    if cli.fallback_model.is_some() {
        config.fallback_model = cli.fallback_model.clone();
    }
    if cli.flashcard_model.is_some() {
        config.flashcard_model = cli.flashcard_model.clone();
    }
    if let Some(n) = cli.concurrency {
        config.concurrency = n.max(1);
    }
    if let Some(n) = cli.max_retries {
        config.max_retries = n;
    }
    if let Some(secs) = cli.api_timeout {
        config.api_timeout_secs = secs;
    }
    config.progress_callback = progress;
    Ok(config)
}

/// Load `input` and turn it into text, extracting PDFs.
async fn read_text(input: &str, timeout_secs: u64) -> Result<String> {
    let doc = load_document(input, timeout_secs)
        .await
        .with_context(|| format!("Failed to load '{input}'"))?;

    match doc.kind {
        DocumentKind::Pdf => {
            let extractor = Arc::new(DocumentExtractor::default());
            extract_pdf_text(extractor, doc.bytes)
                .await
                .with_context(|| format!("Failed to extract text from '{input}'"))
        }
        DocumentKind::Text => doc.into_text().context("Input is not UTF-8 text"),
    }
}

async fn run_serve(cli: &Cli, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = build_config(cli, None)?;
    let mut server_config = ServerConfig::from_env().context("Invalid server configuration")?;
    if let Some(h) = host {
        server_config.host = h;
    }
    if let Some(p) = port {
        server_config.port = p;
    }

    let models = build_models(&config).context("Failed to configure LLM provider")?;
    let extractor = DocumentExtractor::default();
    tracing::info!(
        "Extraction backends: {}",
        extractor.backend_names().join(" → ")
    );

    let state = AppState::new(extractor, models, config);
    server::serve(state, &server_config)
        .await
        .with_context(|| format!("Server on {} failed", server_config.addr()))
}

async fn run_extract(cli: &Cli, input: &str) -> Result<()> {
    let text = read_text(input, cli.download_timeout).await?;
    let content = ExtractedContent::new(text);

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&content).context("Failed to serialise output")?
        );
    } else {
        println!("{}", content.text.trim_end());
        if !cli.quiet {
            eprintln!(
                "{}",
                dim(&format!(
                    "{} words, {} chars",
                    content.word_count, content.char_count
                ))
            );
        }
    }
    Ok(())
}

async fn run_summarize(cli: &Cli, input: &str, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SummaryProgressCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress)?;

    let text = read_text(input, cli.download_timeout).await?;
    let content =
        ExtractedContent::checked(text, config.max_words).context("Input rejected")?;
    let models = build_models(&config).context("Failed to configure LLM provider")?;

    let output = summarize(&content.text, models.summarizer.as_ref(), &config)
        .await
        .context("Summary generation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else {
        println!("{}", output.summary.summary);
        if !cli.quiet {
            eprintln!(
                "   {} → {} words  /  {} tokens in  /  {} tokens out  —  {}ms",
                output.summary.original_length,
                output.summary.summary_length,
                dim(&output.stats.input_tokens.to_string()),
                dim(&output.stats.output_tokens.to_string()),
                output.stats.duration_ms,
            );
        }
    }
    Ok(())
}

async fn run_flashcards(cli: &Cli, input: &str, num_cards: usize) -> Result<()> {
    let config = build_config(cli, None)?;

    let text = read_text(input, cli.download_timeout).await?;
    let content =
        ExtractedContent::checked(text, config.max_words).context("Input rejected")?;
    let models = build_models(&config).context("Failed to configure LLM provider")?;

    let output = generate_flashcards(&content.text, num_cards, models.flashcards.as_ref(), &config)
        .await
        .context("Flashcard generation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else {
        print_cards(&output.set);
        if !cli.quiet {
            let s = &output.stats;
            eprintln!(
                "{} {} cards  ({} generated, {} fallback, {} padded)  —  {}ms",
                if s.fallback == 0 { green("✔") } else { cyan("⚠") },
                bold(&output.set.total_count.to_string()),
                s.generated,
                s.fallback,
                s.padded,
                s.duration_ms,
            );
        }
    }
    Ok(())
}

async fn run_study(
    cli: &Cli,
    input: &str,
    server: &str,
    num_cards: usize,
    timeout: Option<u64>,
) -> Result<()> {
    let api = ApiClient::new(server, timeout.map(Duration::from_secs))
        .context("Failed to build HTTP client")?;
    let health = api
        .health()
        .await
        .with_context(|| format!("Service at {server} is not reachable"))?;
    if !cli.quiet {
        eprintln!("{} {} (v{})", cyan("◆"), health.message, health.version);
    }

    let controller = StudyController::new(api);
    let doc = load_document(input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to load '{input}'"))?;
    let uploaded = match doc.kind {
        DocumentKind::Pdf => {
            let name = doc.name.clone();
            controller.upload_pdf(&name, doc.bytes).await
        }
        DocumentKind::Text => {
            let text = doc.into_text().context("Input is not UTF-8 text")?;
            controller.upload_text(&text).await
        }
    };
    if let Err(e) = uploaded {
        anyhow::bail!("Upload failed: {}", e.banner());
    }

    // Summary and cards are independent actions; run them together.
    let (summary, cards) = tokio::join!(
        controller.summarize(),
        controller.generate_flashcards(num_cards)
    );

    let session = controller.snapshot();
    if cli.json {
        let value = serde_json::json!({
            "content": session.content(),
            "summary": session.summary(),
            "flashcards": session.flashcards(),
            "error": session.error(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise output")?
        );
    } else {
        if let Some(s) = session.summary() {
            println!("{}\n{}\n", bold("SUMMARY"), s.summary);
        }
        if let Some(set) = session.flashcards() {
            println!("{}", bold("FLASHCARDS"));
            print_cards(set);
        }
    }

    match (summary, cards) {
        (Ok(_), Ok(_)) => Ok(()),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("{} {}", red("✘"), e.banner());
            anyhow::bail!("Study session finished with errors")
        }
    }
}

fn print_cards(set: &FlashcardSet) {
    for (i, card) in set.flashcards.iter().enumerate() {
        println!("{:>2}. {}", i + 1, card.question);
        println!("    {} {}", dim("→"), card.answer);
    }
}
