//! CLI binary for medicheck-client.
//!
//! A thin shim over the library crate that maps CLI flags to `ClientConfig`,
//! drives a `ValidationController` with a terminal view, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use medicheck_client::render::markdown_to_text;
use medicheck_client::{
    check_file, write_atomic, ClientConfig, ControllerState, RenderFormat, ResponseMode,
    ResultView, SubmissionReport, SubmitOutcome, ValidationController, Verdict,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
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

// ── Terminal result view using indicatif ─────────────────────────────────────

/// Terminal stand-in for the page: a spinner while a submission runs, and
/// the latest rendered content kept for printing once it finishes.
struct TerminalView {
    show_progress: bool,
    bar: Option<ProgressBar>,
    content: String,
    renders: usize,
}

impl TerminalView {
    fn new(show_progress: bool) -> Self {
        Self {
            show_progress,
            bar: None,
            content: String::new(),
            renders: 0,
        }
    }

    fn spinner(prefix: &str) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.set_message("waiting for server…");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }
}

impl ResultView for TerminalView {
    fn set_submit_enabled(&mut self, enabled: bool) {
        debug!("submit {}", if enabled { "enabled" } else { "disabled" });
    }

    fn set_content(&mut self, content: &str) {
        self.content = content.to_string();
        if content.is_empty() {
            return;
        }
        self.renders += 1;
        if let Some(ref bar) = self.bar {
            bar.set_message(format!(
                "{} chars received ({} updates)",
                content.len(),
                self.renders
            ));
        }
    }

    fn set_loading(&mut self, visible: bool) {
        match (visible, self.bar.take()) {
            (true, None) if self.show_progress => {
                self.bar = Some(Self::spinner("Validating"));
            }
            (false, Some(bar)) => bar.finish_and_clear(),
            (_, existing) => self.bar = existing,
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Stream the verdict as Markdown, rendered for the terminal
  medicheck summary.json

  # Talk to a remote backend using the buffered endpoint
  medicheck --url https://medicheck.example.org --mode buffered summary.json

  # Keep the HTML rendering, as the web page shows it
  medicheck --format html summary.json -o verdict.html

  # Raw buffered reply as JSON
  medicheck --mode buffered --json summary.json

  # Only check that the file is valid JSON (no network)
  medicheck --check-only summary.json

ENDPOINTS:
  buffered    POST {url}/api/validate-summary         → {"message": ..., "detail": ...}
  streaming   POST {url}/api/validate-summary-stream  → chunked Markdown

ENVIRONMENT VARIABLES:
  BACKEND_URL           Backend base URL (default http://localhost:8000)
  MEDICHECK_MODE        buffered | streaming
  MEDICHECK_FORMAT      text | markdown | html
  MEDICHECK_TIMEOUT     Whole-request timeout in seconds (0 = none)
  RUST_LOG              Log filter, overrides --verbose / --quiet
"#;

/// Validate clinical-summary JSON files against a MediCheck backend.
#[derive(Parser, Debug)]
#[command(
    name = "medicheck",
    version,
    about = "Validate clinical-summary JSON files against a MediCheck backend",
    long_about = "Parse a clinical-summary JSON file locally, submit it to a MediCheck \
validation backend, and render the verdict. Supports the buffered endpoint (one JSON reply) \
and the streaming endpoint (Markdown rendered progressively as it arrives).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JSON file to validate.
    input: PathBuf,

    /// Backend base URL.
    #[arg(short, long, env = "BACKEND_URL", default_value = medicheck_client::config::DEFAULT_BASE_URL)]
    url: String,

    /// Endpoint style the backend is deployed with.
    #[arg(short, long, env = "MEDICHECK_MODE", value_enum, default_value = "streaming")]
    mode: ModeArg,

    /// How the reply is rendered.
    #[arg(short, long, env = "MEDICHECK_FORMAT", value_enum, default_value = "text")]
    format: FormatArg,

    /// Override the buffered endpoint path.
    #[arg(long, env = "MEDICHECK_BUFFERED_PATH", default_value = medicheck_client::config::DEFAULT_BUFFERED_PATH)]
    buffered_path: String,

    /// Override the streaming endpoint path.
    #[arg(long, env = "MEDICHECK_STREAM_PATH", default_value = medicheck_client::config::DEFAULT_STREAM_PATH)]
    stream_path: String,

    /// Write the rendered reply to this file instead of stdout.
    #[arg(short, long, env = "MEDICHECK_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the raw buffered reply as JSON (buffered mode only).
    #[arg(long, env = "MEDICHECK_JSON")]
    json: bool,

    /// Whole-request timeout in seconds; 0 disables it.
    #[arg(long, env = "MEDICHECK_TIMEOUT", default_value_t = 0)]
    timeout: u64,

    /// Connect timeout in seconds; 0 disables it.
    #[arg(long, env = "MEDICHECK_CONNECT_TIMEOUT", default_value_t = 0)]
    connect_timeout: u64,

    /// Parse the file and report, without contacting the backend.
    #[arg(long)]
    check_only: bool,

    /// Disable the spinner.
    #[arg(long, env = "MEDICHECK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDICHECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the result and errors.
    #[arg(short, long, env = "MEDICHECK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Buffered,
    Streaming,
}

impl From<ModeArg> for ResponseMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Buffered => ResponseMode::Buffered,
            ModeArg::Streaming => ResponseMode::Streaming,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Text,
    Markdown,
    Html,
}

impl From<FormatArg> for RenderFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Text => RenderFormat::Text,
            FormatArg::Markdown => RenderFormat::Markdown,
            FormatArg::Html => RenderFormat::Html,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep INFO logs out
    // of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Check-only mode ──────────────────────────────────────────────────
    if cli.check_only {
        let payload = check_file(&cli.input)
            .await
            .with_context(|| format!("{} is not a valid JSON file", cli.input.display()))?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(payload.value()).context("Failed to serialise payload")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            println!("Size:         {} bytes", payload.byte_len());
            match payload.top_level_keys() {
                Some(n) => println!("Top level:    object, {n} keys"),
                None => println!("Top level:    {}", json_kind(payload.value())),
            }
            println!("Valid JSON:   {}", green("yes"));
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    if cli.json && config.mode != ResponseMode::Buffered {
        anyhow::bail!("--json needs --mode buffered: a streamed reply is Markdown, not JSON");
    }

    // ── Select file, then submit ─────────────────────────────────────────
    let view = TerminalView::new(show_progress);
    let mut controller =
        ValidationController::new(&config, view).context("Failed to set up the client")?;

    if let ControllerState::Invalid { message } =
        controller.handle_file_selected(Some(&cli.input)).await
    {
        anyhow::bail!("{}: {}", cli.input.display(), message);
    }

    let report = match controller.handle_submit().await {
        SubmitOutcome::Done(report) => report,
        SubmitOutcome::Failed(e) => return Err(e).context("Validation failed"),
        SubmitOutcome::Skipped => anyhow::bail!("No payload loaded"),
    };

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let reply = report
            .reply
            .as_ref()
            .context("Buffered submission returned no reply")?;
        println!(
            "{}",
            serde_json::to_string_pretty(reply).context("Failed to serialise reply")?
        );
    } else if let Some(ref output_path) = cli.output {
        write_atomic(output_path, report.rendered.as_bytes())
            .await
            .context("Failed to write output")?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(report.rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !report.rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        print_summary(&report, cli.output.as_ref());
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    ClientConfig::builder()
        .base_url(cli.url.clone())
        .mode(cli.mode.into())
        .format(cli.format.into())
        .buffered_path(cli.buffered_path.clone())
        .stream_path(cli.stream_path.clone())
        .request_timeout_secs(cli.timeout)
        .connect_timeout_secs(cli.connect_timeout)
        .build()
        .context("Invalid configuration")
}

/// Verdict (buffered replies) and timing on stderr.
fn print_summary(report: &SubmissionReport, output: Option<&PathBuf>) {
    if let Some(verdict) = report.reply.as_ref().and_then(|r| r.verdict()) {
        let message = report.reply.as_ref().and_then(|r| r.display_message());
        let text = markdown_to_text(&verdict.to_markdown(message));
        let colour = match verdict {
            Verdict::Approved => green,
            _ => red,
        };
        for (i, line) in text.lines().enumerate() {
            if i == 0 {
                eprintln!("{}", colour(&bold(line)));
            } else {
                eprintln!("{line}");
            }
        }
    }

    let target = output
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    eprintln!(
        "{} {}  {}{}",
        cyan("◆"),
        dim(&format!(
            "{} chunk{}, {} chars",
            report.chunks,
            if report.chunks == 1 { "" } else { "s" },
            report.raw.len()
        )),
        dim(&format!("{}ms", report.duration_ms)),
        target,
    );
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
