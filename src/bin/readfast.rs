//! CLI binary for readfast.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `WorkflowConfig` / `TextEditor` and prints results.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use readfast::{
    bionic, BatchProgressCallback, ConversionWorkflow, HttpConversionEndpoint, LimitTable,
    ProgressCallback, SessionState, SourceFile, TextEditor, Tier, WorkflowConfig,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a 0–100 bar driven by the workflow's eased
/// percentage, plus one log line per settled job.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:42.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_jobs: usize) {
        self.bar
            .println(format!("{}", bold(&format!("Converting {total_jobs} files…"))));
    }

    fn on_progress(&self, percent: f64, status: &'static str) {
        self.bar.set_position(percent as u64);
        self.bar.set_message(status.to_string());
    }

    fn on_job_complete(&self, index: usize, total_jobs: usize, name: &str, result_bytes: usize) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            green("✓"),
            index + 1,
            total_jobs,
            name,
            dim(&format!("{result_bytes} bytes")),
        ));
        self.bar
            .set_position(((index + 1) * 100 / total_jobs) as u64);
    }

    fn on_job_error(&self, index: usize, total_jobs: usize, name: &str, error: String) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            red("✗"),
            index + 1,
            total_jobs,
            name,
            red(&error),
        ));
        self.bar
            .set_position(((index + 1) * 100 / total_jobs) as u64);
    }

    fn on_batch_complete(&self, total_jobs: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_jobs.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} files converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files converted  ({} failed)",
                red("⚠"),
                bold(&success_count.to_string()),
                total_jobs,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Transform text from stdin to fast-read markup (stdout)
  echo "make reading faster" | readfast text

  # Transform a file, signed-in free tier limits
  readfast text notes.txt --tier free -o notes.html

  # Convert files through a conversion service
  readfast convert a.pdf b.epub --endpoint https://api.readfast.app \
      --token $READFAST_TOKEN --tier pro -o converted/

TIERS AND LIMITS (defaults):
  Condition        Text cap    File cap   Files/batch
  ─────────────    ─────────   ────────   ───────────
  anonymous        5,000       disabled   1
  free             50,000      10 MB      1
  pro              50,000      50 MB      unlimited
  ultimate         unlimited   100 MB     unlimited

ENVIRONMENT VARIABLES:
  READFAST_TOKEN   Bearer credential for the conversion endpoint
  RUST_LOG         Log filter (e.g. readfast=debug)
"#;

/// Fast-read text transformation and document conversion.
#[derive(Parser, Debug)]
#[command(
    name = "readfast",
    version,
    about = "Transform text to fast-read (bionic) markup and convert documents",
    after_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transform plain text into fast-read emphasis markup.
    Text {
        /// Input file; reads stdin when omitted.
        input: Option<PathBuf>,

        /// Write markup here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Subscription tier: free, pro, or ultimate.
        #[arg(long, default_value = "free")]
        tier: String,

        /// Apply the anonymous (signed-out) limits.
        #[arg(long)]
        anonymous: bool,
    },

    /// Convert documents through a conversion service, sequentially.
    Convert {
        /// Files to convert (PDF, EPUB, DOCX, TXT), in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Base URL of the conversion service.
        #[arg(long, env = "READFAST_ENDPOINT")]
        endpoint: String,

        /// Bearer credential for the service.
        #[arg(long, env = "READFAST_TOKEN")]
        token: Option<String>,

        /// Directory the converted files are written to.
        #[arg(short, long, default_value = "converted")]
        output: PathBuf,

        /// Subscription tier: free, pro, or ultimate.
        #[arg(long, default_value = "free")]
        tier: String,

        /// Per-file request timeout in seconds.
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },
}

fn parse_tier(name: &str) -> Result<Tier> {
    Tier::from_store_name(name)
        .with_context(|| format!("unknown tier '{name}' (expected free, pro, or ultimate)"))
}

async fn run_text(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    tier: String,
    anonymous: bool,
) -> Result<()> {
    let text = match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let session = if anonymous {
        SessionState::anonymous()
    } else {
        SessionState::signed_in(parse_tier(&tier)?)
    };
    let limits = session.limits(&LimitTable::default());

    let mut editor = TextEditor::new(limits);
    editor.apply_edit(&text)?;

    match output {
        Some(path) => {
            std::fs::write(&path, editor.rendered())
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} {} characters transformed → {}",
                green("✔"),
                text.chars().count(),
                path.display()
            );
        }
        None => println!("{}", editor.rendered()),
    }

    // Belt and braces: the transform must round-trip.
    debug_assert_eq!(bionic::strip_emphasis(editor.rendered()), text);
    Ok(())
}

async fn run_convert(
    files: Vec<PathBuf>,
    endpoint_url: String,
    token: Option<String>,
    output: PathBuf,
    tier: String,
    timeout: u64,
) -> Result<()> {
    let mut sources = Vec::with_capacity(files.len());
    for path in &files {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("no filename in {}", path.display()))?;
        sources.push(SourceFile::new(name, bytes));
    }

    let mut endpoint = HttpConversionEndpoint::new(endpoint_url.trim_end_matches('/'))
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if let Some(token) = token {
        endpoint = endpoint.with_bearer(token);
    }

    let session = SessionState::signed_in(parse_tier(&tier)?);
    let callback = CliProgressCallback::new();
    let config = WorkflowConfig::for_session(session, &LimitTable::default())
        .api_timeout_secs(timeout)
        .progress_callback(Arc::clone(&callback) as ProgressCallback)
        .build()?;

    let workflow = ConversionWorkflow::new(Arc::new(endpoint), config);
    let result = workflow.run_batch_to_dir(sources, &output).await;

    match result {
        Ok(batch) => {
            if let Some(summary) = batch.error_summary() {
                eprintln!("{}", red("Some files failed:"));
                eprintln!("{summary}");
            }
            eprintln!(
                "{} delivered to {}",
                dim(&format!(
                    "{} files, {} bytes",
                    batch.stats.succeeded, batch.stats.bytes_out
                )),
                output.display()
            );
            Ok(())
        }
        Err(e) => bail!("{e}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Text {
            input,
            output,
            tier,
            anonymous,
        } => run_text(input, output, tier, anonymous).await,
        Command::Convert {
            files,
            endpoint,
            token,
            output,
            tier,
            timeout,
        } => run_convert(files, endpoint, token, output, tier, timeout).await,
    }
}
