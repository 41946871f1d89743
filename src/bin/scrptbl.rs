//! CLI binary for scrptbl.
//!
//! A thin shim over the library crate: `serve` maps flags to `ProxyConfig`
//! and runs the relay, `convert` and `health` talk to a running relay.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scrptbl::{
    server, ConversionResult, HttpTransport, PageTheme, ProxyConfig, SelectedImage, UploadPage,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the upload page and relay on 127.0.0.1:3000
  N8N_WEBHOOK_URL=https://n8n.example.com/webhook/convert scrptbl serve

  # Listen on all interfaces, 30s webhook timeout, one retry
  scrptbl serve --bind 0.0.0.0:8080 --timeout 30 --retries 1

  # Convert an image through a running relay
  scrptbl convert note.jpg --server http://localhost:3000

  # ...and save the text as converted-text-YYYY-MM-DD.txt
  scrptbl convert note.png --output-dir ./out

  # Check whether the relay has a webhook configured
  scrptbl health

ENVIRONMENT VARIABLES:
  N8N_WEBHOOK_URL            Webhook that performs the conversion
  SCRPTBL_BIND               Listen address (default 127.0.0.1:3000)
  SCRPTBL_UPSTREAM_TIMEOUT   Webhook timeout in seconds (default: none)
  SCRPTBL_MAX_RETRIES        Retries after a transport failure (0 or 1)
  SCRPTBL_MAX_UPLOAD_BYTES   Largest accepted upload (default 20 MiB)
  SCRPTBL_THEME              Page theme: sunset, mountains
  SCRPTBL_SERVER             Relay base URL for convert / health
  RUST_LOG                   Overrides the log filter
"#;

/// Handwriting-to-text upload page and webhook relay.
#[derive(Parser, Debug)]
#[command(
    name = "scrptbl",
    version,
    about = "Handwriting-to-text upload page and webhook relay",
    long_about = "Serves an upload page whose images are relayed, unchanged, to an external \
conversion webhook; the webhook's text answer is handed back to the browser as-is.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SCRPTBL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SCRPTBL_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the upload page and the convert route (default).
    Serve(ServeArgs),
    /// Convert one image through a running relay.
    Convert(ConvertArgs),
    /// Print the relay's introspection line.
    Health(ServerArg),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Webhook URL that performs the conversion.
    #[arg(long, env = "N8N_WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    /// Address to listen on.
    #[arg(long, env = "SCRPTBL_BIND", default_value = "127.0.0.1:3000")]
    bind: Option<SocketAddr>,

    /// Webhook timeout in seconds. Unset means no timeout.
    #[arg(long, env = "SCRPTBL_UPSTREAM_TIMEOUT")]
    timeout: Option<u64>,

    /// Retries after a webhook transport failure (0 or 1).
    #[arg(long, env = "SCRPTBL_MAX_RETRIES", default_value_t = 0,
          value_parser = clap::value_parser!(u32).range(0..=1))]
    retries: u32,

    /// Largest accepted upload in bytes.
    #[arg(long, env = "SCRPTBL_MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Page theme.
    #[arg(long, env = "SCRPTBL_THEME", value_enum, default_value = "sunset")]
    theme: ThemeArg,
}

#[derive(Args, Debug)]
struct ServerArg {
    /// Base URL of a running relay.
    #[arg(long, env = "SCRPTBL_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// PNG or JPEG image to convert.
    image: PathBuf,

    #[command(flatten)]
    server: ServerArg,

    /// Also save the text as converted-text-YYYY-MM-DD.txt in this directory.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the result as a JSON envelope instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum ThemeArg {
    #[default]
    Sunset,
    Mountains,
}

impl From<ThemeArg> for PageTheme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Sunset => PageTheme::Sunset,
            ThemeArg::Mountains => PageTheme::Mountains,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
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

    match cli.command {
        Some(Command::Serve(args)) => run_serve(args).await,
        Some(Command::Convert(args)) => run_convert(args, cli.quiet).await,
        Some(Command::Health(args)) => run_health(args).await,
        None => run_serve(ServeArgs::from_env()?).await,
    }
}

impl ServeArgs {
    /// `scrptbl` with no subcommand serves with flags taken from the
    /// environment only.
    fn from_env() -> Result<Self> {
        #[derive(Parser)]
        struct EnvOnly {
            #[command(flatten)]
            args: ServeArgs,
        }
        let parsed = EnvOnly::try_parse_from(["scrptbl"]).context("Invalid environment")?;
        Ok(parsed.args)
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args)?;
    tracing::debug!("{:?}", config);

    server::serve(&config, shutdown_signal())
        .await
        .context("Server failed")?;
    Ok(())
}

async fn run_convert(args: ConvertArgs, quiet: bool) -> Result<()> {
    let image = SelectedImage::from_path(&args.image)
        .await
        .with_context(|| format!("Failed to read {:?}", args.image))?;
    let transport = HttpTransport::new(&args.server.server).context("Invalid --server")?;

    let mut page = UploadPage::new(transport);
    if !page.select_file(image) {
        anyhow::bail!(
            "{:?} is not a PNG or JPEG image (only image/png and image/jpeg are accepted)",
            args.image
        );
    }

    let spinner = (!quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message("Converting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = page.submit().await.cloned();
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let result = result.context("Nothing was submitted")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(result.text().as_bytes())
            .context("Failed to write to stdout")?;
        if !result.text().ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    match (&result, args.output_dir) {
        (ConversionResult::Success { .. }, Some(dir)) => {
            if let Some(download) = page.download() {
                let path = download
                    .save_in(&dir)
                    .await
                    .with_context(|| format!("Failed to write into {dir:?}"))?;
                if !quiet {
                    eprintln!("{} saved {}", green("✔"), dim(&path.display().to_string()));
                }
            }
            Ok(())
        }
        (ConversionResult::Failure { .. }, _) => {
            if !quiet {
                eprintln!("{} conversion failed", red("✘"));
            }
            anyhow::bail!("conversion failed")
        }
        _ => Ok(()),
    }
}

async fn run_health(args: ServerArg) -> Result<()> {
    let transport = HttpTransport::new(&args.server).context("Invalid --server")?;
    let line = transport.health().await.context("Relay unreachable")?;
    println!("{line}");
    Ok(())
}

/// Map CLI args to `ProxyConfig`.
fn build_config(args: &ServeArgs) -> Result<ProxyConfig> {
    let mut builder = ProxyConfig::builder()
        .max_retries(args.retries)
        .max_upload_bytes(args.max_upload_bytes)
        .theme(args.theme.into());

    if let Some(url) = &args.webhook_url {
        builder = builder.webhook_url(url.clone());
    }
    if let Some(addr) = args.bind {
        builder = builder.bind_addr(addr);
    }
    if let Some(secs) = args.timeout {
        builder = builder.request_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down gracefully..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down gracefully..."),
    }
}
