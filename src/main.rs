//! widget-relay CLI
//!
//! - `replay <script>`: feed a JSON-lines session script through the event
//!   loop and print every outbound message as a JSON line
//! - `config`: print the default configuration

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use widget_relay::sync::ChannelSink;
use widget_relay::{generate_default_config, App, AppEvent, Config, ConfigSource, LoggingConfig};

#[derive(Parser)]
#[command(name = "widget-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Widget state and custom component relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a session script
    ///
    /// Each line is one event: {"forward": ForwardMsg}, {"frame": {"guest": N,
    /// "data": ...}}, {"interact": {"id": "...", "value": {...}}} or
    /// {"resize": {"width": N}}. Blank lines and lines starting with '#' are
    /// skipped.
    Replay {
        /// Path to the script
        script: PathBuf,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// One thread keeps the interleaving of the event loop and the printer the
// same from run to run.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    tokio::fs::write(&path, content)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }

        Commands::Replay { script } => {
            let (config, source) = match &cli.config {
                Some(path) => (
                    Config::load_with_env(path)?,
                    ConfigSource::File {
                        path: path.clone(),
                        skipped: Vec::new(),
                    },
                ),
                None => Config::load_default(),
            };
            init_logging(&config.logging);
            source.log();
            replay(&config, &script).await?;
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("widget_relay={}", logging.level).into());

    let json = logging.format == "json";
    let pretty_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty_layer)
        .with(json_layer)
        .init();
}

async fn replay(config: &Config, script: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(script)
        .await
        .with_context(|| format!("Failed to read {}", script.display()))?;

    let (back_tx, mut back_rx) = mpsc::unbounded_channel();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let app = App::new(config, ChannelSink::new(back_tx), frame_tx);
    let session = tokio::spawn(app.run(event_rx, async {
        let _ = tokio::signal::ctrl_c().await;
    }));

    let printer = tokio::spawn(async move {
        drain_outbound(back_rx, frame_rx, &mut std::io::stdout()).await
    });

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: AppEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid event", script.display(), number + 1))?;
        event_tx.send(event).context("Event loop stopped early")?;
    }
    drop(event_tx);

    let summary = session.await.context("Event loop panicked")?;
    printer.await.context("Printer panicked")??;
    write_line(&mut std::io::stdout().lock(), "summary", &summary)?;

    tracing::info!(
        session_id = %summary.session_id,
        deltas = summary.usage.deltas_applied,
        "Replay complete"
    );
    Ok(())
}

/// Write outbound messages until both channels close. Pending rerun requests
/// are written before pending frame messages.
async fn drain_outbound<B: Serialize, F: Serialize>(
    mut back_rx: mpsc::UnboundedReceiver<B>,
    mut frame_rx: mpsc::UnboundedReceiver<F>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            biased;
            Some(msg) = back_rx.recv() => write_line(out, "back", &msg)?,
            Some(msg) = frame_rx.recv() => write_line(out, "frame", &msg)?,
            else => break,
        }
    }
    Ok(())
}

fn write_line<T: Serialize>(out: &mut impl Write, kind: &str, value: &T) -> anyhow::Result<()> {
    let mut line = serde_json::Map::new();
    line.insert(kind.to_string(), serde_json::to_value(value)?);
    writeln!(out, "{}", serde_json::Value::Object(line))?;
    Ok(())
}
