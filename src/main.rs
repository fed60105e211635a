mod db;
mod parser;
mod record;
mod settings;
mod sink;
mod watcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use parser::{PageSnapshot, ProfileKind};
use settings::Settings;
use sink::{HttpSink, Sink, StoreSink};
use watcher::{NavigationWatcher, PageEvent, ReportedPage};

#[derive(Parser)]
#[command(name = "profile_tap", about = "Profile extractor for social-network pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow page reports on stdin and extract on every profile navigation
    Watch {
        /// Write records to the local store instead of the collector
        #[arg(long)]
        store: bool,
    },
    /// Extract once from a saved page, as the scrape button would
    Extract {
        /// Address the page was saved from
        #[arg(short, long)]
        url: String,
        /// Saved HTML document
        #[arg(long)]
        html: PathBuf,
        /// Write the record to the local store instead of the collector
        #[arg(long)]
        store: bool,
    },
    /// Show stored record counts by type
    Stats,
}

/// One line on stdin: a page report from the browser bridge, or a press of
/// the scrape button.
#[derive(Deserialize)]
#[serde(untagged)]
enum BridgeMessage {
    Page { url: String, html: String },
    Manual { manual: bool },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(?settings, "settings loaded");

    match cli.command {
        Commands::Watch { store } => {
            let sink = build_sink(&settings, store)?;
            let page = Arc::new(ReportedPage::default());
            let watcher = NavigationWatcher::new(page.clone(), sink, settings.settle_delay());

            let (tx, rx) = mpsc::channel(64);
            let stdin = BufReader::new(tokio::io::stdin());
            let reader = tokio::spawn(read_bridge(stdin, page, tx));
            watcher.run(rx).await;
            reader.await??;
        }
        Commands::Extract { url, html, store } => {
            let Some(kind) = ProfileKind::classify(&url) else {
                bail!("{} is neither a person nor a company page", url);
            };
            let html = std::fs::read_to_string(&html)
                .with_context(|| format!("Failed to read {}", html.display()))?;
            let record = parser::process_page(kind, &PageSnapshot::new(url, html));
            println!("{}", serde_json::to_string_pretty(&record)?);

            let sink = build_sink(&settings, store)?;
            sink::dispatch(sink.as_ref(), &record).await;
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let counts = db::count_by_type(&conn)?;
            if counts.is_empty() {
                println!("No stored profiles in {}.", settings.db_path.display());
            }
            for (kind, n) in counts {
                println!("{:<10} {}", kind, n);
            }
        }
    }

    info!("done in {:.1}s", t0.elapsed().as_secs_f64());
    Ok(())
}

fn build_sink(settings: &Settings, store: bool) -> anyhow::Result<Arc<dyn Sink>> {
    if store {
        return Ok(Arc::new(StoreSink::open(&settings.db_path)?));
    }
    let http = HttpSink::new(settings.collector_url.clone(), settings.request_timeout())
        .context("Failed to build collector client")?;
    Ok(Arc::new(http))
}

/// Turn bridge lines into page reports and watcher events. Ends when the
/// input closes, which closes the event stream.
async fn read_bridge<R>(
    input: R,
    page: Arc<ReportedPage>,
    tx: mpsc::Sender<PageEvent>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<BridgeMessage>(&line) {
            Ok(BridgeMessage::Page { url, html }) => {
                page.report(PageSnapshot::new(url.clone(), html));
                PageEvent::Mutated { url }
            }
            Ok(BridgeMessage::Manual { manual: true }) => PageEvent::ManualTrigger,
            Ok(BridgeMessage::Manual { manual: false }) => continue,
            Err(e) => {
                warn!("unreadable bridge message: {}", e);
                continue;
            }
        };
        if tx.send(event).await.is_err() {
            break;
        }
    }
    Ok(())
}
