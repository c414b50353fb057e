//! CLI entry point for factgraph ingestion.

use std::sync::Arc;

use clap::{ArgGroup, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use factgraph_core::memory::{MemoryGraph, MemoryLog};
use factgraph_core::{AssertionPayload, GraphStore, LogStore, Tee, Vocabulary};
use factgraph_sql::{SqliteDatabase, SqliteLogStore, SqliteMirror};

use factgraph_ingest::config::{self, IngestConfig};
use factgraph_ingest::conversation::TurnPackager;
use factgraph_ingest::pipeline::Pipeline;
use factgraph_ingest::session::{open_graph, reset_session};
use factgraph_ingest::worker::IngestWorker;

#[derive(Parser)]
#[command(name = "factgraph-ingest")]
#[command(about = "Turn conversation text into graph facts")]
struct Cli {
    /// Config file prefix (default: factgraph).
    #[arg(short, long, default_value = "factgraph")]
    config: String,

    /// Keep the existing log and graph instead of resetting them.
    #[arg(long)]
    no_reset: bool,

    /// Use in-memory stores instead of SQLite and Neo4j.
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read conversation turns from stdin and ingest them in the background.
    Chat,

    /// Run one text through the pipeline and print the report.
    #[command(group(ArgGroup::new("source").required(true).args(["text", "key"])))]
    Once {
        /// Literal text to ingest.
        #[arg(long)]
        text: Option<String>,

        /// Name of a text in the `[ingest.texts]` table.
        #[arg(long)]
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let app = config::load(&cli.config)?;
    let vocab = Arc::new(Vocabulary::builtin()?);
    let reset = app.ingest.reset_on_start && !cli.no_reset;

    if cli.memory {
        tracing::info!("Using in-memory stores");
        return run(cli.command, app.ingest, vocab, MemoryGraph::new(), MemoryLog::new(), reset)
            .await;
    }

    let db = SqliteDatabase::open_path(&app.ingest.sqlite_path).await?;
    let mirror = SqliteMirror::new(db.clone()).await?;
    let log = SqliteLogStore::new(db);

    let graph = match &app.neo4j {
        Some(graph_config) => open_graph(graph_config).await,
        None => {
            tracing::info!("No [neo4j] section; graph facts go to SQLite only");
            None
        }
    };

    match graph {
        Some(graph) => {
            run(cli.command, app.ingest, vocab, Tee::new(graph, mirror), log, reset).await
        }
        None => run(cli.command, app.ingest, vocab, mirror, log, reset).await,
    }
}

async fn run<G, L>(
    command: Command,
    ingest: IngestConfig,
    vocab: Arc<Vocabulary>,
    graph: G,
    log: L,
    reset: bool,
) -> anyhow::Result<()>
where
    G: GraphStore + 'static,
    L: LogStore + 'static,
{
    if reset {
        reset_session(&graph, &log).await;
    } else {
        log.ensure_table().await?;
    }

    let pipeline = Pipeline::new(vocab, graph, log).with_texts(ingest.texts);

    match command {
        Command::Once { text, key } => {
            let payload = match (text, key) {
                (Some(text), _) => AssertionPayload::literal(text),
                (None, Some(key)) => AssertionPayload::keyed(key),
                (None, None) => anyhow::bail!("Specify --text or --key"),
            };
            let report = pipeline.process(&payload).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Chat => chat(pipeline, ingest.min_turns).await?,
    }

    Ok(())
}

/// Conversation loop. Ingestion runs behind the queue; its failures are
/// logged and never interrupt the conversation.
async fn chat<G, L>(pipeline: Pipeline<G, L>, min_turns: usize) -> anyhow::Result<()>
where
    G: GraphStore + 'static,
    L: LogStore + 'static,
{
    let worker = IngestWorker::start(pipeline);
    let mut packager = TurnPackager::new(min_turns);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        match packager.on_turn(line) {
            Some(payload) => {
                let id = payload.id;
                match worker.enqueue(payload) {
                    Ok(()) => println!("noted ({id})"),
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not queue payload");
                        println!("noted");
                    }
                }
            }
            None => println!("noted"),
        }
    }

    let stats = worker.shutdown(true).await;
    tracing::info!(
        turns = packager.turns_seen(),
        processed = stats.processed,
        failed = stats.failed,
        "Conversation ended"
    );
    Ok(())
}
