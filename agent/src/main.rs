mod executor;

use clap::{Parser, ValueEnum};
use executor::EchoExecutor;
use parley_contract::{AgentExecutor, ThreadStateStore};
use parley_orchestrator::Orchestrator;
use parley_server::http::router;
use parley_server::AppState;
use parley_store_adapters::{FileStore, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreKind {
    /// One JSON document per thread under the storage dir.
    File,
    /// In-memory only; state is lost on restart.
    Memory,
}

#[derive(Debug, Parser)]
struct Args {
    #[arg(long, env = "PARLEY_HTTP_ADDR", default_value = "127.0.0.1:38080")]
    http_addr: String,

    #[arg(long, env = "PARLEY_STORE", value_enum, default_value = "file")]
    store: StoreKind,

    #[arg(long, env = "PARLEY_STORAGE_DIR", default_value = "./threads")]
    storage_dir: PathBuf,

    /// Pause between reply fragments of the built-in echo executor.
    #[arg(long, env = "PARLEY_REPLY_DELAY_MS", default_value_t = 40)]
    reply_delay_ms: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store: Arc<dyn ThreadStateStore> = match args.store {
        StoreKind::File => Arc::new(FileStore::new(args.storage_dir)),
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    let executor: Arc<dyn AgentExecutor> = Arc::new(EchoExecutor::new(Duration::from_millis(
        args.reply_delay_ms,
    )));
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), executor));

    let app = router(AppState {
        orchestrator,
        store,
    });

    let listener = tokio::net::TcpListener::bind(&args.http_addr)
        .await
        .expect("failed to bind server listener");
    tracing::info!(
        addr = %listener.local_addr().expect("listener has no local addr"),
        "parley agent listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("server crashed");
}
