//! Starkscope service binary.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use starkscope_db::{DbPool, TransactionStore};
use starkscope_ingestion::{BlockIngestor, ChainClient, Poller, PollerConfig, RpcClient, Shutdown};
use starkscope_telemetry::{init_logging, Metrics};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "starkscope")]
#[command(about = "Starknet transaction indexer and explorer backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion pipeline with the query and metrics servers
    Run {
        /// Starknet JSON-RPC endpoint URL
        #[arg(long, default_value = "https://starknet-mainnet.public.blastapi.io/rpc/v0_7")]
        rpc_url: String,

        /// Database path
        #[arg(long, default_value = "starkscope.db")]
        database_path: String,

        /// Poll period in seconds
        #[arg(long, default_value = "30")]
        poll_interval_seconds: u64,

        /// Trailing window size in blocks
        #[arg(long, default_value = "10")]
        window_size: u64,

        /// Query API bind address
        #[arg(long, default_value = "0.0.0.0:8000")]
        api_bind_address: String,

        /// Metrics bind address
        #[arg(long, default_value = "0.0.0.0:9090")]
        metrics_bind_address: String,

        /// Log level
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Apply database migrations and exit
    Migrate {
        /// Database path
        #[arg(long, default_value = "starkscope.db")]
        database_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            rpc_url,
            database_path,
            poll_interval_seconds,
            window_size,
            api_bind_address,
            metrics_bind_address,
            log_level,
        } => {
            init_logging(log_level.as_deref())?;
            run_service(
                &rpc_url,
                &database_path,
                poll_interval_seconds,
                window_size,
                &api_bind_address,
                &metrics_bind_address,
            )
            .await?;
        }
        Commands::Migrate { database_path } => {
            init_logging(None)?;
            let db = DbPool::new(&database_path).await?;
            db.migrate().await?;
        }
    }

    Ok(())
}

async fn run_service(
    rpc_url: &str,
    db_path: &str,
    poll_interval: u64,
    window_size: u64,
    api_addr: &str,
    metrics_addr: &str,
) -> anyhow::Result<()> {
    info!("Starting Starkscope ingestion service");

    // Failing to open the store is the one fatal startup error; everything
    // after this point is retried or isolated inside the pipeline.
    let db = DbPool::new(db_path).await?;
    db.migrate().await?;

    let metrics = Metrics::new()?;
    let store = TransactionStore::new(db);
    let client: Arc<dyn ChainClient> = Arc::new(RpcClient::new(rpc_url, metrics.clone()));
    let ingestor = BlockIngestor::new(client.clone(), store.clone(), metrics.clone());
    let config = PollerConfig {
        period: Duration::from_secs(poll_interval.max(1)),
        window: window_size,
    };
    let poller = Poller::new(client, ingestor, config, metrics.clone());

    start_metrics_server(metrics_addr, metrics).await?;
    start_api_server(api_addr, store).await?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received ctrl-c, shutting down");
            trigger.signal();
        }
    });

    poller.run(&shutdown).await;
    Ok(())
}

async fn start_api_server(addr: &str, store: TransactionStore) -> anyhow::Result<()> {
    let app = starkscope_api::router(store);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Query API listening on http://{}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Query API server error: {}", e);
        }
    });

    Ok(())
}

async fn start_metrics_server(addr: &str, metrics: Metrics) -> anyhow::Result<()> {
    use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};

    async fn metrics_handler(
        State(metrics): State<Arc<Metrics>>,
    ) -> Result<impl IntoResponse, StatusCode> {
        match metrics.gather() {
            Ok(body) => Ok((StatusCode::OK, body)),
            Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(metrics));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics server listening on http://{}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}
