use clap::Parser;
use platemark::db::schema::ensure_schema;
use platemark::places::{GooglePlacesClient, PlacesApi};
use platemark::server::config::ServerConfig;
use platemark::server::tasks::{PlacesCacheJanitor, SearchSessionSweeper};
use platemark::services::auth_service::{AuthClient, CodeExchanger};
use platemark::version::VERSION;
use platemark::web::{build_app_state, create_router};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) -> WorkerGuard {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "server.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false) // No ANSI colors in file
        .json(); // Log as JSON

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info,sea_orm=warn` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // --- Server Config Setup ---
    let server_config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    let _log_guard = init_logging(&server_config.log_dir);
    info!("Starting server, version: {}", VERSION);

    // --- Database Pool Setup ---
    let mut opt = ConnectOptions::new(server_config.database_url.clone());
    opt.max_connections(10).sqlx_logging(false);
    let db_pool: DatabaseConnection = Database::connect(opt).await?;
    ensure_schema(&db_pool).await?;

    // --- Places Cache Cleanup ---
    let janitor = Arc::new(PlacesCacheJanitor::new(db_pool.clone()));
    let janitor_handle = tokio::spawn({
        let janitor = janitor.clone();
        let interval = Duration::from_secs(server_config.cache_cleanup_interval_secs.max(1));
        async move {
            janitor.run_periodic_tasks(interval).await;
        }
    });

    // --- Upstream Clients ---
    if server_config.places_api_key.is_none() {
        warn!("GOOGLE_MAPS_API_KEY is not set; place lookups will fail.");
    }
    let places_api: Arc<dyn PlacesApi> = Arc::new(GooglePlacesClient::new(
        server_config.places_api_key.clone(),
        server_config.places_api_base_url.clone(),
    ));
    let auth_client: Option<Arc<dyn CodeExchanger>> = match server_config.auth_exchange() {
        Some((token_url, api_key)) => {
            let client: Arc<dyn CodeExchanger> =
                Arc::new(AuthClient::new(token_url.to_string(), api_key.to_string()));
            Some(client)
        }
        None => {
            warn!("Auth token endpoint is not configured; login callbacks will fail.");
            None
        }
    };

    let app_state = build_app_state(db_pool.clone(), places_api, auth_client, server_config.clone());

    // --- Search Session Sweep ---
    let max_idle = Duration::from_secs(server_config.search_session_idle_secs.max(1));
    let sweeper = Arc::new(SearchSessionSweeper::new(
        app_state.search_sessions.clone(),
        max_idle,
    ));
    let sweep_interval = (max_idle / 4).max(Duration::from_secs(1));
    let sweeper_handle = tokio::spawn(sweeper.run_periodic_tasks(sweep_interval));

    // --- HTTP Server ---
    let app = create_router(app_state);
    let listener = tokio::net::TcpListener::bind(&server_config.listen_addr).await?;
    info!("HTTP server listening on {}", server_config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    janitor_handle.abort();
    sweeper_handle.abort();
    db_pool.close().await?;
    info!("Server stopped.");
    Ok(())
}
