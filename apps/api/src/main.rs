use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use patient_cell::ReconciliationService;
use shared_config::AppConfig;
use shared_database::{
    AppContext, HttpWarehouse, PostgrestStore, RecordStore, VaccinationWarehouse,
};
use shared_utils::JobScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Klinik API server");

    // Load configuration and wire the external collaborators
    let config = AppConfig::from_env();
    let store: Arc<dyn RecordStore> = Arc::new(PostgrestStore::new(&config));
    let warehouse: Arc<dyn VaccinationWarehouse> = Arc::new(HttpWarehouse::new(&config));
    let ctx = Arc::new(AppContext::new(config.clone(), store, warehouse));

    // The reconciliation job runs on its own scheduler task, serialized
    // with itself; the HTTP layer can also trigger it on demand.
    let reconcile = Arc::new(ReconciliationService::new(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.warehouse),
        Duration::from_secs(config.reconcile_deadline_secs),
    ));
    let scheduler = JobScheduler::start(
        Duration::from_secs(config.reconcile_interval_hours * 3600),
        move || {
            let job = Arc::clone(&reconcile);
            async move {
                if let Err(e) = job.run().await {
                    error!("Scheduled reconciliation failed: {}", e);
                }
            }
        },
    );

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(Arc::clone(&ctx))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
