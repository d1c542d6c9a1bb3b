//! Y-Traction - focus/rest timer service
//!
//! This is the main entry point: it starts the background supervisor, then
//! serves the HTTP API through which a UI surface drives the foreground timer.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use ytraction::{
    api::create_router,
    bridge,
    clock::SystemClock,
    config::Config,
    services::{check_notify_send_available, BroadcastAlerts, DesktopNotifier, LogNotifier, Notifier},
    state::{foreground::Collaborators, AppState},
    store::{FileStore, Store},
    tasks::{background_supervisor_task, Supervisor},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("ytraction={},tower_http=info", config.log_level()))
        .init();

    info!("Starting ytraction v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, poll={}s",
        config.host,
        config.port,
        config.poll_interval().as_secs()
    );

    let notifier: Arc<dyn Notifier> = if config.desktop_notifications {
        match check_notify_send_available().await {
            Ok(()) => Arc::new(DesktopNotifier),
            Err(e) => {
                warn!("{}", e);
                Arc::new(LogNotifier)
            }
        }
    } else {
        Arc::new(LogNotifier)
    };

    let file_store = FileStore::open(&config.data_file).await;
    info!("Store file: {}", file_store.path().display());
    let store: Arc<dyn Store> = Arc::new(file_store);
    let alerts = Arc::new(BroadcastAlerts::default());
    let (bridge_tx, bridge_rx) = bridge::channel(64);

    // Background supervisor: shares only the store and the bridge with the foreground
    let mut supervisor = Supervisor::new(
        Arc::clone(&store),
        Arc::clone(&notifier),
        alerts.clone(),
        Arc::new(SystemClock),
        config.poll_interval(),
    );
    if config.install {
        supervisor.on_install().await;
    }
    tokio::spawn(background_supervisor_task(supervisor, bridge_rx));

    let deps = Collaborators {
        store,
        bridge: bridge_tx,
        notifier,
        clock: Arc::new(SystemClock),
    };
    let state = Arc::new(AppState::new(deps, alerts, config.port, config.host.clone()));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /surface/open    - Attach the UI surface");
    info!("  POST /surface/close   - Detach the UI surface");
    info!("  GET  /timer           - Current timer");
    info!("  POST /timer/start     - Start or resume");
    info!("  POST /timer/pause     - Pause");
    info!("  POST /timer/reset     - Reset");
    info!("  GET|PUT /settings     - Timer settings");
    info!("  GET|POST /blocklist   - Blocked websites");
    info!("  GET  /alerts          - Alert overlay stream");
    info!("  GET  /status          - Service status");
    info!("  GET  /health          - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.close_surface();
    info!("Server shutdown complete");
    Ok(())
}
