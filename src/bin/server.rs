use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uploadflow::api::create_api_server;
use uploadflow::config::ServerConfig;
use uploadflow::coordinator::UploadCoordinator;
use uploadflow::metrics::{start_metrics_server, MetricsConfig};
use uploadflow::random::ThreadRandom;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,uploadflow=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("\n╔══════════════════════════════════════════════════════════════════╗");
    println!("║                 UploadFlow - Upload Queue Server                 ║");
    println!("╚══════════════════════════════════════════════════════════════════╝\n");

    let config = ServerConfig::init().context("Failed to load configuration")?;
    let upload_config = config.upload_config();
    info!(
        fast_mode = config.fast_mode(),
        seed_fixtures = config.seed_fixtures(),
        "Configuration loaded"
    );

    let metrics_config = match config.metrics_addr() {
        Some(addr) => MetricsConfig::with_addr(addr),
        None => MetricsConfig::default(),
    };
    start_metrics_server(metrics_config)
        .await
        .context("Failed to start metrics exporter")?;

    let coordinator =
        UploadCoordinator::from_config(&upload_config, Arc::new(ThreadRandom), config.seed_fixtures())
            .context("Failed to create upload coordinator")?;
    let app = create_api_server(coordinator);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📍 Server Address:  http://{addr}");
    println!("🏥 Health Check:    http://{addr}/health");
    println!("📡 REST API:        http://{addr}/api/v1/files");
    println!("🔌 WebSocket:       ws://{addr}/ws");
    println!("📈 Metrics:         http://{addr}/metrics");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("\n📚 API Endpoints:");
    println!("   GET    /api/v1/files                  - List files");
    println!("   POST   /api/v1/files                  - Add files (validated, uploads start)");
    println!("   GET    /api/v1/files/:id              - Get file");
    println!("   DELETE /api/v1/files/:id              - Remove file");
    println!("   POST   /api/v1/files/:id/upload       - Start upload");
    println!("   POST   /api/v1/files/:id/pause        - Pause upload");
    println!("   POST   /api/v1/files/:id/resume       - Resume upload");
    println!("   POST   /api/v1/files/:id/cancel       - Cancel upload");
    println!("   POST   /api/v1/files/start-all        - Start all pending uploads");
    println!("   POST   /api/v1/files/clear-completed  - Remove completed files");
    println!("   GET    /api/v1/stats                  - Queue statistics");
    println!("   GET    /api/v1/sessions               - List sessions");
    println!("   GET    /api/v1/sessions/current       - Current session");
    println!("   GET    /api/v1/sessions/:id/stats     - Session statistics");
    println!("\n🛑 Press Ctrl+C to stop the server\n");

    info!(%addr, "Server listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
