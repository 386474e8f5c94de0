/**
 * convergedoc Server Entry Point
 *
 * This is the main entry point for the collaborative editing server.
 * It loads configuration, opens the document store and serves the Axum
 * application until Ctrl-C.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use convergedoc::backend::server::{create_app, load_store, ServerConfig};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!("[STARTUP] Server initialization started");

    let config = ServerConfig::from_env()?;
    let port = config.port;
    let store = load_store(&config).await;

    // Create the Axum app
    let app = create_app(config, store);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[STARTUP] Listening on {}", addr);
    tracing::info!("[STARTUP] Clients should connect to ws://127.0.0.1:{}/ws", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(feature = "ssr")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, closing server");
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin convergedoc-server --features ssr");
    std::process::exit(1);
}
