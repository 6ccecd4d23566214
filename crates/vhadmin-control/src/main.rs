use vhadmin_control::{config::Config, gateway, public_ip, state::AppState};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load()?;
    let public_ip = public_ip::resolve(&config).await?;
    let addr = config.listen;
    tracing::info!(
        servers = config.servers.len(),
        toolchain_dir = %config.toolchain_dir.display(),
        api_path = %config.api_path,
        %public_ip,
        "configuration loaded"
    );

    let app = gateway::router(AppState::new(config, public_ip));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "vhadmin-control HTTP listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
