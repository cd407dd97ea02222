use anyhow::{Context, Result};
use clap::Parser;
use songdeck_web::{routes, AppState, ServiceConfig};

/// Periodically delete expired uploads and outputs.
async fn cleanup_loop(state: AppState) {
    let mut interval = tokio::time::interval(state.config.cleanup_interval());
    loop {
        interval.tick().await;
        state.cleanup().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    config.prepare_dirs().with_context(|| {
        format!(
            "Failed to create {} or {}",
            config.upload_dir.display(),
            config.generated_dir.display()
        )
    })?;

    let listen_addr = config.listen_addr();
    let state = AppState::new(config);
    tokio::spawn(cleanup_loop(state.clone()));

    let (addr, server) = warp::serve(routes(state))
        .try_bind_ephemeral(listen_addr)
        .with_context(|| format!("Failed to bind {}", listen_addr))?;

    log::info!("Song deck web service listening on http://{}", addr);
    server.await;
    Ok(())
}
