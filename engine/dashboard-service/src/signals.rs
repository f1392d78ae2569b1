//! Signal handling for graceful shutdown

use tracing::{error, info};

/// Resolves once Ctrl+C or (on Unix) SIGTERM is received
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Ctrl+C signal received");
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm() => {}
    }
}

#[cfg(unix)]
async fn sigterm() {
    use signal_hook::consts::SIGTERM;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    let flag = Arc::new(AtomicBool::new(false));
    if let Err(e) = signal_hook::flag::register(SIGTERM, flag.clone()) {
        error!("Failed to register SIGTERM handler: {}", e);
        std::future::pending::<()>().await;
    }

    while !flag.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    info!("SIGTERM signal received");
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await
}
