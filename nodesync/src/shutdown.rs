//! Signal-driven shutdown

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Cancel `token` on the first Ctrl+C or, on unix, SIGTERM.
///
/// Handlers are installed before this returns, so a signal arriving right
/// after startup is not lost.
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<()> {
    #[cfg(unix)]
    let terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
    {
        Ok(signal) => Some(signal),
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
            None
        }
    };

    tokio::spawn(async move {
        #[cfg(unix)]
        let signal = wait_for_signal(terminate).await;
        #[cfg(not(unix))]
        let signal = ctrl_c().await;

        info!(signal, "Shutdown requested, finishing current tick");
        token.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_signal(terminate: Option<tokio::signal::unix::Signal>) -> &'static str {
    let Some(mut terminate) = terminate else {
        return ctrl_c().await;
    };

    tokio::select! {
        name = ctrl_c() => name,
        _ = terminate.recv() => "SIGTERM",
    }
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
