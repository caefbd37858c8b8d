//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful shutdown. If a handler cannot be
//! installed the failure is logged and that signal is simply never observed.

use std::fmt;

/// A termination request from the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => f.write_str("SIGINT"),
            Signal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Resolve when the first SIGINT or SIGTERM arrives.
pub async fn termination() -> Signal {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Signal::Interrupt,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGINT handler");
                std::future::pending().await
            }
        }
    };

    tokio::select! {
        signal = interrupt => signal,
        signal = terminate() => signal,
    }
}

#[cfg(unix)]
async fn terminate() -> Signal {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
            Signal::Terminate
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() -> Signal {
    std::future::pending().await
}
