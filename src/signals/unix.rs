use std::io;

use tokio::signal::unix::{
    signal,
    SignalKind,
};

/// Resolves on the first SIGINT or SIGTERM.
pub async fn terminate() -> io::Result<()> {
    let mut ints = signal(SignalKind::interrupt())?;
    let mut terms = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = ints.recv() => tracing::debug!("received SIGINT"),
        _ = terms.recv() => tracing::debug!("received SIGTERM"),
    }

    Ok(())
}
