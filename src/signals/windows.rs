use std::io;

pub async fn terminate() -> io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::debug!("received ctrl-c");

    Ok(())
}
