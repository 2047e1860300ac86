use std::{
    net::{
        SocketAddr,
        SocketAddrV4,
    },
    sync::Arc,
};

use message::ClientKeepAlive;
use net::DatagramSender;
use tokio::{
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::KeepAliveConfig,
    error::StopError,
};

/// Periodically announces this client to sensors listening on the multicast group.
pub struct KeepAliveHandle {
    cancel: CancellationToken,
    join:   JoinHandle<()>,
}

impl KeepAliveHandle {
    /// `callback` is where sensors should send their data.
    pub fn spawn(
        writer: Arc<dyn DatagramSender>,
        config: &KeepAliveConfig,
        callback: SocketAddrV4,
    ) -> Result<Self, message::Error> {
        let packet = ClientKeepAlive::new(config.client_id, callback).encode()?;
        let target = SocketAddr::V4(config.multicast);
        let period = config.period();

        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(%target, %callback, ?period, "sending keep-alives");

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,
                    _ = interval.tick() => {},
                }

                if let Err(e) = writer.send_to(&packet, target).await {
                    tracing::warn!(error = %e, %target, "failed to send keep-alive");
                }
            }
        });

        Ok(Self { cancel, join })
    }

    pub async fn stop(self) -> Result<(), StopError> {
        self.cancel.cancel();
        Ok(self.join.await?)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn announces_every_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = KeepAliveConfig::default();
        let callback = "192.168.1.10:55555".parse().unwrap();

        let handle = KeepAliveHandle::spawn(Arc::new(tx), &config, callback).unwrap();

        let (first, target) = rx.recv().await.unwrap();
        let started = tokio::time::Instant::now();
        let (second, _) = rx.recv().await.unwrap();

        assert_eq!(target, SocketAddr::V4(config.multicast));
        assert_eq!(first, second);
        assert!(started.elapsed() >= Duration::from_secs(1));

        let decoded = ClientKeepAlive::decode(&first).unwrap();
        assert_eq!(decoded.client_id, config.client_id);
        assert_eq!(decoded.target, callback);

        handle.stop().await.unwrap();
    }
}
