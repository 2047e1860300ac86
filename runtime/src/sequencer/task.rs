use std::{
    sync::Arc,
    time::Duration,
};

use message::Instruction;
use net::DatagramSender;
use tokio::{
    task::JoinHandle,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use super::{
    Sequencer,
    SequencerHooks,
    SequencerQueue,
    Step,
};
use crate::{
    config::SequencerConfig,
    error::StopError,
    SensorId,
};

/// A running sequencer task for one sensor.
pub struct SequencerHandle {
    queue:        SequencerQueue,
    cancel:       CancellationToken,
    join:         JoinHandle<()>,
    stop_timeout: Duration,
    max_retries:  u32,
}

impl SequencerHandle {
    pub fn spawn(
        sensor: SensorId,
        queue: SequencerQueue,
        writer: Arc<dyn DatagramSender>,
        hooks: Box<dyn SequencerHooks>,
        config: &SequencerConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let sequencer = Sequencer::new(queue.clone(), config.resend_cooldown());

        let join = tokio::spawn(run(
            sequencer,
            sensor,
            writer,
            hooks,
            config.idle_cooldown(),
            cancel.clone(),
        ));

        Self {
            queue,
            cancel,
            join,
            stop_timeout: config.stop_timeout(),
            max_retries: config.max_retries,
        }
    }

    #[inline]
    pub fn queue(&self) -> &SequencerQueue {
        &self.queue
    }

    /// Queues `request` with the configured retry limit.
    #[inline]
    pub fn enqueue(&self, request: Instruction) -> Result<(), message::Error> {
        self.queue.enqueue(request, self.max_retries)
    }

    /// Signals the task and waits for it to finish its current step.
    pub async fn stop(self) -> Result<(), StopError> {
        self.cancel.cancel();

        let abort = self.join.abort_handle();

        match tokio::time::timeout(self.stop_timeout, self.join).await {
            Ok(result) => Ok(result?),
            Err(_elapsed) => {
                abort.abort();
                Err(StopError::Timeout(self.stop_timeout))
            },
        }
    }
}

#[tracing::instrument(skip_all, fields(%sensor))]
async fn run(
    mut sequencer: Sequencer,
    sensor: SensorId,
    writer: Arc<dyn DatagramSender>,
    mut hooks: Box<dyn SequencerHooks>,
    idle_cooldown: Duration,
    cancel: CancellationToken,
) {
    tracing::debug!("sequencer started");

    while !cancel.is_cancelled() {
        let now = Instant::now();

        let wake_at = match sequencer.drive(now, hooks.as_mut()) {
            Step::Continue => continue,
            Step::Transmit {
                sequence_no,
                retry_no,
                datagram,
            } => {
                match writer.send_to(&datagram, sensor.address).await {
                    Ok(_) => {
                        tracing::debug!(sequence_no, retry_no, len = datagram.len(), "instruction sent");
                        hooks.on_after_send(sequence_no, retry_no);
                    },
                    Err(e) => {
                        tracing::error!(error = %e, sequence_no, retry_no, "failed to send instruction");
                    },
                }

                continue;
            },
            Step::Idle => now + idle_cooldown,
            Step::WaitUntil(deadline) => deadline,
        };

        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = sequencer.queue().notified() => {},
            _ = tokio::time::sleep_until(wake_at) => {},
        }
    }

    tracing::debug!("sequencer stopped");
}

#[cfg(test)]
mod test {
    use std::{
        net::SocketAddr,
        sync::Mutex,
    };

    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;
    use crate::sequencer::{
        test::{
            request,
            response_to,
        },
        SendQueueItem,
    };

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<String>>>);

    impl SequencerHooks for Shared {
        fn on_response(&mut self, item: &SendQueueItem) {
            self.0.lock().unwrap().push(format!("response {}", item.sequence_no()));
        }

        fn on_resend(&mut self, item: &SendQueueItem) {
            self.0.lock().unwrap().push(format!("resend {}", item.sequence_no()));
        }

        fn on_after_send(&mut self, sequence_no: u32, retry_no: u32) {
            self.0.lock().unwrap().push(format!("sent {sequence_no}/{retry_no}"));
        }

        fn on_drop_instruction(&mut self, item: &SendQueueItem) -> bool {
            self.0
                .lock()
                .unwrap()
                .push(format!("drop {} after {}/{}", item.sequence_no(), item.retry_no, item.max_retries));

            true
        }
    }

    fn config() -> SequencerConfig {
        SequencerConfig {
            idle_cooldown_ms:   1_000,
            resend_cooldown_ms: 60_000,
            stop_timeout_ms:    3_000,
            max_retries:        3,
        }
    }

    type Sent = mpsc::UnboundedReceiver<(Bytes, SocketAddr)>;

    fn spawn_with<H>(hooks: H, config: &SequencerConfig) -> (SequencerHandle, Sent, SensorId)
    where
        H: SequencerHooks + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let sensor = SensorId::new(0, "192.168.11.11:55555".parse().unwrap());

        let handle = SequencerHandle::spawn(sensor, SequencerQueue::default(), Arc::new(tx), Box::new(hooks), config);

        (handle, rx, sensor)
    }

    fn spawn(hooks: Shared) -> (SequencerHandle, Sent, SensorId) {
        spawn_with(hooks, &config())
    }

    #[tokio::test(start_paused = true)]
    async fn request_response_exchange() {
        let hooks = Shared::default();
        let (handle, mut rx, sensor) = spawn(hooks.clone());

        let now = Instant::now();
        handle.queue().enqueue_send(SendQueueItem::new(request(7), 3, now)).unwrap();
        handle.queue().enqueue_send(SendQueueItem::new(request(8), 3, now)).unwrap();

        let (datagram, target) = rx.recv().await.unwrap();
        assert_eq!(target, sensor.address);

        let sent = Instruction::decode(&datagram).unwrap();
        assert_eq!(sent.sequence_no, 1);
        assert_eq!(sent.details[0].parameter_id, 7);

        handle.queue().enqueue_receive(response_to(1));

        let (datagram, _) = rx.recv().await.unwrap();
        assert_eq!(Instruction::decode(&datagram).unwrap().sequence_no, 2);

        handle.stop().await.unwrap();

        let log = hooks.0.lock().unwrap().clone();
        assert_eq!(log, vec!["sent 1/1", "response 1", "sent 2/1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn resends_after_cooldown() {
        let hooks = Shared::default();
        let (handle, mut rx, _) = spawn(hooks.clone());

        handle.queue().enqueue_send(SendQueueItem::new(request(1), 3, Instant::now())).unwrap();

        let (first, _) = rx.recv().await.unwrap();
        let started = Instant::now();

        let (second, _) = rx.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(first, second);

        handle.stop().await.unwrap();
        assert!(hooks.0.lock().unwrap().contains(&"resend 1".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn enqueue_applies_configured_retries() {
        let hooks = Shared::default();
        let (handle, mut rx, _) = spawn_with(hooks.clone(), &SequencerConfig::default());

        handle.enqueue(request(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(10 * 60)).await;

        let mut sent = 0;
        while rx.try_recv().is_ok() {
            sent += 1;
        }

        assert_eq!(sent, 4);
        assert_eq!(handle.queue().send_len(), 0);

        handle.stop().await.unwrap();

        let log = hooks.0.lock().unwrap().clone();
        assert_eq!(log.last().map(String::as_str), Some("drop 1 after 4/3"));
    }

    // Skips the idle cooldown for the first `skips` idle callbacks.
    struct Eager {
        skips: usize,
        idles: Arc<Mutex<usize>>,
    }

    impl SequencerHooks for Eager {
        fn on_idle(&mut self, _queue: &SequencerQueue) -> bool {
            let mut idles = self.idles.lock().unwrap();
            *idles += 1;
            *idles <= self.skips
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_hook_skips_cooldown() {
        let idles = Arc::new(Mutex::new(0));
        let (handle, _rx, _) = spawn_with(
            Eager {
                skips: 3,
                idles: idles.clone(),
            },
            &config(),
        );

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(*idles.lock().unwrap(), 4);

        tokio::time::sleep(config().idle_cooldown()).await;
        assert_eq!(*idles.lock().unwrap(), 5);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_while_idle() {
        let (handle, _rx, _) = spawn(Shared::default());

        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.stop().await.unwrap();
    }

    // A send that never completes makes the task unresponsive to cancellation.
    struct Stuck;

    #[async_trait::async_trait]
    impl DatagramSender for Stuck {
        async fn send_to(&self, _packet: &[u8], _target: SocketAddr) -> std::io::Result<usize> {
            futures::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_times_out() {
        let sensor = SensorId::new(0, "192.168.11.11:55555".parse().unwrap());
        let queue = SequencerQueue::default();
        queue.enqueue_send(SendQueueItem::new(request(1), 3, Instant::now())).unwrap();

        let handle = SequencerHandle::spawn(sensor, queue, Arc::new(Stuck), Box::new(()), &config());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(handle.stop().await, Err(StopError::Timeout(_))));
    }
}
