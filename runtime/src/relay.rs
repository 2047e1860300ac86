//! Wires sockets, channels and sequencers together for a set of sensors.

use std::{
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use codec::DatagramCodec;
use futures::StreamExt;
use message::PortIdentifier;
use net::{
    DatagramBind,
    DatagramSender,
};
use tokio::{
    net::UdpSocket,
    task::JoinHandle,
};
use tokio_util::{
    sync::CancellationToken,
    udp::UdpFramed,
};

use crate::{
    channel::ChannelHandle,
    config::RelayConfig,
    error::{
        RelayError,
        StopError,
    },
    keep_alive::KeepAliveHandle,
    metrics::ChannelMetrics,
    router::SensorRouter,
    sequencer::{
        LoggingHooks,
        SequencerHandle,
        SequencerHooks,
        SequencerQueue,
    },
    workflow::{
        CountingActivity,
        InstructionResponseActivity,
        WorkflowDispatch,
    },
    SensorId,
};

/// Decides which activities run for each sensor.
pub trait WorkflowBuilder {
    /// Registers workflows on `dispatch`. `queue` feeds the sensor's instruction sequencer.
    fn build(&self, dispatch: &mut WorkflowDispatch, queue: &SequencerQueue);

    fn hooks(&self, sensor: SensorId) -> Box<dyn SequencerHooks> {
        Box::new(LoggingHooks::new(sensor))
    }
}

/// Counts traffic on every known port and closes the instruction loop.
#[derive(Debug, Clone, Copy)]
pub struct StandardWorkflows {
    pub report_interval: Duration,
}

impl WorkflowBuilder for StandardWorkflows {
    fn build(&self, dispatch: &mut WorkflowDispatch, queue: &SequencerQueue) {
        for port in PortIdentifier::KNOWN {
            dispatch.register(port, vec![Box::new(CountingActivity::new(self.report_interval))]);
        }

        dispatch.add_activity(
            PortIdentifier::Instruction,
            Box::new(InstructionResponseActivity::new(queue.clone())),
        );
    }
}

pub struct Relay {
    local_addr: SocketAddr,
    sensors:    Vec<SensorId>,
    router:     Arc<SensorRouter>,
    sequencers: Vec<SequencerHandle>,
    keep_alive: Option<KeepAliveHandle>,
    cancel:     CancellationToken,
    listener:   JoinHandle<()>,
}

impl Relay {
    #[tracing::instrument(skip_all, fields(listen = %config.listen, sensors = config.sensors.len()))]
    pub async fn start<B>(config: &RelayConfig, builder: &B) -> Result<Self, RelayError>
    where
        B: WorkflowBuilder + ?Sized,
    {
        let socket = UdpSocket::bind_group(config.listen)
            .await
            .map_err(|source| RelayError::Bind {
                address: config.listen,
                source,
            })?;

        let socket = Arc::new(socket);
        let local_addr = socket.local_addr()?;
        let writer: Arc<dyn DatagramSender> = socket.clone();

        // Nothing fallible may follow the first spawned task.
        let keep_alive = match &config.keep_alive {
            Some(keep_alive) => {
                let callback = match (keep_alive.callback, local_addr) {
                    (Some(callback), _) => callback,
                    (None, SocketAddr::V4(local)) => local,
                    (None, other) => return Err(RelayError::KeepAliveAddress(other)),
                };

                Some(KeepAliveHandle::spawn(writer.clone(), keep_alive, callback)?)
            },
            None => None,
        };

        let mut router = SensorRouter::new();
        let mut sensors = Vec::with_capacity(config.sensors.len());
        let mut sequencers = Vec::with_capacity(config.sensors.len());

        for (index, sensor_config) in config.sensors.iter().enumerate() {
            let sensor = SensorId::new(index, sensor_config.address);
            let queue = SequencerQueue::default();

            let mut dispatch = WorkflowDispatch::new(sensor);
            builder.build(&mut dispatch, &queue);

            router.add(ChannelHandle::spawn(dispatch, &config.channel));
            sequencers.push(SequencerHandle::spawn(
                sensor,
                queue,
                writer.clone(),
                builder.hooks(sensor),
                &config.sequencer,
            ));

            tracing::info!(%sensor, name = sensor_config.name.as_deref(), "sensor configured");
            sensors.push(sensor);
        }

        let router = Arc::new(router);
        let cancel = CancellationToken::new();
        let listener = tokio::spawn(listen(socket, router.clone(), cancel.clone()));

        tracing::info!(%local_addr, "relay started");

        Ok(Self {
            local_addr,
            sensors,
            router,
            sequencers,
            keep_alive,
            cancel,
            listener,
        })
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[inline]
    pub fn sensors(&self) -> &[SensorId] {
        &self.sensors
    }

    #[inline]
    pub fn sequencer(&self, index: usize) -> Option<&SequencerHandle> {
        self.sequencers.get(index)
    }

    pub fn channel_metrics(&self, index: usize) -> Option<&Arc<ChannelMetrics>> {
        self.router.channels().get(index).map(ChannelHandle::metrics)
    }

    #[inline]
    pub fn unmapped(&self) -> u64 {
        self.router.unmapped()
    }

    pub fn log_metrics(&self) {
        tracing::info!(unmapped = self.unmapped(), "relay metrics");

        for channel in self.router.channels() {
            let snapshot = channel.metrics().snapshot();
            tracing::info!(sensor = %channel.sensor(), ?snapshot, "channel metrics");
        }
    }

    /// Stops every task, listener first. Keeps going past failures and returns the first one.
    pub async fn stop(self) -> Result<(), StopError> {
        self.cancel.cancel();
        let mut result = self.listener.await.map_err(StopError::from);

        if let Some(keep_alive) = self.keep_alive {
            result = result.and(keep_alive.stop().await);
        }

        for sequencer in self.sequencers {
            let outcome = sequencer.stop().await;
            util::trace_catch!(outcome, "sequencer did not stop cleanly");
            result = result.and(outcome);
        }

        match Arc::try_unwrap(self.router) {
            Ok(router) => {
                for channel in router.into_channels() {
                    let sensor = channel.sensor();
                    let outcome = channel.stop().await;
                    util::trace_catch!(warn, outcome, %sensor, "channel did not stop cleanly");
                    result = result.and(outcome);
                }
            },
            Err(_) => tracing::warn!("router still shared, leaving channels to wind down"),
        }

        tracing::info!("relay stopped");
        result
    }
}

#[tracing::instrument(skip_all)]
async fn listen(socket: Arc<UdpSocket>, router: Arc<SensorRouter>, cancel: CancellationToken) {
    let mut framed = UdpFramed::new(socket, DatagramCodec);

    loop {
        let item = tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            item = framed.next() => item,
        };

        match item {
            Some(Ok((datagram, from))) => {
                router.route(from, &datagram);
            },
            Some(Err(e)) => tracing::warn!(error = %e, "receive failed"),
            None => break,
        }
    }

    tracing::debug!("listener stopped");
}
