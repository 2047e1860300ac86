use std::net::{
    IpAddr,
    SocketAddr,
};

use fnv::FnvHashMap;

use crate::{
    channel::ChannelHandle,
    metrics::Counter,
};

/// Hands each datagram to the channel of the sensor it came from.
///
/// A sensor configured with port 0 matches datagrams from any port on its address.
#[derive(Default)]
pub struct SensorRouter {
    exact:    FnvHashMap<SocketAddr, usize>,
    by_ip:    FnvHashMap<IpAddr, usize>,
    channels: Vec<ChannelHandle>,
    unmapped: Counter,
}

impl SensorRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the channel for the next sensor. Returns its index.
    pub fn add(&mut self, channel: ChannelHandle) -> usize {
        let index = self.channels.len();
        let address = channel.sensor().address;

        if address.port() == 0 {
            self.by_ip.insert(address.ip(), index);
        } else {
            self.exact.insert(address, index);
        }

        self.channels.push(channel);
        index
    }

    pub fn lookup(&self, from: SocketAddr) -> Option<usize> {
        self.exact
            .get(&from)
            .or_else(|| self.by_ip.get(&from.ip()))
            .copied()
    }

    /// Queues `datagram` on the sensor at `sensor_index`. Returns false if it was dropped.
    pub fn on_datagram(&self, sensor_index: usize, datagram: &[u8]) -> bool {
        match self.channels.get(sensor_index) {
            Some(channel) => channel.on_datagram(datagram),
            None => {
                self.unmapped.inc();
                false
            },
        }
    }

    pub fn route(&self, from: SocketAddr, datagram: &[u8]) -> bool {
        match self.lookup(from) {
            Some(index) => self.on_datagram(index, datagram),
            None => {
                self.unmapped.inc();
                tracing::trace!(%from, len = datagram.len(), "datagram from unknown sensor");
                false
            },
        }
    }

    #[inline]
    pub fn unmapped(&self) -> u64 {
        self.unmapped.get()
    }

    #[inline]
    pub fn channels(&self) -> &[ChannelHandle] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<ChannelHandle> {
        self.channels
    }
}

#[cfg(test)]
mod test {
    use message::PortIdentifier;

    use super::*;
    use crate::{
        config::ChannelConfig,
        workflow::WorkflowDispatch,
        SensorId,
    };

    fn channel(index: usize, address: &str) -> ChannelHandle {
        let sensor = SensorId::new(index, address.parse().unwrap());
        ChannelHandle::spawn(WorkflowDispatch::new(sensor), &ChannelConfig::default())
    }

    #[tokio::test]
    async fn routes_by_source() {
        let mut router = SensorRouter::new();
        router.add(channel(0, "10.0.0.1:55555"));
        router.add(channel(1, "10.0.0.2:0"));

        assert_eq!(router.lookup("10.0.0.1:55555".parse().unwrap()), Some(0));
        assert_eq!(router.lookup("10.0.0.1:1234".parse().unwrap()), None);
        assert_eq!(router.lookup("10.0.0.2:1234".parse().unwrap()), Some(1));

        let msg = crate::channel::fixtures::message(PortIdentifier::ObjectList, 0);
        assert!(router.route("10.0.0.2:9".parse().unwrap(), &msg));
        assert!(!router.route("10.0.0.3:9".parse().unwrap(), &msg));
        assert!(!router.on_datagram(7, &msg));
        assert_eq!(router.unmapped(), 2);

        for channel in router.into_channels() {
            channel.stop().await.unwrap();
        }
    }
}
