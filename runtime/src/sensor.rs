use std::net::SocketAddr;

/// Identity of one configured sensor. `index` is its position in the relay configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display(fmt = "sensor {} ({})", index, address)]
pub struct SensorId {
    pub index:   usize,
    pub address: SocketAddr,
}

impl SensorId {
    #[inline]
    pub const fn new(index: usize, address: SocketAddr) -> Self {
        Self { index, address }
    }
}
