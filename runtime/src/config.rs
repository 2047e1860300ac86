use std::{
    net::{
        Ipv4Addr,
        SocketAddr,
        SocketAddrV4,
    },
    time::Duration,
};

use serde::Deserialize;

pub const DEFAULT_QUEUE_CAPACITY: usize = 5;
pub const DEFAULT_REASSEMBLY_CAPACITY: usize = 16 * 1024;
pub const DEFAULT_LISTEN_PORT: u16 = 55555;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Datagrams waiting for the consumer; producers drop when full.
    pub queue_capacity:      usize,
    pub reassembly_capacity: usize,
    pub log_repeat_ms:       u64,
    pub stop_timeout_ms:     u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            queue_capacity:      DEFAULT_QUEUE_CAPACITY,
            reassembly_capacity: DEFAULT_REASSEMBLY_CAPACITY,
            log_repeat_ms:       10_000,
            stop_timeout_ms:     3_000,
        }
    }
}

impl ChannelConfig {
    #[inline]
    pub fn log_repeat(&self) -> Duration {
        Duration::from_millis(self.log_repeat_ms)
    }

    #[inline]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequencerConfig {
    /// Sleep when there is nothing to send.
    pub idle_cooldown_ms:   u64,
    /// How long an outstanding request waits for its response before a retry.
    pub resend_cooldown_ms: u64,
    pub stop_timeout_ms:    u64,
    /// Default for new requests. Zero retries forever.
    pub max_retries:        u32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            idle_cooldown_ms:   1_000,
            resend_cooldown_ms: 60_000,
            stop_timeout_ms:    3_000,
            max_retries:        3,
        }
    }
}

impl SequencerConfig {
    #[inline]
    pub fn idle_cooldown(&self) -> Duration {
        Duration::from_millis(self.idle_cooldown_ms)
    }

    #[inline]
    pub fn resend_cooldown(&self) -> Duration {
        Duration::from_millis(self.resend_cooldown_ms)
    }

    #[inline]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeepAliveConfig {
    pub client_id: u32,
    /// Where announcements are sent.
    pub multicast: SocketAddrV4,
    /// Address sensors are asked to stream to. Defaults to the listen address.
    pub callback:  Option<SocketAddrV4>,
    pub period_ms: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            client_id: 0x0100_0001,
            multicast: SocketAddrV4::new(Ipv4Addr::new(239, 144, 0, 0), 60000),
            callback:  None,
            period_ms: 1_000,
        }
    }
}

impl KeepAliveConfig {
    #[inline]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    /// Source address of the sensor. Port 0 matches any source port.
    pub address: SocketAddr,
    #[serde(default)]
    pub name:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    pub listen:     SocketAddr,
    pub sensors:    Vec<SensorConfig>,
    pub channel:    ChannelConfig,
    pub sequencer:  SequencerConfig,
    pub keep_alive: Option<KeepAliveConfig>,
    /// Interval of the counting activity's throughput reports.
    pub report_ms:  u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen:     SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LISTEN_PORT)),
            sensors:    vec![],
            channel:    ChannelConfig::default(),
            sequencer:  SequencerConfig::default(),
            keep_alive: None,
            report_ms:  10_000,
        }
    }
}

impl RelayConfig {
    #[inline]
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_ms)
    }
}
