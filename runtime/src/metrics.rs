use std::{
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
    time::Duration,
};

use message::PortIdentifier;

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Min, max and total of a series of durations, in nanoseconds.
#[derive(Debug)]
pub struct DurationStats {
    count:    AtomicU64,
    min_ns:   AtomicU64,
    max_ns:   AtomicU64,
    total_ns: AtomicU64,
}

impl Default for DurationStats {
    fn default() -> Self {
        Self {
            count:    AtomicU64::new(0),
            min_ns:   AtomicU64::new(u64::MAX),
            max_ns:   AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DurationSnapshot {
    pub count: u64,
    pub min:   Option<Duration>,
    pub max:   Option<Duration>,
    pub total: Duration,
}

impl DurationStats {
    pub fn record(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

        self.count.fetch_add(1, Ordering::Relaxed);
        self.min_ns.fetch_min(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DurationSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let nonzero = |ns| (count > 0).then(|| Duration::from_nanos(ns));

        DurationSnapshot {
            count,
            min: nonzero(self.min_ns.load(Ordering::Relaxed)),
            max: nonzero(self.max_ns.load(Ordering::Relaxed)),
            total: Duration::from_nanos(self.total_ns.load(Ordering::Relaxed)),
        }
    }
}

/// One counter per known port identifier plus one for everything else.
#[derive(Debug, Default)]
pub struct PortCounters([Counter; PortIdentifier::KNOWN.len() + 1]);

impl PortCounters {
    #[inline]
    fn slot(id: PortIdentifier) -> usize {
        id.known_index().unwrap_or(PortIdentifier::KNOWN.len())
    }

    #[inline]
    pub fn inc(&self, id: PortIdentifier) {
        self.0[Self::slot(id)].inc();
    }

    #[inline]
    pub fn get(&self, id: PortIdentifier) -> u64 {
        self.0[Self::slot(id)].get()
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(Counter::get).sum()
    }
}

/// Counters for one sensor's reassembly channel, shared between its producer and consumer.
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    pub received:             Counter,
    pub received_bytes:       Counter,
    pub dropped:              Counter,
    pub dropped_segments:     Counter,
    pub dropped_by_port:      PortCounters,
    pub format_errors:        Counter,
    pub crc_errors:           Counter,
    pub unsupported_protocol: Counter,
    pub port_header_errors:   Counter,
    pub segments_discarded:   Counter,
    pub segment_overflows:    Counter,
    pub dispatched:           Counter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ChannelSnapshot {
    pub received:             u64,
    pub received_bytes:       u64,
    pub dropped:              u64,
    pub dropped_segments:     u64,
    pub format_errors:        u64,
    pub crc_errors:           u64,
    pub unsupported_protocol: u64,
    pub port_header_errors:   u64,
    pub segments_discarded:   u64,
    pub segment_overflows:    u64,
    pub dispatched:           u64,
}

impl ChannelMetrics {
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            received:             self.received.get(),
            received_bytes:       self.received_bytes.get(),
            dropped:              self.dropped.get(),
            dropped_segments:     self.dropped_segments.get(),
            format_errors:        self.format_errors.get(),
            crc_errors:           self.crc_errors.get(),
            unsupported_protocol: self.unsupported_protocol.get(),
            port_header_errors:   self.port_header_errors.get(),
            segments_discarded:   self.segments_discarded.get(),
            segment_overflows:    self.segment_overflows.get(),
            dispatched:           self.dispatched.get(),
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub processed:       Counter,
    pub processed_bytes: Counter,
    pub duration:        DurationStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct WorkflowSnapshot {
    pub processed:       u64,
    pub processed_bytes: u64,
    pub duration:        DurationSnapshot,
}

impl WorkflowMetrics {
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            processed:       self.processed.get(),
            processed_bytes: self.processed_bytes.get(),
            duration:        self.duration.snapshot(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duration_stats() {
        let stats = DurationStats::default();
        assert_eq!(stats.snapshot(), DurationSnapshot::default());

        stats.record(Duration::from_micros(5));
        stats.record(Duration::from_micros(2));
        stats.record(Duration::from_micros(9));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.min, Some(Duration::from_micros(2)));
        assert_eq!(snapshot.max, Some(Duration::from_micros(9)));
        assert_eq!(snapshot.total, Duration::from_micros(16));
    }

    #[test]
    fn port_counters() {
        let counters = PortCounters::default();

        counters.inc(PortIdentifier::Instruction);
        counters.inc(PortIdentifier::Unknown(5));
        counters.inc(PortIdentifier::Unknown(6));

        assert_eq!(counters.get(PortIdentifier::Instruction), 1);
        assert_eq!(counters.get(PortIdentifier::ObjectList), 0);
        assert_eq!(counters.get(PortIdentifier::Unknown(1)), 2);
        assert_eq!(counters.total(), 3);
    }
}
