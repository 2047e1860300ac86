use std::{
    sync::Arc,
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    metrics::Counter,
    workflow::{
        Activity,
        ActivityContext,
    },
};

#[derive(Debug, Default)]
pub struct CountingStats {
    pub messages: Counter,
    pub bytes:    Counter,
    pub reports:  Counter,
}

/// Counts messages and bytes, logging throughput once per report interval.
pub struct CountingActivity {
    stats:       Arc<CountingStats>,
    interval:    Duration,
    ctx:         Option<ActivityContext>,
    cycle_start: Option<Instant>,
    cycle_count: u64,
    cycle_bytes: u64,
}

impl CountingActivity {
    pub fn new(interval: Duration) -> Self {
        Self {
            stats: Arc::default(),
            interval,
            ctx: None,
            cycle_start: None,
            cycle_count: 0,
            cycle_bytes: 0,
        }
    }

    #[inline]
    pub fn stats(&self) -> Arc<CountingStats> {
        self.stats.clone()
    }

    fn report(&mut self, elapsed: Duration) {
        self.stats.reports.inc();

        let secs = elapsed.as_secs_f64().max(f64::EPSILON);

        if let Some(ctx) = self.ctx {
            tracing::info!(
                sensor = %ctx.sensor,
                port = %ctx.port,
                messages = self.cycle_count,
                bytes = self.cycle_bytes,
                rate = self.cycle_count as f64 / secs,
                total = self.stats.messages.get(),
                "throughput"
            );
        }

        self.cycle_count = 0;
        self.cycle_bytes = 0;
    }
}

impl Activity for CountingActivity {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn init(&mut self, ctx: &ActivityContext) {
        self.ctx = Some(*ctx);
    }

    fn process(&mut self, now: Instant, message: &[u8]) {
        self.stats.messages.inc();
        self.stats.bytes.add(message.len() as u64);
        self.cycle_count += 1;
        self.cycle_bytes += message.len() as u64;

        let start = *self.cycle_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);

        if elapsed >= self.interval {
            self.report(elapsed);
            self.cycle_start = Some(now);
        }
    }
}

#[cfg(test)]
mod test {
    use message::PortIdentifier;

    use super::*;
    use crate::workflow::test::sensor;

    #[test]
    fn reports_each_interval() {
        let mut activity = CountingActivity::new(Duration::from_secs(10));
        let stats = activity.stats();
        activity.init(&ActivityContext {
            sensor:   sensor(),
            port:     PortIdentifier::ObjectList,
            position: 0,
        });

        let t0 = Instant::now();
        for i in 0..10 {
            activity.process(t0 + Duration::from_secs(i), &[0; 100]);
        }
        assert_eq!(stats.reports.get(), 0);

        activity.process(t0 + Duration::from_secs(10), &[0; 100]);
        assert_eq!(stats.reports.get(), 1);

        activity.process(t0 + Duration::from_secs(11), &[0; 100]);
        assert_eq!(stats.reports.get(), 1);
        assert_eq!(stats.messages.get(), 12);
        assert_eq!(stats.bytes.get(), 1200);
    }
}
