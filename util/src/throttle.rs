use std::{
    fmt::Display,
    time::{
        Duration,
        Instant,
    },
};

pub const DEFAULT_REPEAT_INTERVAL: Duration = Duration::from_secs(10);

/// What a [`LogThrottle`] decided about one occurrence of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Throttled {
    /// First occurrence, or the first after [`LogThrottle::clear`].
    First,
    /// A different error replaced the previous one, which repeated `repeats` times unlogged.
    Changed { previous: &'static str, repeats: u64, since: Instant },
    /// The repeat interval elapsed for the current error.
    Repeated { repeats: u64, since: Instant },
    Suppressed,
}

struct Current {
    kind:    &'static str,
    since:   Instant,
    repeats: u64,
}

/// Collapses bursts of the same error into one log line per repeat interval.
pub struct LogThrottle {
    repeat_interval: Duration,
    current:         Option<Current>,
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_REPEAT_INTERVAL)
    }
}

impl LogThrottle {
    pub fn new(repeat_interval: Duration) -> Self {
        Self {
            repeat_interval,
            current: None,
        }
    }

    pub fn observe(&mut self, now: Instant, kind: &'static str) -> Throttled {
        let Some(current) = self.current.as_mut() else {
            self.current = Some(Current {
                kind,
                since: now,
                repeats: 0,
            });

            return Throttled::First;
        };

        if current.kind != kind {
            let previous = std::mem::replace(current, Current {
                kind,
                since: now,
                repeats: 0,
            });

            return Throttled::Changed {
                previous: previous.kind,
                repeats:  previous.repeats,
                since:    previous.since,
            };
        }

        if now.saturating_duration_since(current.since) > self.repeat_interval {
            let result = Throttled::Repeated {
                repeats: current.repeats,
                since:   current.since,
            };

            current.since = now;
            current.repeats = 0;

            return result;
        }

        current.repeats += 1;
        Throttled::Suppressed
    }

    /// Records `error` under `kind`, emitting a warning unless throttled.
    pub fn warn(&mut self, now: Instant, kind: &'static str, error: &dyn Display) {
        match self.observe(now, kind) {
            Throttled::First => tracing::warn!(%error, kind, "datagram rejected"),
            Throttled::Changed {
                previous,
                repeats,
                since,
            } => {
                if repeats > 0 {
                    tracing::warn!(
                        kind = previous,
                        repeats,
                        since_ms = now.saturating_duration_since(since).as_millis() as u64,
                        "previous error repeated"
                    );
                }

                tracing::warn!(%error, kind, "datagram rejected");
            },
            Throttled::Repeated { repeats, since } => tracing::warn!(
                %error,
                kind,
                repeats,
                since_ms = now.saturating_duration_since(since).as_millis() as u64,
                "datagram rejected (repeating)"
            ),
            Throttled::Suppressed => {},
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
