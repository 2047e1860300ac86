use bytes::Bytes;
use message::Instruction;
use tokio::time::Instant;

use super::{
    Event,
    SendQueueItem,
    Sequencer,
    SequencerQueue,
};
use crate::SensorId;

/// Callbacks fired as the sequencer advances. All run on the sequencer's task.
pub trait SequencerHooks: Send {
    fn on_response(&mut self, _item: &SendQueueItem) {}

    fn on_sequence_error(&mut self, _received: &Instruction, _outstanding: Option<&SendQueueItem>) {}

    fn on_resend(&mut self, _item: &SendQueueItem) {}

    /// Retries are exhausted. Returning false keeps the request queued for another round.
    fn on_drop_instruction(&mut self, _item: &SendQueueItem) -> bool {
        true
    }

    fn on_after_send(&mut self, _sequence_no: u32, _retry_no: u32) {}

    /// Nothing is queued. Returning true skips the idle cooldown so requests enqueued here go
    /// out immediately.
    fn on_idle(&mut self, _queue: &SequencerQueue) -> bool {
        false
    }
}

impl SequencerHooks for () {}

/// What the driving loop should do after one [`Sequencer::drive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Transmit {
        sequence_no: u32,
        retry_no:    u32,
        datagram:    Bytes,
    },
    /// Sleep for the idle cooldown or until woken.
    Idle,
    WaitUntil(Instant),
    Continue,
}

impl Sequencer {
    /// Advances one step and dispatches the outcome to `hooks`.
    pub fn drive<H>(&mut self, now: Instant, hooks: &mut H) -> Step
    where
        H: SequencerHooks + ?Sized,
    {
        match self.step(now) {
            Event::Idle => {
                if hooks.on_idle(self.queue()) {
                    Step::Continue
                } else {
                    Step::Idle
                }
            },
            Event::Waiting { deadline } => Step::WaitUntil(deadline),
            Event::Send {
                sequence_no,
                retry_no,
                datagram,
            } => Step::Transmit {
                sequence_no,
                retry_no,
                datagram,
            },
            Event::Matched(item) => {
                hooks.on_response(&item);
                Step::Continue
            },
            Event::SequenceError {
                received,
                outstanding,
            } => {
                hooks.on_sequence_error(&received, outstanding.as_ref());
                Step::Continue
            },
            Event::Resend(item) => {
                hooks.on_resend(&item);
                Step::Continue
            },
            Event::Exhausted(item) => {
                if hooks.on_drop_instruction(&item) {
                    self.drop_head(item.sequence_no());
                }

                Step::Continue
            },
            Event::Rejected { sequence_no, error } => {
                tracing::error!(%error, sequence_no, "dropping instruction that failed to encode");
                Step::Continue
            },
        }
    }
}

/// Logs every exchange. Used when no other hooks are configured.
pub struct LoggingHooks {
    sensor: SensorId,
}

impl LoggingHooks {
    pub fn new(sensor: SensorId) -> Self {
        Self { sensor }
    }
}

impl SequencerHooks for LoggingHooks {
    fn on_response(&mut self, item: &SendQueueItem) {
        let response = item.response.as_ref();

        tracing::info!(
            sensor = %self.sensor,
            sequence_no = item.sequence_no(),
            attempts = item.retry_no,
            results = ?response.map(|r| r.details.iter().map(|d| d.response_type).collect::<Vec<_>>()),
            "instruction answered"
        );
    }

    fn on_sequence_error(&mut self, received: &Instruction, outstanding: Option<&SendQueueItem>) {
        tracing::warn!(
            sensor = %self.sensor,
            received = received.sequence_no,
            outstanding = ?outstanding.map(SendQueueItem::sequence_no),
            "response sequence mismatch"
        );
    }

    fn on_resend(&mut self, item: &SendQueueItem) {
        tracing::debug!(
            sensor = %self.sensor,
            sequence_no = item.sequence_no(),
            attempt = item.retry_no + 1,
            "resending instruction"
        );
    }

    fn on_drop_instruction(&mut self, item: &SendQueueItem) -> bool {
        tracing::warn!(
            sensor = %self.sensor,
            sequence_no = item.sequence_no(),
            attempts = item.retry_no,
            "no response, dropping instruction"
        );

        true
    }
}
