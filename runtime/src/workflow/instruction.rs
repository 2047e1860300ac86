use message::Instruction;
use tokio::time::Instant;
use util::LogThrottle;

use crate::{
    metrics::Counter,
    sequencer::SequencerQueue,
    workflow::Activity,
};

/// Decodes instruction responses and hands them to the sensor's sequencer.
pub struct InstructionResponseActivity {
    queue:         SequencerQueue,
    throttle:      LogThrottle,
    pub decoded:   Counter,
    pub malformed: Counter,
}

impl InstructionResponseActivity {
    pub fn new(queue: SequencerQueue) -> Self {
        Self {
            queue,
            throttle: LogThrottle::default(),
            decoded: Counter::default(),
            malformed: Counter::default(),
        }
    }
}

impl Activity for InstructionResponseActivity {
    fn name(&self) -> &'static str {
        "instruction_response"
    }

    fn process(&mut self, now: Instant, message: &[u8]) {
        match Instruction::decode(message) {
            Ok(response) => {
                self.decoded.inc();
                self.throttle.clear();

                tracing::debug!(
                    sequence_no = response.sequence_no,
                    details = response.details.len(),
                    "instruction response"
                );

                self.queue.enqueue_receive(response);
            },
            Err(e) => {
                self.malformed.inc();
                self.throttle.warn(now.into_std(), e.kind().as_str(), &e);

                tracing::trace!(bytes = %hex::encode(message), "malformed instruction");
            },
        }
    }
}

#[cfg(test)]
mod test {
    use message::instruction::{
        Detail,
        RequestType,
    };

    use super::*;

    #[test]
    fn forwards_responses() {
        let queue = SequencerQueue::default();
        let mut activity = InstructionResponseActivity::new(queue.clone());

        let mut response = Instruction::with_details([Detail::new(RequestType::GetParameter, 1, 1)]);
        response.sequence_no = 4;
        let encoded = response.encode().unwrap();

        activity.process(Instant::now(), &encoded);
        activity.process(Instant::now(), &encoded[..20]);

        assert_eq!(activity.decoded.get(), 1);
        assert_eq!(activity.malformed.get(), 1);
        assert_eq!(queue.receive_len(), 1);
    }
}
