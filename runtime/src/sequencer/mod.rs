//! One-in-flight instruction exchange with a single sensor.
//!
//! Requests wait in a send queue and go out one at a time. The head of the queue stays
//! outstanding until a response carrying its sequence number arrives, the resend cooldown
//! expires and it is retried, or its retries run out and it is dropped.

use std::{
    collections::VecDeque,
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use message::{
    instruction::MAX_DETAILS,
    FormatError,
    Instruction,
};
use parking_lot::Mutex;
use tokio::{
    sync::Notify,
    time::Instant,
};

mod hooks;
mod task;

pub use hooks::{
    LoggingHooks,
    SequencerHooks,
    Step,
};
pub use task::SequencerHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct SendQueueItem {
    pub request:     Instruction,
    pub response:    Option<Instruction>,
    pub created_on:  Instant,
    pub retry_on:    Instant,
    /// Transmissions so far.
    pub retry_no:    u32,
    /// Zero retries forever.
    pub max_retries: u32,
}

impl SendQueueItem {
    pub fn new(request: Instruction, max_retries: u32, now: Instant) -> Self {
        Self {
            request,
            response: None,
            created_on: now,
            retry_on: now,
            retry_no: 0,
            max_retries,
        }
    }

    #[inline]
    pub fn sequence_no(&self) -> u32 {
        self.request.sequence_no
    }

    #[inline]
    pub fn should_retry(&self) -> bool {
        self.max_retries == 0 || self.retry_no <= self.max_retries
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, derive_more::Display)]
pub enum State {
    AwaitSending,
    AwaitReceiving,
}

#[derive(Default)]
struct Queues {
    sends:    Mutex<VecDeque<SendQueueItem>>,
    receives: Mutex<VecDeque<Instruction>>,
    wake:     Notify,
}

/// Shared handle to a sequencer's queues. Cheap to clone; safe to use from any task.
#[derive(Clone, Default)]
pub struct SequencerQueue(Arc<Queues>);

impl SequencerQueue {
    pub fn enqueue_send(&self, item: SendQueueItem) -> Result<(), message::Error> {
        if item.request.details.len() > MAX_DETAILS {
            return Err(FormatError::TooManyDetails(item.request.details.len()).into());
        }

        self.0.sends.lock().push_back(item);
        self.0.wake.notify_one();

        Ok(())
    }

    /// Queues `request` for sending, stamped with the current time.
    pub fn enqueue(&self, request: Instruction, max_retries: u32) -> Result<(), message::Error> {
        self.enqueue_send(SendQueueItem::new(request, max_retries, Instant::now()))
    }

    pub fn enqueue_receive(&self, response: Instruction) {
        self.0.receives.lock().push_back(response);
        self.0.wake.notify_one();
    }

    #[inline]
    pub fn send_len(&self) -> usize {
        self.0.sends.lock().len()
    }

    #[inline]
    pub fn receive_len(&self) -> usize {
        self.0.receives.lock().len()
    }

    pub(crate) async fn notified(&self) {
        self.0.wake.notified().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Nothing queued.
    Idle,
    /// Outstanding request not yet due for a retry.
    Waiting { deadline: Instant },
    /// Transmit `datagram`; the head is now outstanding.
    Send {
        sequence_no: u32,
        retry_no:    u32,
        datagram:    Bytes,
    },
    /// The outstanding request was answered and removed from the queue.
    Matched(SendQueueItem),
    /// A response did not match the outstanding request. Nothing was removed.
    SequenceError {
        received:    Instruction,
        outstanding: Option<SendQueueItem>,
    },
    /// The outstanding request expired and will be sent again.
    Resend(SendQueueItem),
    /// The outstanding request expired with no retries left. Resolve with [`Sequencer::drop_head`].
    Exhausted(SendQueueItem),
    /// The head could not be encoded and was removed.
    Rejected {
        sequence_no: u32,
        error:       message::Error,
    },
}

pub struct Sequencer {
    queue:            SequencerQueue,
    state:            State,
    next_sequence_no: u32,
    resend_cooldown:  Duration,
}

#[inline]
fn advance(counter: &mut u32) -> u32 {
    let result = *counter;
    *counter = counter.checked_add(1).unwrap_or(1);

    result
}

impl Sequencer {
    pub fn new(queue: SequencerQueue, resend_cooldown: Duration) -> Self {
        Self {
            queue,
            state: State::AwaitSending,
            next_sequence_no: 1,
            resend_cooldown,
        }
    }

    /// Overrides the first sequence number handed out. Zero is never used.
    pub fn starting_at(mut self, sequence_no: u32) -> Self {
        self.next_sequence_no = sequence_no.max(1);
        self
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn queue(&self) -> &SequencerQueue {
        &self.queue
    }

    pub fn step(&mut self, now: Instant) -> Event {
        match self.state {
            State::AwaitSending => self.step_send(now),
            State::AwaitReceiving => self.step_receive(now),
        }
    }

    fn step_send(&mut self, now: Instant) -> Event {
        if self.queue.0.sends.lock().is_empty() {
            return match self.queue.0.receives.lock().pop_front() {
                Some(received) => Event::SequenceError {
                    received,
                    outstanding: None,
                },
                None => Event::Idle,
            };
        }

        let mut sends = self.queue.0.sends.lock();
        let Some(head) = sends.front_mut() else {
            return Event::Idle;
        };

        if head.retry_no == 0 {
            head.request.sequence_no = advance(&mut self.next_sequence_no);
        }

        head.retry_no += 1;
        head.retry_on = now;

        let sequence_no = head.sequence_no();
        let retry_no = head.retry_no;

        match head.request.encode() {
            Ok(datagram) => {
                self.state = State::AwaitReceiving;

                Event::Send {
                    sequence_no,
                    retry_no,
                    datagram,
                }
            },
            Err(error) => {
                sends.pop_front();
                Event::Rejected { sequence_no, error }
            },
        }
    }

    fn step_receive(&mut self, now: Instant) -> Event {
        let received = self.queue.0.receives.lock().pop_front();
        let mut sends = self.queue.0.sends.lock();

        if let Some(received) = received {
            if sends.front().map(SendQueueItem::sequence_no) == Some(received.sequence_no) {
                if let Some(mut item) = sends.pop_front() {
                    self.state = State::AwaitSending;
                    item.response = Some(received);

                    return Event::Matched(item);
                }
            }

            return Event::SequenceError {
                received,
                outstanding: sends.front().cloned(),
            };
        }

        let Some(head) = sends.front() else {
            self.state = State::AwaitSending;
            return Event::Idle;
        };

        let deadline = head.retry_on + self.resend_cooldown;
        if now < deadline {
            return Event::Waiting { deadline };
        }

        self.state = State::AwaitSending;

        if head.should_retry() {
            Event::Resend(head.clone())
        } else {
            Event::Exhausted(head.clone())
        }
    }

    /// Removes the head of the send queue if it still carries `sequence_no`.
    pub fn drop_head(&mut self, sequence_no: u32) -> Option<SendQueueItem> {
        let mut sends = self.queue.0.sends.lock();

        match sends.front() {
            Some(head) if head.sequence_no() == sequence_no => sends.pop_front(),
            _ => None,
        }
    }
}
