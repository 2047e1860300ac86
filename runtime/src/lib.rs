//! Per-sensor runtime: datagram reassembly, workflow dispatch and instruction sequencing.

pub mod channel;
pub mod config;
pub mod error;
pub mod keep_alive;
pub mod metrics;
pub mod relay;
pub mod router;
pub mod sequencer;
pub mod workflow;

mod sensor;

pub use channel::{
    ChannelHandle,
    ReassemblyChannel,
};
pub use config::RelayConfig;
pub use error::{
    RelayError,
    SegmentationError,
    StopError,
};
pub use relay::{
    Relay,
    StandardWorkflows,
    WorkflowBuilder,
};
pub use router::SensorRouter;
pub use sensor::SensorId;
pub use sequencer::{
    SendQueueItem,
    SequencerHandle,
    SequencerHooks,
    SequencerQueue,
};
pub use workflow::{
    Activity,
    ActivityContext,
    WorkflowDispatch,
};
