//! Routing of complete messages to per-port chains of activities.

use std::sync::Arc;

use fnv::FnvHashMap;
use message::PortIdentifier;
use tokio::time::Instant;

use crate::{
    metrics::{
        Counter,
        WorkflowMetrics,
        WorkflowSnapshot,
    },
    SensorId,
};

mod counting;
mod instruction;

pub use counting::{
    CountingActivity,
    CountingStats,
};
pub use instruction::InstructionResponseActivity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityContext {
    pub sensor:   SensorId,
    pub port:     PortIdentifier,
    /// Position of the activity within its workflow.
    pub position: usize,
}

/// A stateful step run for every complete message on one sensor's port.
///
/// Activities run synchronously on the sensor's channel task, so they must not block.
pub trait Activity: Send {
    fn name(&self) -> &'static str;

    fn init(&mut self, _ctx: &ActivityContext) {}

    /// `message` is the whole message, transport header included.
    fn process(&mut self, now: Instant, message: &[u8]);
}

pub struct Workflow {
    activities: Vec<Box<dyn Activity>>,
    metrics:    Arc<WorkflowMetrics>,
}

impl Workflow {
    fn run(&mut self, now: Instant, message: &[u8]) {
        self.metrics.processed.inc();
        self.metrics.processed_bytes.add(message.len() as u64);

        let started = std::time::Instant::now();

        for activity in self.activities.iter_mut() {
            activity.process(now, message);
        }

        self.metrics.duration.record(started.elapsed());
    }
}

/// Maps port identifiers to workflows for a single sensor.
pub struct WorkflowDispatch {
    sensor:        SensorId,
    workflows:     FnvHashMap<PortIdentifier, Workflow>,
    skipped:       Counter,
    skipped_bytes: Counter,
}

impl WorkflowDispatch {
    pub fn new(sensor: SensorId) -> Self {
        Self {
            sensor,
            workflows: FnvHashMap::default(),
            skipped: Counter::default(),
            skipped_bytes: Counter::default(),
        }
    }

    #[inline]
    pub fn sensor(&self) -> SensorId {
        self.sensor
    }

    /// Installs `activities` as the workflow for `port`, replacing any previous one.
    pub fn register(
        &mut self,
        port: PortIdentifier,
        activities: Vec<Box<dyn Activity>>,
    ) -> Arc<WorkflowMetrics> {
        let mut workflow = Workflow {
            activities: Vec::with_capacity(activities.len()),
            metrics:    Arc::default(),
        };

        for activity in activities {
            self.push(&mut workflow, port, activity);
        }

        let metrics = workflow.metrics.clone();
        self.workflows.insert(port, workflow);

        metrics
    }

    /// Appends `activity` to the workflow for `port`, creating it if needed.
    pub fn add_activity(&mut self, port: PortIdentifier, activity: Box<dyn Activity>) {
        let mut workflow = self.workflows.remove(&port).unwrap_or_else(|| Workflow {
            activities: vec![],
            metrics:    Arc::default(),
        });

        self.push(&mut workflow, port, activity);
        self.workflows.insert(port, workflow);
    }

    fn push(&self, workflow: &mut Workflow, port: PortIdentifier, mut activity: Box<dyn Activity>) {
        let ctx = ActivityContext {
            sensor: self.sensor,
            port,
            position: workflow.activities.len(),
        };

        tracing::debug!(sensor = %self.sensor, %port, activity = activity.name(), "registering activity");

        activity.init(&ctx);
        workflow.activities.push(activity);
    }

    /// Runs the workflow for `port`. Returns false if none is registered.
    pub fn process(&mut self, port: PortIdentifier, now: Instant, message: &[u8]) -> bool {
        match self.workflows.get_mut(&port) {
            Some(workflow) => {
                workflow.run(now, message);
                true
            },
            None => {
                self.skipped.inc();
                self.skipped_bytes.add(message.len() as u64);

                tracing::trace!(sensor = %self.sensor, %port, "no workflow registered");
                false
            },
        }
    }

    #[inline]
    pub fn is_registered(&self, port: PortIdentifier) -> bool {
        self.workflows.contains_key(&port)
    }

    #[inline]
    pub fn skipped(&self) -> u64 {
        self.skipped.get()
    }

    #[inline]
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes.get()
    }

    pub fn metrics(&self, port: PortIdentifier) -> Option<Arc<WorkflowMetrics>> {
        self.workflows.get(&port).map(|w| w.metrics.clone())
    }

    pub fn snapshot(&self) -> Vec<(PortIdentifier, WorkflowSnapshot)> {
        let mut result = self
            .workflows
            .iter()
            .map(|(port, workflow)| (*port, workflow.metrics.snapshot()))
            .collect::<Vec<_>>();

        result.sort_by_key(|(port, _)| u32::from(*port));
        result
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Mutex;

    use super::*;

    /// Appends `(tag, message length)` to a shared log.
    pub struct Recorder {
        pub tag: &'static str,
        pub log: Arc<Mutex<Vec<(&'static str, usize)>>>,
        pub ctx: Option<ActivityContext>,
    }

    impl Recorder {
        pub fn boxed(tag: &'static str, log: &Arc<Mutex<Vec<(&'static str, usize)>>>) -> Box<dyn Activity> {
            Box::new(Self {
                tag,
                log: log.clone(),
                ctx: None,
            })
        }
    }

    impl Activity for Recorder {
        fn name(&self) -> &'static str {
            self.tag
        }

        fn init(&mut self, ctx: &ActivityContext) {
            self.ctx = Some(*ctx);
        }

        fn process(&mut self, _now: Instant, message: &[u8]) {
            assert!(self.ctx.is_some());
            self.log.lock().unwrap().push((self.tag, message.len()));
        }
    }

    pub fn sensor() -> SensorId {
        SensorId::new(0, "192.168.11.11:55555".parse().unwrap())
    }

    #[test]
    fn runs_in_registration_order() {
        let log = Arc::default();
        let mut dispatch = WorkflowDispatch::new(sensor());

        let metrics = dispatch.register(PortIdentifier::ObjectList, vec![
            Recorder::boxed("a", &log),
            Recorder::boxed("b", &log),
        ]);
        dispatch.add_activity(PortIdentifier::ObjectList, Recorder::boxed("c", &log));

        assert!(dispatch.process(PortIdentifier::ObjectList, Instant::now(), &[0; 10]));
        assert_eq!(*log.lock().unwrap(), vec![("a", 10), ("b", 10), ("c", 10)]);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.processed, 1);
        assert_eq!(snapshot.processed_bytes, 10);
        assert_eq!(snapshot.duration.count, 1);
    }

    #[test]
    fn unregistered_port_is_skipped() {
        let log = Arc::default();
        let mut dispatch = WorkflowDispatch::new(sensor());
        dispatch.register(PortIdentifier::ObjectList, vec![Recorder::boxed("a", &log)]);

        assert!(!dispatch.process(PortIdentifier::Statistics, Instant::now(), &[0; 7]));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(dispatch.skipped(), 1);
        assert_eq!(dispatch.skipped_bytes(), 7);
    }

    #[test]
    fn register_replaces() {
        let log = Arc::default();
        let mut dispatch = WorkflowDispatch::new(sensor());

        dispatch.register(PortIdentifier::Pvr, vec![Recorder::boxed("old", &log)]);
        dispatch.register(PortIdentifier::Pvr, vec![Recorder::boxed("new", &log)]);
        dispatch.process(PortIdentifier::Pvr, Instant::now(), &[1]);

        assert_eq!(*log.lock().unwrap(), vec![("new", 1)]);
        assert_eq!(dispatch.snapshot().len(), 1);
        assert!(dispatch.is_registered(PortIdentifier::Pvr));
        assert!(!dispatch.is_registered(PortIdentifier::Wgs84));
    }
}
