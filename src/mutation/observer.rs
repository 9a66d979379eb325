use std::fmt;

use tracing::debug;

use super::options::{ConfigurationError, MutationObserverInit, ObserveOptions};
use super::record::{Mutation, MutationRecord};
use super::registry::RegisterOutcome;
use super::{MutationEngine, NodeId, ObserverId};

/// Callback invoked with each delivered batch and the observer it belongs to.
pub type MutationCallback =
    Box<dyn FnMut(Vec<MutationRecord>, &MutationObserver) -> anyhow::Result<()>>;

/// FIFO of undelivered records owned by one observer.
#[derive(Debug, Default)]
pub(crate) struct RecordQueue {
    records: Vec<MutationRecord>,
}

impl RecordQueue {
    /// Append a record for `change`, unless an undelivered record already
    /// covers it. Returns whether a record was appended.
    pub(crate) fn push(&mut self, change: &Mutation, old_value: Option<String>) -> bool {
        if self
            .records
            .iter()
            .any(|queued| queued.coalesces_with(change))
        {
            return false;
        }
        self.records.push(MutationRecord::new(change, old_value));
        true
    }

    pub(crate) fn drain(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub(crate) struct ObserverSlot {
    /// `None` only while the callback is running.
    pub(crate) callback: Option<MutationCallback>,
    pub(crate) queue: RecordQueue,
    pub(crate) nodes: Vec<NodeId>,
}

impl ObserverSlot {
    pub(crate) fn new(callback: MutationCallback) -> Self {
        Self {
            callback: Some(callback),
            queue: RecordQueue::default(),
            nodes: Vec::new(),
        }
    }
}

/// Script-facing `MutationObserver`.
///
/// Handles are cheap to clone and compare equal when they name the same
/// observer. Registrations are only released by [`MutationObserver::disconnect`].
#[derive(Clone)]
pub struct MutationObserver {
    id: ObserverId,
    engine: MutationEngine,
}

impl MutationObserver {
    pub fn new<F>(engine: &MutationEngine, callback: F) -> Self
    where
        F: FnMut(Vec<MutationRecord>, &MutationObserver) -> anyhow::Result<()> + 'static,
    {
        let id = engine.register_callback(Box::new(callback));
        Self {
            id,
            engine: engine.clone(),
        }
    }

    pub(crate) fn from_parts(id: ObserverId, engine: MutationEngine) -> Self {
        Self { id, engine }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Start observing `target`, or replace the options of an existing
    /// registration on it. Invalid options leave every registration untouched.
    pub fn observe(
        &self,
        target: NodeId,
        init: &MutationObserverInit,
    ) -> Result<(), ConfigurationError> {
        let options = ObserveOptions::normalize(init)?;

        let mut guard = self.engine.state_mut();
        let state = &mut *guard;
        match state.registry.register(target, self.id, options) {
            RegisterOutcome::Added => {
                if let Some(slot) = state.observers.get_mut(&self.id) {
                    slot.nodes.push(target);
                }
                debug!(target: "mutation", observer = %self.id, node = target, "observe");
            }
            RegisterOutcome::Replaced => {
                debug!(target: "mutation", observer = %self.id, node = target, "observe replaced options");
            }
        }
        Ok(())
    }

    /// Drop every registration, discard queued records, and cancel a pending
    /// delivery for this observer.
    pub fn disconnect(&self) {
        let mut guard = self.engine.state_mut();
        let state = &mut *guard;
        let Some(slot) = state.observers.get_mut(&self.id) else {
            return;
        };

        let nodes = std::mem::take(&mut slot.nodes);
        let discarded = slot.queue.len();
        slot.queue.clear();
        for node in &nodes {
            state.registry.unregister(*node, self.id);
        }
        state.scheduler.remove(self.id);

        debug!(
            target: "mutation",
            observer = %self.id,
            nodes = nodes.len(),
            discarded,
            "disconnect"
        );
    }

    /// Empty the record queue and return its contents.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        self.engine
            .state_mut()
            .observers
            .get_mut(&self.id)
            .map(|slot| slot.queue.drain())
            .unwrap_or_default()
    }

    /// Nodes this observer currently holds registrations on.
    pub fn observed_nodes(&self) -> Vec<NodeId> {
        self.engine
            .state()
            .observers
            .get(&self.id)
            .map(|slot| slot.nodes.clone())
            .unwrap_or_default()
    }

    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }
}

impl PartialEq for MutationObserver {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.engine.same_engine(&other.engine)
    }
}

impl Eq for MutationObserver {}

impl fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationObserver")
            .field("id", &self.id)
            .finish()
    }
}
