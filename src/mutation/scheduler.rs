use thiserror::Error;
use tracing::debug;

use super::observer::MutationObserver;
use super::{MutationEngine, ObserverId};

/// An error returned by an observer callback during dispatch.
#[derive(Debug, Error)]
#[error("mutation observer callback failed ({observer}): {source}")]
pub struct CallbackError {
    pub observer: ObserverId,
    #[source]
    pub source: anyhow::Error,
}

/// The shared "notification queued" flag and the ordered set of observers
/// awaiting delivery.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    microtask_queued: bool,
    pending: Vec<ObserverId>,
}

impl Scheduler {
    /// Mark `observer` pending. Returns true when the caller must hand a new
    /// dispatch task to the host.
    pub(crate) fn mark_pending(&mut self, observer: ObserverId) -> bool {
        self.defer(observer);
        if self.microtask_queued {
            return false;
        }
        self.microtask_queued = true;
        true
    }

    /// Clear the flag and take the pending set, in that order.
    pub(crate) fn begin_dispatch(&mut self) -> Vec<ObserverId> {
        self.microtask_queued = false;
        std::mem::take(&mut self.pending)
    }

    /// Keep `observer` pending without requesting a task.
    pub(crate) fn defer(&mut self, observer: ObserverId) {
        if !self.pending.contains(&observer) {
            self.pending.push(observer);
        }
    }

    pub(crate) fn remove(&mut self, observer: ObserverId) {
        self.pending.retain(|entry| *entry != observer);
    }

    pub(crate) fn is_queued(&self) -> bool {
        self.microtask_queued
    }

    pub(crate) fn pending(&self) -> &[ObserverId] {
        &self.pending
    }
}

impl MutationEngine {
    pub(crate) fn ensure_notification_scheduled(&self, observer: ObserverId) {
        let needs_task = self.state_mut().scheduler.mark_pending(observer);
        if !needs_task {
            return;
        }

        let engine = self.downgrade();
        self.host().enqueue_microtask(Box::new(move || {
            if let Some(shared) = engine.upgrade() {
                MutationEngine::from_shared(shared).dispatch();
            }
        }));
        debug!(target: "mutation", %observer, "scheduled mutation observer microtask");
    }

    /// Deliver every pending observer's queued records.
    ///
    /// Runs as the body of the notification microtask. No engine borrow is
    /// held while a callback runs, so callbacks may observe, disconnect, take
    /// records, or mutate the tree.
    pub(crate) fn dispatch(&self) {
        let snapshot = self.state_mut().scheduler.begin_dispatch();
        let mut delivered = 0usize;

        for observer in snapshot {
            let taken = {
                let mut state = self.state_mut();
                let Some(slot) = state.observers.get_mut(&observer) else {
                    continue;
                };
                if slot.callback.is_none() {
                    // Dispatch re-entered from this observer's own callback;
                    // the outer dispatch reschedules it once the callback returns.
                    state.scheduler.defer(observer);
                    continue;
                }
                let records = slot.queue.drain();
                if records.is_empty() {
                    continue;
                }
                slot.callback.take().map(|callback| (records, callback))
            };
            let Some((records, mut callback)) = taken else {
                continue;
            };

            let handle = MutationObserver::from_parts(observer, self.clone());
            let count = records.len();
            let result = callback(records, &handle);

            let has_records = match self.state_mut().observers.get_mut(&observer) {
                Some(slot) => {
                    slot.callback = Some(callback);
                    !slot.queue.is_empty()
                }
                None => false,
            };
            if has_records {
                self.ensure_notification_scheduled(observer);
            }
            delivered += count;

            if let Err(source) = result {
                self.host()
                    .report_uncaught(CallbackError { observer, source });
            }
        }

        debug!(target: "mutation", delivered, "mutation observer dispatch finished");
    }
}
