use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::{debug, error, warn};

use crate::config::RuntimeConfig;
use crate::mutation::CallbackError;

pub type Microtask = Box<dyn FnOnce()>;

/// What the mutation engine needs from the embedding runtime.
pub trait MicrotaskHost {
    /// Queue `task` to run at the next microtask checkpoint.
    fn enqueue_microtask(&self, task: Microtask);

    /// Report an error thrown by script that nothing caught.
    fn report_uncaught(&self, error: CallbackError);
}

/// Single-threaded microtask queue with an uncaught-error sink.
pub struct EventLoop {
    microtasks: RefCell<VecDeque<Microtask>>,
    uncaught: RefCell<Vec<CallbackError>>,
    microtask_limit: usize,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new(&RuntimeConfig::default())
    }
}

impl EventLoop {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            microtasks: RefCell::new(VecDeque::new()),
            uncaught: RefCell::new(Vec::new()),
            microtask_limit: config.microtask_limit.max(1),
        }
    }

    pub fn queue_microtask<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.microtasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn has_pending_microtasks(&self) -> bool {
        !self.microtasks.borrow().is_empty()
    }

    /// Run queued microtasks, including ones queued while running, until the
    /// queue is empty or the configured limit is hit. Returns how many ran.
    pub fn perform_microtask_checkpoint(&self) -> usize {
        let mut ran = 0usize;
        loop {
            if ran >= self.microtask_limit {
                warn!(
                    target: "event_loop",
                    "Stopped microtask checkpoint after {} tasks (possible infinite loop)",
                    self.microtask_limit
                );
                break;
            }
            let Some(task) = self.microtasks.borrow_mut().pop_front() else {
                break;
            };
            task();
            ran += 1;
        }

        if ran > 0 {
            debug!(target: "event_loop", "Executed {} microtasks", ran);
        }
        ran
    }

    /// Errors reported since the last call, oldest first.
    pub fn take_uncaught(&self) -> Vec<CallbackError> {
        std::mem::take(&mut *self.uncaught.borrow_mut())
    }
}

impl MicrotaskHost for EventLoop {
    fn enqueue_microtask(&self, task: Microtask) {
        self.microtasks.borrow_mut().push_back(task);
    }

    fn report_uncaught(&self, err: CallbackError) {
        error!(target: "event_loop", error = %err, "uncaught error in microtask");
        self.uncaught.borrow_mut().push(err);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn runs_tasks_queued_during_checkpoint() {
        let event_loop = Rc::new(EventLoop::default());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_loop = Rc::clone(&event_loop);
        let inner_log = Rc::clone(&log);
        event_loop.queue_microtask(move || {
            inner_log.borrow_mut().push("first");
            let nested_log = Rc::clone(&inner_log);
            inner_loop.queue_microtask(move || nested_log.borrow_mut().push("nested"));
        });
        let second_log = Rc::clone(&log);
        event_loop.queue_microtask(move || second_log.borrow_mut().push("second"));

        assert_eq!(event_loop.perform_microtask_checkpoint(), 3);
        assert_eq!(*log.borrow(), vec!["first", "second", "nested"]);
        assert!(!event_loop.has_pending_microtasks());
    }

    #[test]
    fn limit_leaves_remaining_tasks_queued() {
        let config = RuntimeConfig {
            microtask_limit: 2,
            ..RuntimeConfig::default()
        };
        let event_loop = EventLoop::new(&config);
        for _ in 0..3 {
            event_loop.queue_microtask(|| {});
        }
        assert_eq!(event_loop.perform_microtask_checkpoint(), 2);
        assert!(event_loop.has_pending_microtasks());
        assert_eq!(event_loop.perform_microtask_checkpoint(), 1);
    }

    #[test]
    fn empty_checkpoint_is_a_no_op() {
        let event_loop = EventLoop::default();
        assert_eq!(event_loop.perform_microtask_checkpoint(), 0);
        assert!(event_loop.take_uncaught().is_empty());
    }
}
