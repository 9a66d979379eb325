//! Mutation observation: registrations, record queueing, and batched
//! microtask delivery to `MutationObserver` callbacks.

pub mod observer;
pub mod options;
pub mod queueing;
pub mod record;
pub mod registry;
pub mod scheduler;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::event_loop::MicrotaskHost;

use self::observer::ObserverSlot;
use self::registry::NodeRegistry;
use self::scheduler::Scheduler;

pub use self::observer::{MutationCallback, MutationObserver};
pub use self::options::{ConfigurationError, MutationObserverInit, ObserveOptions};
pub use self::queueing::TreeView;
pub use self::record::{Mutation, MutationRecord, MutationType};
pub use self::scheduler::CallbackError;

/// Stable index of a node in the host tree.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u32);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

#[derive(Default)]
pub(crate) struct EngineState {
    pub(crate) registry: NodeRegistry,
    pub(crate) observers: HashMap<ObserverId, ObserverSlot>,
    pub(crate) scheduler: Scheduler,
    next_observer_id: u32,
}

impl EngineState {
    fn allocate_observer(&mut self, callback: MutationCallback) -> ObserverId {
        self.next_observer_id = self.next_observer_id.wrapping_add(1);
        let id = ObserverId(self.next_observer_id);
        self.observers.insert(id, ObserverSlot::new(callback));
        id
    }
}

pub(crate) struct EngineShared {
    state: RefCell<EngineState>,
    host: Rc<dyn MicrotaskHost>,
}

/// The per-document mutation observation context.
///
/// Cloning yields another handle to the same context. The tree calls the
/// `notify_*` hooks on it; observers are created against it.
#[derive(Clone)]
pub struct MutationEngine {
    shared: Rc<EngineShared>,
}

impl MutationEngine {
    pub fn new(host: Rc<dyn MicrotaskHost>) -> Self {
        Self {
            shared: Rc::new(EngineShared {
                state: RefCell::new(EngineState::default()),
                host,
            }),
        }
    }

    /// Whether a notification microtask has been handed to the host and has
    /// not started running yet.
    pub fn is_notification_scheduled(&self) -> bool {
        self.state().scheduler.is_queued()
    }

    /// Observers waiting for the next dispatch, in notification order.
    pub fn pending_observers(&self) -> Vec<ObserverId> {
        self.state().scheduler.pending().to_vec()
    }

    pub(crate) fn register_callback(&self, callback: MutationCallback) -> ObserverId {
        self.state_mut().allocate_observer(callback)
    }

    pub(crate) fn host(&self) -> &Rc<dyn MicrotaskHost> {
        &self.shared.host
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<EngineShared> {
        Rc::downgrade(&self.shared)
    }

    pub(crate) fn from_shared(shared: Rc<EngineShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn state(&self) -> Ref<'_, EngineState> {
        self.shared.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, EngineState> {
        self.shared.state.borrow_mut()
    }

    pub(crate) fn same_engine(&self, other: &MutationEngine) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.state.try_borrow() {
            Ok(state) => f
                .debug_struct("MutationEngine")
                .field("observers", &state.observers.len())
                .field("scheduler", &state.scheduler)
                .finish(),
            Err(_) => f.write_str("MutationEngine { <busy> }"),
        }
    }
}
