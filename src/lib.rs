// Library exports for the replay binary and integration tests

pub mod config;
pub mod dom;
pub mod event_loop;
pub mod mutation;
pub mod replay;

// Re-export commonly used types for tests
pub use config::RuntimeConfig;
pub use dom::Document;
pub use event_loop::{EventLoop, MicrotaskHost};
pub use mutation::{
    ConfigurationError, MutationEngine, MutationObserver, MutationObserverInit, MutationRecord,
    MutationType, NodeId,
};
