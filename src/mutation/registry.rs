use std::collections::HashMap;

use super::options::ObserveOptions;
use super::{NodeId, ObserverId};

/// One observer's interest in one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub observer: ObserverId,
    pub options: ObserveOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Added,
    Replaced,
}

/// Per-node registration lists, keyed by node id so the tree and the engine
/// never hold references into each other.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    by_node: HashMap<NodeId, Vec<Registration>>,
}

impl NodeRegistry {
    pub fn registrations(&self, node: NodeId) -> &[Registration] {
        self.by_node.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add a registration, or replace the options of the existing one for
    /// this pair in place.
    pub fn register(
        &mut self,
        node: NodeId,
        observer: ObserverId,
        options: ObserveOptions,
    ) -> RegisterOutcome {
        let list = self.by_node.entry(node).or_default();
        if let Some(existing) = list.iter_mut().find(|entry| entry.observer == observer) {
            existing.options = options;
            return RegisterOutcome::Replaced;
        }
        list.push(Registration { observer, options });
        RegisterOutcome::Added
    }

    pub fn unregister(&mut self, node: NodeId, observer: ObserverId) {
        let Some(list) = self.by_node.get_mut(&node) else {
            return;
        };
        list.retain(|entry| entry.observer != observer);
        if list.is_empty() {
            self.by_node.remove(&node);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::options::MutationObserverInit;

    fn options(init: MutationObserverInit) -> ObserveOptions {
        ObserveOptions::normalize(&init).unwrap()
    }

    #[test]
    fn keeps_registration_order() {
        let mut registry = NodeRegistry::default();
        registry.register(1, ObserverId(2), options(MutationObserverInit::child_list()));
        registry.register(1, ObserverId(1), options(MutationObserverInit::child_list()));
        let observers: Vec<_> = registry
            .registrations(1)
            .iter()
            .map(|entry| entry.observer)
            .collect();
        assert_eq!(observers, vec![ObserverId(2), ObserverId(1)]);
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut registry = NodeRegistry::default();
        registry.register(1, ObserverId(1), options(MutationObserverInit::child_list()));
        registry.register(1, ObserverId(2), options(MutationObserverInit::child_list()));
        let outcome =
            registry.register(1, ObserverId(1), options(MutationObserverInit::attributes()));
        assert_eq!(outcome, RegisterOutcome::Replaced);

        let entries = registry.registrations(1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].observer, ObserverId(1));
        assert!(entries[0].options.attributes);
        assert!(!entries[0].options.child_list);
    }

    #[test]
    fn unregister_drops_empty_lists() {
        let mut registry = NodeRegistry::default();
        registry.register(5, ObserverId(1), options(MutationObserverInit::child_list()));
        registry.unregister(5, ObserverId(1));
        registry.unregister(6, ObserverId(1));
        assert!(registry.registrations(5).is_empty());
        assert!(registry.is_empty());
    }
}
