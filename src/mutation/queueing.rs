use tracing::trace;

use super::record::Mutation;
use super::registry::NodeRegistry;
use super::{MutationEngine, NodeId, ObserverId};

/// Read access the engine needs from the host tree.
pub trait TreeView {
    fn parent(&self, node: NodeId) -> Option<NodeId>;
}

/// `node` followed by each of its ancestors, root last.
pub fn inclusive_ancestors<T>(tree: &T, node: NodeId) -> Vec<NodeId>
where
    T: TreeView + ?Sized,
{
    let mut chain = vec![node];
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        chain.push(parent);
        current = parent;
    }
    chain
}

/// Observers interested in `change`, each with the old value its record
/// should carry. Ancestors are visited target first, registrations in
/// insertion order; the first matching registration of an observer decides
/// its old value.
pub(crate) fn interested_observers(
    registry: &NodeRegistry,
    ancestors: &[NodeId],
    change: &Mutation,
) -> Vec<(ObserverId, Option<String>)> {
    let target = change.target();
    let mut interested: Vec<(ObserverId, Option<String>)> = Vec::new();

    for &node in ancestors {
        for registration in registry.registrations(node) {
            let options = &registration.options;
            if node != target && !options.subtree {
                continue;
            }

            let wants_old_value = match change {
                Mutation::Attribute {
                    name, namespace, ..
                } => {
                    if !options.attributes
                        || !options.accepts_attribute(name, namespace.as_deref())
                    {
                        continue;
                    }
                    options.attribute_old_value
                }
                Mutation::CharacterData { .. } => {
                    if !options.character_data {
                        continue;
                    }
                    options.character_data_old_value
                }
                Mutation::ChildList { .. } => {
                    if !options.child_list {
                        continue;
                    }
                    false
                }
            };

            if interested
                .iter()
                .any(|(observer, _)| *observer == registration.observer)
            {
                continue;
            }

            let old_value = if wants_old_value {
                change.old_value().map(str::to_owned)
            } else {
                None
            };
            interested.push((registration.observer, old_value));
        }
    }

    interested
}

impl MutationEngine {
    /// Hook: an attribute on `node` was set, changed, or removed.
    pub fn notify_attribute_changed<T>(
        &self,
        tree: &T,
        node: NodeId,
        name: &str,
        namespace: Option<&str>,
        old_value: Option<&str>,
    ) where
        T: TreeView + ?Sized,
    {
        self.queue_mutation(
            tree,
            Mutation::Attribute {
                target: node,
                name: name.to_string(),
                namespace: namespace.map(str::to_owned),
                old_value: old_value.map(str::to_owned),
            },
        );
    }

    /// Hook: the data of a text, comment, or processing-instruction node changed.
    pub fn notify_character_data_changed<T>(&self, tree: &T, node: NodeId, old_value: Option<&str>)
    where
        T: TreeView + ?Sized,
    {
        self.queue_mutation(
            tree,
            Mutation::CharacterData {
                target: node,
                old_value: old_value.map(str::to_owned),
            },
        );
    }

    /// Hook: children of `node` were inserted or removed.
    pub fn notify_child_list_changed<T>(
        &self,
        tree: &T,
        node: NodeId,
        added_nodes: &[NodeId],
        removed_nodes: &[NodeId],
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) where
        T: TreeView + ?Sized,
    {
        if added_nodes.is_empty() && removed_nodes.is_empty() {
            return;
        }
        self.queue_mutation(
            tree,
            Mutation::ChildList {
                target: node,
                added_nodes: added_nodes.to_vec(),
                removed_nodes: removed_nodes.to_vec(),
                previous_sibling,
                next_sibling,
            },
        );
    }

    pub(crate) fn queue_mutation<T>(&self, tree: &T, change: Mutation)
    where
        T: TreeView + ?Sized,
    {
        let interested = {
            let state = self.state();
            if state.registry.is_empty() {
                return;
            }
            let ancestors = inclusive_ancestors(tree, change.target());
            interested_observers(&state.registry, &ancestors, &change)
        };

        for (observer, old_value) in interested {
            let appended = {
                let mut state = self.state_mut();
                let Some(slot) = state.observers.get_mut(&observer) else {
                    continue;
                };
                slot.queue.push(&change, old_value)
            };
            trace!(
                target: "mutation",
                %observer,
                kind = change.mutation_type().as_str(),
                node = change.target(),
                appended,
                "queued mutation record"
            );
            self.ensure_notification_scheduled(observer);
        }
    }
}
