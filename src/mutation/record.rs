use serde::{Deserialize, Serialize};

use super::NodeId;

/// Which kind of change a [`MutationRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

impl MutationType {
    /// The string exposed to script as `MutationRecord.type`.
    pub fn as_str(self) -> &'static str {
        match self {
            MutationType::Attributes => "attributes",
            MutationType::CharacterData => "characterData",
            MutationType::ChildList => "childList",
        }
    }
}

/// One observed change, delivered to exactly one observer.
///
/// Records are immutable once built; accessors mirror the read-only fields of
/// the script-facing `MutationRecord` interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRecord {
    mutation_type: MutationType,
    target: NodeId,
    attribute_name: Option<String>,
    attribute_namespace: Option<String>,
    old_value: Option<String>,
    added_nodes: Vec<NodeId>,
    removed_nodes: Vec<NodeId>,
    previous_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl MutationRecord {
    pub(crate) fn new(change: &Mutation, old_value: Option<String>) -> Self {
        match change {
            Mutation::Attribute {
                target,
                name,
                namespace,
                ..
            } => Self {
                mutation_type: MutationType::Attributes,
                target: *target,
                attribute_name: Some(name.clone()),
                attribute_namespace: namespace.clone(),
                old_value,
                added_nodes: Vec::new(),
                removed_nodes: Vec::new(),
                previous_sibling: None,
                next_sibling: None,
            },
            Mutation::CharacterData { target, .. } => Self {
                mutation_type: MutationType::CharacterData,
                target: *target,
                attribute_name: None,
                attribute_namespace: None,
                old_value,
                added_nodes: Vec::new(),
                removed_nodes: Vec::new(),
                previous_sibling: None,
                next_sibling: None,
            },
            Mutation::ChildList {
                target,
                added_nodes,
                removed_nodes,
                previous_sibling,
                next_sibling,
            } => Self {
                mutation_type: MutationType::ChildList,
                target: *target,
                attribute_name: None,
                attribute_namespace: None,
                old_value,
                added_nodes: added_nodes.clone(),
                removed_nodes: removed_nodes.clone(),
                previous_sibling: *previous_sibling,
                next_sibling: *next_sibling,
            },
        }
    }

    pub fn mutation_type(&self) -> MutationType {
        self.mutation_type
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute_name.as_deref()
    }

    pub fn attribute_namespace(&self) -> Option<&str> {
        self.attribute_namespace.as_deref()
    }

    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    pub fn added_nodes(&self) -> &[NodeId] {
        &self.added_nodes
    }

    pub fn removed_nodes(&self) -> &[NodeId] {
        &self.removed_nodes
    }

    pub fn previous_sibling(&self) -> Option<NodeId> {
        self.previous_sibling
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    /// Whether a later `change` should fold into this still-queued record
    /// instead of producing a record of its own.
    pub(crate) fn coalesces_with(&self, change: &Mutation) -> bool {
        match change {
            Mutation::Attribute {
                target,
                name,
                namespace,
                ..
            } => {
                self.mutation_type == MutationType::Attributes
                    && self.target == *target
                    && self.attribute_name.as_deref() == Some(name.as_str())
                    && self.attribute_namespace == *namespace
            }
            _ => false,
        }
    }
}

/// The data carried by a mutation hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Attribute {
        target: NodeId,
        name: String,
        namespace: Option<String>,
        old_value: Option<String>,
    },
    CharacterData {
        target: NodeId,
        old_value: Option<String>,
    },
    ChildList {
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    },
}

impl Mutation {
    pub fn target(&self) -> NodeId {
        match self {
            Mutation::Attribute { target, .. }
            | Mutation::CharacterData { target, .. }
            | Mutation::ChildList { target, .. } => *target,
        }
    }

    pub fn mutation_type(&self) -> MutationType {
        match self {
            Mutation::Attribute { .. } => MutationType::Attributes,
            Mutation::CharacterData { .. } => MutationType::CharacterData,
            Mutation::ChildList { .. } => MutationType::ChildList,
        }
    }

    pub(crate) fn old_value(&self) -> Option<&str> {
        match self {
            Mutation::Attribute { old_value, .. } | Mutation::CharacterData { old_value, .. } => {
                old_value.as_deref()
            }
            Mutation::ChildList { .. } => None,
        }
    }
}
