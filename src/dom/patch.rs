use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tree::{Document, DomError};
use crate::mutation::NodeId;

/// Handle that always names the document root.
pub const DOCUMENT_HANDLE: &str = "document";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomPatch {
    TextContent {
        handle: String,
        value: String,
    },
    CharacterData {
        handle: String,
        value: String,
    },
    Attribute {
        handle: String,
        name: String,
        value: String,
    },
    AttributeNs {
        handle: String,
        namespace: String,
        name: String,
        value: String,
    },
    RemoveAttribute {
        handle: String,
        name: String,
    },
    CreateElement {
        result_handle: String,
        tag_name: String,
    },
    CreateTextNode {
        result_handle: String,
        data: String,
    },
    CreateComment {
        result_handle: String,
        data: String,
    },
    AppendChild {
        parent_handle: String,
        child_handle: String,
    },
    InsertBefore {
        parent_handle: String,
        new_handle: String,
        reference_handle: Option<String>,
    },
    RemoveChild {
        parent_handle: String,
        child_handle: String,
    },
    ReplaceChild {
        parent_handle: String,
        new_handle: String,
        old_handle: String,
    },
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("unknown handle '{0}'")]
    UnknownHandle(String),
    #[error("handle '{0}' is already bound")]
    DuplicateHandle(String),
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Two-way mapping between script-visible handles and node ids.
#[derive(Debug, Default)]
pub struct HandleMap {
    node_id_map: HashMap<String, NodeId>,
    node_handle_map: HashMap<NodeId, String>,
}

impl HandleMap {
    pub fn new(document: &Document) -> Self {
        let mut handles = Self::default();
        handles.remember_handle(DOCUMENT_HANDLE, document.root());
        handles
    }

    fn remember_handle(&mut self, handle: &str, node_id: NodeId) {
        let handle_string = handle.to_string();
        self.node_id_map.insert(handle_string.clone(), node_id);
        self.node_handle_map.insert(node_id, handle_string);
    }

    fn ensure_unbound(&self, handle: &str) -> Result<(), PatchError> {
        if self.node_id_map.contains_key(handle) {
            return Err(PatchError::DuplicateHandle(handle.to_string()));
        }
        Ok(())
    }

    pub fn resolve_handle(&self, handle: &str) -> Result<NodeId, PatchError> {
        self.node_id_map
            .get(handle)
            .copied()
            .ok_or_else(|| PatchError::UnknownHandle(handle.to_string()))
    }

    /// Handle for `node_id`; nodes created implicitly (for example by
    /// `text_content`) are named by their id.
    pub fn public_handle_for(&self, node_id: NodeId) -> String {
        self.node_handle_map
            .get(&node_id)
            .cloned()
            .unwrap_or_else(|| node_id.to_string())
    }
}

/// Apply one patch to `document`, resolving and binding handles through `handles`.
pub fn apply_patch(
    document: &mut Document,
    handles: &mut HandleMap,
    patch: &DomPatch,
) -> Result<(), PatchError> {
    match patch {
        DomPatch::TextContent { handle, value } => {
            let node = handles.resolve_handle(handle)?;
            document.set_text_content(node, value)?;
        }
        DomPatch::CharacterData { handle, value } => {
            let node = handles.resolve_handle(handle)?;
            document.set_data(node, value)?;
        }
        DomPatch::Attribute {
            handle,
            name,
            value,
        } => {
            let node = handles.resolve_handle(handle)?;
            document.set_attribute(node, name, value)?;
        }
        DomPatch::AttributeNs {
            handle,
            namespace,
            name,
            value,
        } => {
            let node = handles.resolve_handle(handle)?;
            document.set_attribute_ns(node, Some(namespace.as_str()), name, value)?;
        }
        DomPatch::RemoveAttribute { handle, name } => {
            let node = handles.resolve_handle(handle)?;
            document.remove_attribute(node, name)?;
        }
        DomPatch::CreateElement {
            result_handle,
            tag_name,
        } => {
            handles.ensure_unbound(result_handle)?;
            let node = document.create_element(tag_name);
            handles.remember_handle(result_handle, node);
        }
        DomPatch::CreateTextNode {
            result_handle,
            data,
        } => {
            handles.ensure_unbound(result_handle)?;
            let node = document.create_text_node(data);
            handles.remember_handle(result_handle, node);
        }
        DomPatch::CreateComment {
            result_handle,
            data,
        } => {
            handles.ensure_unbound(result_handle)?;
            let node = document.create_comment(data);
            handles.remember_handle(result_handle, node);
        }
        DomPatch::AppendChild {
            parent_handle,
            child_handle,
        } => {
            let parent = handles.resolve_handle(parent_handle)?;
            let child = handles.resolve_handle(child_handle)?;
            document.append_child(parent, child)?;
        }
        DomPatch::InsertBefore {
            parent_handle,
            new_handle,
            reference_handle,
        } => {
            let parent = handles.resolve_handle(parent_handle)?;
            let child = handles.resolve_handle(new_handle)?;
            let reference = reference_handle
                .as_deref()
                .map(|handle| handles.resolve_handle(handle))
                .transpose()?;
            document.insert_before(parent, child, reference)?;
        }
        DomPatch::RemoveChild {
            parent_handle,
            child_handle,
        } => {
            let parent = handles.resolve_handle(parent_handle)?;
            let child = handles.resolve_handle(child_handle)?;
            document.remove_child(parent, child)?;
        }
        DomPatch::ReplaceChild {
            parent_handle,
            new_handle,
            old_handle,
        } => {
            let parent = handles.resolve_handle(parent_handle)?;
            let new_child = handles.resolve_handle(new_handle)?;
            let old_child = handles.resolve_handle(old_handle)?;
            document.replace_child(parent, new_child, old_child)?;
        }
    }
    Ok(())
}
