use thiserror::Error;

use crate::mutation::{MutationEngine, NodeId, TreeView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        tag_name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
    Comment(String),
}

impl NodeData {
    fn can_have_children(&self) -> bool {
        matches!(self, NodeData::Document | NodeData::Element { .. })
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0} is not a character data node")]
    NotCharacterData(NodeId),
    #[error("node {child} cannot be inserted into node {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}

/// Arena-backed document tree that reports every change to its
/// [`MutationEngine`] after the change has been applied.
pub struct Document {
    nodes: Vec<Node>,
    mutations: MutationEngine,
}

impl TreeView for Document {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        Document::parent(self, node)
    }
}

impl Document {
    pub fn new(mutations: MutationEngine) -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            mutations,
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn mutations(&self) -> &MutationEngine {
        &self.mutations
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.allocate(NodeData::Element {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text_node(&mut self, data: &str) -> NodeId {
        self.allocate(NodeData::Text(data.to_string()))
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.allocate(NodeData::Comment(data.to_string()))
    }

    fn allocate(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        self.nodes.len() - 1
    }

    // Reads

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|entry| entry.parent)
    }

    pub fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node).map(|entry| &entry.data)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match self.data(node)? {
            NodeData::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get_attribute_ns(node, None, name)
    }

    pub fn get_attribute_ns(&self, node: NodeId, namespace: Option<&str>, name: &str) -> Option<&str> {
        match self.data(node)? {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|attr| attr.namespace.as_deref() == namespace && attr.name == name)
                .map(|attr| attr.value.as_str()),
            _ => None,
        }
    }

    /// Data of a text or comment node.
    pub fn character_data(&self, node: NodeId) -> Option<&str> {
        match self.data(node)? {
            NodeData::Text(data) | NodeData::Comment(data) => Some(data),
            _ => None,
        }
    }

    pub fn text_content(&self, node: NodeId) -> Option<String> {
        match self.data(node)? {
            NodeData::Text(data) | NodeData::Comment(data) => Some(data.clone()),
            NodeData::Document | NodeData::Element { .. } => {
                let mut out = String::new();
                self.collect_text(node, &mut out);
                Some(out)
            }
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        for &child in self.children(node) {
            match self.data(child) {
                Some(NodeData::Text(data)) => out.push_str(data),
                Some(NodeData::Element { .. }) => self.collect_text(child, out),
                _ => {}
            }
        }
    }

    // Attributes

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.set_attribute_ns(node, None, name, value)
    }

    pub fn set_attribute_ns(
        &mut self,
        node: NodeId,
        namespace: Option<&str>,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        let attributes = self.attributes_mut(node)?;
        let old_value = match attributes
            .iter_mut()
            .find(|attr| attr.namespace.as_deref() == namespace && attr.name == name)
        {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value.to_string())),
            None => {
                attributes.push(Attribute {
                    namespace: namespace.map(str::to_owned),
                    name: name.to_string(),
                    value: value.to_string(),
                });
                None
            }
        };

        self.mutations
            .notify_attribute_changed(&*self, node, name, namespace, old_value.as_deref());
        Ok(())
    }

    /// Remove an attribute; removing one that is not present changes nothing.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.remove_attribute_ns(node, None, name)
    }

    pub fn remove_attribute_ns(
        &mut self,
        node: NodeId,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<(), DomError> {
        let attributes = self.attributes_mut(node)?;
        let Some(index) = attributes
            .iter()
            .position(|attr| attr.namespace.as_deref() == namespace && attr.name == name)
        else {
            return Ok(());
        };
        let removed = attributes.remove(index);

        self.mutations
            .notify_attribute_changed(&*self, node, name, namespace, Some(removed.value.as_str()));
        Ok(())
    }

    fn attributes_mut(&mut self, node: NodeId) -> Result<&mut Vec<Attribute>, DomError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomError::NotAnElement(node)),
        }
    }

    // Character data

    pub fn set_data(&mut self, node: NodeId, data: &str) -> Result<(), DomError> {
        let slot = self.character_data_mut(node)?;
        let old_value = std::mem::replace(slot, data.to_string());
        self.mutations
            .notify_character_data_changed(&*self, node, Some(old_value.as_str()));
        Ok(())
    }

    pub fn append_data(&mut self, node: NodeId, data: &str) -> Result<(), DomError> {
        let slot = self.character_data_mut(node)?;
        let old_value = slot.clone();
        slot.push_str(data);
        self.mutations
            .notify_character_data_changed(&*self, node, Some(old_value.as_str()));
        Ok(())
    }

    fn character_data_mut(&mut self, node: NodeId) -> Result<&mut String, DomError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(data) | NodeData::Comment(data) => Ok(data),
            _ => Err(DomError::NotCharacterData(node)),
        }
    }

    // Children

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or last). A child that already has
    /// a parent is removed from it first, which is reported separately.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.ensure_insertable(parent, child)?;
        if let Some(reference) = reference {
            self.ensure_child_of(parent, reference)?;
        }

        let mut reference = reference;
        if reference == Some(child) {
            reference = self.next_sibling(child);
        }

        if let Some(old_parent) = self.nodes[child].parent {
            self.remove_child(old_parent, child)?;
        }

        let index = match reference {
            Some(reference) => self.index_in_parent(parent, reference)?,
            None => self.nodes[parent].children.len(),
        };
        let previous_sibling = index
            .checked_sub(1)
            .map(|prev| self.nodes[parent].children[prev]);

        self.nodes[parent].children.insert(index, child);
        self.nodes[child].parent = Some(parent);

        self.mutations
            .notify_child_list_changed(&*self, parent, &[child], &[], previous_sibling, reference);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.ensure_child_of(parent, child)?;
        let index = self.index_in_parent(parent, child)?;
        let previous_sibling = self.previous_sibling(child);
        let next_sibling = self.next_sibling(child);

        self.nodes[parent].children.remove(index);
        self.nodes[child].parent = None;

        self.mutations
            .notify_child_list_changed(&*self, parent, &[], &[child], previous_sibling, next_sibling);
        Ok(())
    }

    /// Replace `old_child` with `new_child`, reported as one record carrying
    /// both the added and the removed node.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<(), DomError> {
        self.ensure_insertable(parent, new_child)?;
        self.ensure_child_of(parent, old_child)?;
        if new_child == old_child {
            return Ok(());
        }

        let mut next_sibling = self.next_sibling(old_child);
        if next_sibling == Some(new_child) {
            next_sibling = self.next_sibling(new_child);
        }
        let mut previous_sibling = self.previous_sibling(old_child);
        if previous_sibling == Some(new_child) {
            previous_sibling = self.previous_sibling(new_child);
        }

        if let Some(old_parent) = self.nodes[new_child].parent {
            self.remove_child(old_parent, new_child)?;
        }

        let index = self.index_in_parent(parent, old_child)?;
        self.nodes[parent].children[index] = new_child;
        self.nodes[old_child].parent = None;
        self.nodes[new_child].parent = Some(parent);

        self.mutations.notify_child_list_changed(
            &*self,
            parent,
            &[new_child],
            &[old_child],
            previous_sibling,
            next_sibling,
        );
        Ok(())
    }

    /// Replace all children of an element with a single text node, or set
    /// the data of a character data node.
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        if matches!(
            self.node(node)?.data,
            NodeData::Text(_) | NodeData::Comment(_)
        ) {
            return self.set_data(node, text);
        }

        let removed = std::mem::take(&mut self.nodes[node].children);
        for &child in &removed {
            self.nodes[child].parent = None;
        }

        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.create_text_node(text);
            self.nodes[node].children.push(text_node);
            self.nodes[text_node].parent = Some(node);
            added.push(text_node);
        }

        self.mutations
            .notify_child_list_changed(&*self, node, &added, &removed, None, None);
        Ok(())
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&entry| entry == node)?;
        index.checked_sub(1).map(|prev| siblings[prev])
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&entry| entry == node)?;
        siblings.get(index + 1).copied()
    }

    fn node(&self, node: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(node).ok_or(DomError::UnknownNode(node))
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(node).ok_or(DomError::UnknownNode(node))
    }

    fn index_in_parent(&self, parent: NodeId, child: NodeId) -> Result<usize, DomError> {
        self.children(parent)
            .iter()
            .position(|&entry| entry == child)
            .ok_or(DomError::NotAChild { parent, child })
    }

    fn ensure_child_of(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(child)?;
        if self.nodes[child].parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        Ok(())
    }

    fn ensure_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if !parent_node.data.can_have_children() || matches!(child_node.data, NodeData::Document) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        let mut current = Some(parent);
        while let Some(node) = current {
            if node == child {
                return Err(DomError::HierarchyRequest { parent, child });
            }
            current = self.nodes[node].parent;
        }
        Ok(())
    }
}
