//! Component slots of math nodes.

use std::rc::Rc;

use super::{Content, NodeRef};

impl NodeRef {
    /// Number of component slots; zero for non-math nodes.
    #[must_use]
    pub fn component_count(&self) -> usize {
        match &self.node().content {
            Content::Math { components, .. } => components.len(),
            _ => 0,
        }
    }

    /// Component `index`, without claiming ownership.
    ///
    /// # Panics
    ///
    /// Panics if this is not a math node or `index` is out of range.
    #[must_use]
    pub fn component(&self, index: usize) -> Self {
        let node = self.node();
        match &node.content {
            Content::Math { components, .. } => components.get(index).cloned().unwrap_or_else(|| {
                panic!(
                    "component {index} out of range for {} slots of node {}",
                    components.len(),
                    node.id
                )
            }),
            _ => panic!("node {} has no components", node.id),
        }
    }

    /// Component by slot name, e.g. `"numerator"`.
    #[must_use]
    pub fn component_named(&self, name: &str) -> Option<Self> {
        let kind = self.math_kind()?;
        let index = kind.component_names().iter().position(|n| *n == name)?;
        Some(self.component(index))
    }

    #[must_use]
    pub fn components(&self) -> Vec<Self> {
        match &self.node().content {
            Content::Math { components, .. } => components.to_vec(),
            _ => Vec::new(),
        }
    }

    /// Component `index`, copied into this node first if another snapshot
    /// still shares it.
    ///
    /// # Panics
    ///
    /// Panics if this node is shared or `index` is out of range.
    pub fn component_mut(&self, index: usize) -> Self {
        assert!(
            self.is_writable(),
            "component_mut on node {} which is shared with another snapshot",
            self.id()
        );
        let component = self.component(index);
        if component.is_owned_by(self) {
            return component;
        }
        let copy = component.fork();
        copy.attach_to(self);
        if let Content::Math { components, .. } = &mut self.node_mut().content {
            Rc::make_mut(components)[index] = copy.clone();
        }
        copy
    }
}
