//! Children mutation and copy-on-write.

use std::ops::Range;
use std::rc::Rc;

use super::editing::signed;
use super::{Content, ElementData, NodeRef};
use crate::error::Error;
use crate::version::VersionId;

impl NodeRef {
    fn with_element_data<R>(&self, operation: &str, f: impl FnOnce(&mut ElementData) -> R) -> R {
        let mut node = self.node_mut();
        let node_type = node.content.node_type();
        match &mut node.content {
            Content::Element { data, .. } => f(Rc::make_mut(data)),
            _ => panic!("{operation}: {}", Error::NotAContainer(node_type)),
        }
    }

    /// Insert a detached node at `index`.
    ///
    /// # Panics
    ///
    /// Panics outside an editing transaction, if `index` exceeds the child
    /// count, or if `child` is attached elsewhere.
    pub fn insert_child(&self, index: usize, child: Self) {
        let version = self.assert_editing("insert_child");
        let count = self.child_count();
        assert!(
            index <= count,
            "insert index {index} out of range for {count} children"
        );
        child.attach_to(self);
        let delta = signed(child.len());
        self.with_element_data("insert_child", |data| {
            data.children.update(|children| children.insert(index, child));
        });
        self.propagate_length_delta(delta, version);
    }

    /// Append a detached node.
    pub fn push_child(&self, child: Self) {
        self.insert_child(self.child_count(), child);
    }

    /// Remove and return the child at `index`.
    ///
    /// # Panics
    ///
    /// Panics outside an editing transaction or if `index` is out of range.
    pub fn remove_child(&self, index: usize) -> Self {
        self.remove_subrange(index..index + 1)
            .pop()
            .unwrap_or_else(|| panic!("remove_child({index}) removed nothing"))
    }

    /// Remove and return the children in `range`.
    ///
    /// # Panics
    ///
    /// Panics outside an editing transaction or if `range` is out of bounds.
    pub fn remove_subrange(&self, range: Range<usize>) -> Vec<Self> {
        let version = self.assert_editing("remove_subrange");
        let count = self.child_count();
        assert!(
            range.start <= range.end && range.end <= count,
            "remove range {range:?} out of bounds for {count} children"
        );
        if range.is_empty() {
            return Vec::new();
        }
        let mut removed = Vec::with_capacity(range.len());
        self.with_element_data("remove_subrange", |data| {
            data.children.update(|children| removed.extend(children.drain(range)));
        });
        let delta: isize = removed.iter().map(|child| signed(child.len())).sum();
        for child in &removed {
            child.release_from(self);
        }
        self.propagate_length_delta(-delta, version);
        removed
    }

    /// Replace the child at `index` with a detached node, returning the
    /// previous occupant.
    ///
    /// # Panics
    ///
    /// Panics outside an editing transaction, if `index` is out of range, or
    /// if `child` is attached elsewhere.
    pub fn replace_child(&self, index: usize, child: Self) -> Self {
        let version = self.assert_editing("replace_child");
        let previous = self.child(index);
        child.attach_to(self);
        let delta = signed(child.len()) - signed(previous.len());
        self.with_element_data("replace_child", |data| {
            data.children.update(|children| children[index] = child);
        });
        previous.release_from(self);
        self.propagate_length_delta(delta, version);
        previous
    }

    /// Child `index`, copied into this container first if another snapshot
    /// still shares it.
    ///
    /// The copy keeps the child's id and history, so older versions read
    /// through it unchanged.
    ///
    /// # Panics
    ///
    /// Panics if this node is itself shared or `index` is out of range.
    pub fn child_mut(&self, index: usize) -> Self {
        assert!(
            self.is_writable(),
            "child_mut on node {} which is shared with another snapshot",
            self.id()
        );
        let child = self.child(index);
        if child.is_owned_by(self) {
            return child;
        }
        let copy = child.fork();
        copy.attach_to(self);
        self.with_element_data("child_mut", |data| {
            data.children.last_mut()[index] = copy.clone();
        });
        copy
    }

    /// Snapshot this subtree without copying any descendant.
    ///
    /// Only this node is duplicated: children storage is shared, while its
    /// version rollups and, for text nodes, the text history are cloned, so
    /// the cost grows with this node's retained history. The returned node
    /// is detached and shares every child with `self`.
    /// Neither side owns the shared children afterwards, so the first write
    /// through either side copies the touched path.
    ///
    /// # Panics
    ///
    /// Panics while the node is being edited.
    #[must_use]
    pub fn fork(&self) -> Self {
        let copy = {
            let mut node = self.node_mut();
            assert!(
                node.editing_level == 0,
                "cannot fork node {} during an edit",
                node.id
            );
            node.slot_tag = super::OwnerTag::fresh();
            node.shell_copy()
        };
        Self::wrap(copy)
    }

    /// Independent copy of this subtree as of `version`, with fresh ids and
    /// history rebased to [`VersionId::INITIAL`].
    #[must_use]
    pub fn clone_at(&self, version: VersionId) -> Self {
        self.clone_with(Some(version))
    }

    /// Independent copy of the latest content, with fresh ids.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        self.clone_with(None)
    }

    fn clone_with(&self, version: Option<VersionId>) -> Self {
        let node = self.node();
        match &node.content {
            Content::Text(cell) => {
                let text: &str = version.map_or_else(|| cell.value(), |v| cell.get(v));
                Self::text(text)
            }
            Content::Linebreak => Self::linebreak(),
            Content::Element { kind, data } => {
                let children = version.map_or_else(
                    || data.children.value(),
                    |v| data.children.get(v),
                );
                let cloned = children.iter().map(|c| c.clone_with(version)).collect();
                Self::element(*kind, cloned)
            }
            Content::Math { kind, components } => {
                let cloned = components.iter().map(|c| c.clone_with(version)).collect();
                Self::math(*kind, cloned)
            }
        }
    }
}
