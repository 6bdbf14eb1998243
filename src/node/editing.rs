//! Editing transactions.
//!
//! Every mutation happens between [`NodeRef::begin_editing`] and
//! [`NodeRef::end_editing`] on the mutated node. The first `begin` stamps the
//! node with the transaction version; nested `begin` calls on the same node
//! must use that same version and only bump a counter. When the outermost
//! bracket closes, the change is reported to the ancestors, each of which
//! records it in its nested rollup.

use std::ops::Deref;
use std::rc::Rc;

use super::{Content, NodeRef};
use crate::version::VersionId;

/// Closes an editing bracket when dropped.
///
/// Returned by [`NodeRef::edit`]; dereferences to the edited node.
#[must_use = "dropping the guard ends the edit immediately"]
pub struct EditGuard {
    node: NodeRef,
}

impl Deref for EditGuard {
    type Target = NodeRef;

    fn deref(&self) -> &NodeRef {
        &self.node
    }
}

impl Drop for EditGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            // Leave the tree as the panic found it; a second panic here
            // would abort.
            return;
        }
        self.node.end_editing();
    }
}

impl NodeRef {
    /// Open an editing bracket at `version`.
    ///
    /// # Panics
    ///
    /// Panics if the node is shared with another snapshot, if it is already
    /// being edited at a different version, or if `version` is older than the
    /// newest change in its subtree.
    pub fn begin_editing(&self, version: VersionId) {
        assert!(
            self.is_writable(),
            "node {} is shared with another snapshot; reach it through child_mut",
            self.id()
        );

        let mut node = self.node_mut();
        if node.editing_level > 0 {
            let stamped = node.own.last();
            assert!(
                version == stamped,
                "node {} is being edited at {stamped}, cannot re-enter at {version}",
                node.id
            );
            node.editing_level += 1;
            return;
        }

        let subtree = node.subtree_version();
        assert!(
            version >= subtree,
            "cannot edit node {} at {version}: its subtree changed at {subtree}",
            node.id
        );
        node.editing_level = 1;
        node.own.advance(version);
        node.content.advance_version(version);
        node.style = None;
    }

    /// Close an editing bracket. The outermost close reports the change to
    /// the ancestors.
    ///
    /// # Panics
    ///
    /// Panics if no bracket is open.
    pub fn end_editing(&self) {
        let (version, parent) = {
            let mut node = self.node_mut();
            assert!(
                node.editing_level > 0,
                "end_editing on node {} without a matching begin_editing",
                node.id
            );
            node.editing_level -= 1;
            if node.editing_level > 0 {
                return;
            }
            let parent = if node.owner.is_some() {
                Self::from_parent(&node.parent)
            } else {
                None
            };
            (node.own.last(), parent)
        };
        if let Some(parent) = parent {
            parent.propagate_nested_change(version);
        }
    }

    /// Open an editing bracket closed by the returned guard.
    pub fn edit(&self, version: VersionId) -> EditGuard {
        self.begin_editing(version);
        EditGuard { node: self.clone() }
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.node().editing_level > 0
    }

    /// Whether this node and every ancestor are exclusively owned by their
    /// containers, so that a write here is invisible to other snapshots.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        let mut current = self.clone();
        loop {
            let (owner, parent) = {
                let node = current.node();
                (node.owner, Self::from_parent(&node.parent))
            };
            let Some(owner) = owner else {
                return true;
            };
            let Some(parent) = parent else {
                return false;
            };
            if parent.node().slot_tag != owner {
                return false;
            }
            current = parent;
        }
    }

    /// Version mutations currently land at.
    pub(crate) fn assert_editing(&self, operation: &str) -> VersionId {
        let node = self.node();
        assert!(
            node.editing_level > 0,
            "{operation} on node {} outside an editing transaction",
            node.id
        );
        node.own.last()
    }

    pub(crate) fn propagate_nested_change(&self, version: VersionId) {
        let mut current = Some(self.clone());
        while let Some(node_ref) = current {
            let mut node = node_ref.node_mut();
            if node.nested.last() >= version {
                break;
            }
            node.nested.advance(version);
            current = if node.owner.is_some() {
                Self::from_parent(&node.parent)
            } else {
                None
            };
        }
    }

    /// Apply a length change to this element and its ancestors. Math nodes
    /// have a fixed length and absorb the delta.
    pub(crate) fn propagate_length_delta(&self, delta: isize, version: VersionId) {
        if delta == 0 {
            return;
        }
        let mut current = Some(self.clone());
        while let Some(node_ref) = current {
            let mut node = node_ref.node_mut();
            let Content::Element { data, .. } = &mut node.content else {
                break;
            };
            let data = Rc::make_mut(data);
            if version > data.length.current() {
                data.length.advance_version(version);
            }
            let length = data.length.value().saturating_add_signed(delta);
            data.length.set(length);
            current = if node.owner.is_some() {
                Self::from_parent(&node.parent)
            } else {
                None
            };
        }
    }

    /// Replace the text of a text node.
    ///
    /// # Panics
    ///
    /// Panics outside an editing transaction or on a non-text node.
    pub fn set_text(&self, text: &str) {
        let version = self.assert_editing("set_text");
        let (delta, parent) = {
            let mut node = self.node_mut();
            let id = node.id;
            let Content::Text(cell) = &mut node.content else {
                panic!("set_text on non-text node {id}");
            };
            let before = cell.value().chars().count();
            cell.set(Rc::from(text));
            let after = text.chars().count();
            let parent = if node.owner.is_some() {
                Self::from_parent(&node.parent)
            } else {
                None
            };
            (signed(after) - signed(before), parent)
        };
        if let Some(parent) = parent {
            parent.propagate_length_delta(delta, version);
        }
    }
}

pub(crate) fn signed(len: usize) -> isize {
    isize::try_from(len).unwrap_or(isize::MAX)
}
