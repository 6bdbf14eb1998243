//! History maintenance: compaction, rollback and invariant checks.

use std::collections::HashSet;
use std::rc::Rc;

use super::{Content, NodeRef};
use crate::error::{Error, Result};
use crate::version::VersionId;

impl NodeRef {
    /// Forget history older than `floor` throughout this subtree.
    ///
    /// Queries at `floor` and later return the same answers as before.
    /// Children reachable only through discarded entries are not visited.
    /// Nodes shared with other snapshots are compacted for all of them.
    pub fn drop_versions(&self, floor: VersionId) {
        let mut visited = HashSet::new();
        self.compact_into(floor, &mut visited);
    }

    fn compact_into(&self, floor: VersionId, visited: &mut HashSet<usize>) {
        if !visited.insert(self.addr()) {
            return;
        }
        let reachable: Vec<Self> = {
            let mut node = self.node_mut();
            node.own.drop_versions(floor);
            node.nested.drop_versions(floor);
            match &mut node.content {
                Content::Text(cell) => {
                    cell.drop_versions(floor);
                    Vec::new()
                }
                Content::Linebreak => Vec::new(),
                Content::Element { data, .. } => {
                    if data.children.floor() < floor || data.length.floor() < floor {
                        let data = Rc::make_mut(data);
                        data.children.drop_versions(floor);
                        data.length.drop_versions(floor);
                    }
                    data.children
                        .history()
                        .flat_map(|(_, children)| children.iter().cloned())
                        .collect()
                }
                Content::Math { components, .. } => components.to_vec(),
            }
        };
        for child in reachable {
            child.compact_into(floor, visited);
        }
    }

    /// Discard every change made after `target`, restoring the subtree to
    /// its state at `target`.
    ///
    /// Children that return are reattached and children that leave are
    /// severed. Shared descendants and returning children with later changes
    /// are copied before being rolled back, so other snapshots keep their
    /// view.
    ///
    /// # Panics
    ///
    /// Panics if the node is shared, is being edited, or `target` is below
    /// the retained history.
    pub fn rollback(&self, target: VersionId) {
        assert!(
            self.is_writable(),
            "rollback on node {} which is shared with another snapshot",
            self.id()
        );
        let departed = {
            let mut node = self.node_mut();
            assert!(
                node.editing_level == 0,
                "cannot roll back node {} during an edit",
                node.id
            );
            node.own.truncate_after(target);
            node.nested.truncate_after(target);
            node.style = None;
            match &mut node.content {
                Content::Text(cell) => {
                    cell.truncate_after(target);
                    Vec::new()
                }
                Content::Element { data, .. }
                    if data.children.current() > target || data.length.current() > target =>
                {
                    let data = Rc::make_mut(data);
                    let dropped: Vec<Self> = data
                        .children
                        .history()
                        .filter(|(version, _)| *version > target)
                        .flat_map(|(_, children)| children.iter().cloned())
                        .collect();
                    data.children.truncate_after(target);
                    data.length.truncate_after(target);
                    let kept = data.children.value();
                    dropped
                        .into_iter()
                        .filter(|child| !kept.contains(child))
                        .collect()
                }
                _ => Vec::new(),
            }
        };

        for child in &departed {
            child.release_from(self);
        }
        // A returning child with later changes may still be read through
        // other snapshots; leave it detached so child_mut copies it below.
        for child in self.children() {
            if !child.is_attached() && child.subtree_version() <= target {
                child.attach_to(self);
            }
        }
        for index in 0..self.child_count() {
            if self.child(index).subtree_version() > target {
                self.child_mut(index).rollback(target);
            }
        }
        for index in 0..self.component_count() {
            if self.component(index).subtree_version() > target {
                self.component_mut(index).rollback(target);
            }
        }
    }

    /// Verify the structural invariants of this subtree at the latest
    /// version: element lengths equal the sum of their children, owned
    /// children point back at their container, no child is newer than its
    /// container, and no bracket is left open.
    pub fn check_invariants(&self) -> Result<()> {
        let node = self.node();
        if node.editing_level > 0 {
            return Err(Error::InvariantViolation(format!(
                "node {} is still being edited",
                node.id
            )));
        }
        let children: &[Self] = match &node.content {
            Content::Element { data, .. } => {
                let children = data.children.value();
                let total: usize = children.iter().map(Self::len).sum();
                let recorded = *data.length.value();
                if total != recorded {
                    return Err(Error::InvariantViolation(format!(
                        "node {} records length {recorded} but its children sum to {total}",
                        node.id
                    )));
                }
                children.as_slice()
            }
            Content::Math { components, .. } => components.as_slice(),
            Content::Text(_) | Content::Linebreak => &[],
        };

        let version = node.subtree_version();
        for child in children {
            if child.node().owner == Some(node.slot_tag)
                && !child.parent().is_some_and(|parent| parent == *self)
            {
                return Err(Error::InvariantViolation(format!(
                    "child {} of node {} has a stale parent link",
                    child.id(),
                    node.id
                )));
            }
            let child_version = child.subtree_version();
            if child_version > version {
                return Err(Error::InvariantViolation(format!(
                    "child {} changed at {child_version} after node {} at {version}",
                    child.id(),
                    node.id
                )));
            }
            child.check_invariants()?;
        }
        Ok(())
    }
}
