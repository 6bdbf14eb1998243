//! Tree reconciliation over versioned node views.

use std::collections::HashMap;

use super::{LayoutPass, Newline, Reconcilable, reconcile_forward};
use crate::layout::{LayoutContext, LayoutFragment};
use crate::node::{NodeId, NodeRef, NodeType};
use crate::version::VersionId;

/// A node as it was at one version.
#[derive(Clone, Debug)]
pub struct NodeView {
    pub node: NodeRef,
    pub version: VersionId,
}

impl NodeView {
    #[must_use]
    pub const fn new(node: NodeRef, version: VersionId) -> Self {
        Self { node, version }
    }

    /// Whether both views show the same logical node.
    #[must_use]
    pub fn same_node(&self, other: &Self) -> bool {
        self.node.id() == other.node.id() && self.node.node_type() == other.node.node_type()
    }

    #[must_use]
    pub fn stamp(&self) -> Option<VersionId> {
        self.node.stamp_at(self.version)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.node.len_at(self.version)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn children(&self) -> Vec<Self> {
        self.node
            .children_at(self.version)
            .into_iter()
            .map(|child| Self::new(child, self.version))
            .collect()
    }
}

/// Views are equal when they show the same node with the same stamp.
///
/// Equal stamps imply identical content only while at most one side keeps
/// editing: a fork passed as `old` must stay read-only, or a fork and the
/// live tree edited at the same version number would compare equal.
impl PartialEq for NodeView {
    fn eq(&self, other: &Self) -> bool {
        self.same_node(other)
            && match (self.stamp(), other.stamp()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    }
}

impl Reconcilable for NodeView {
    fn layout_length(&self) -> usize {
        self.len()
    }

    fn insert_forward(&self, pass: &mut LayoutPass<'_>, _owner: &NodeRef) {
        insert_node(self, pass);
    }
}

/// Lay out `view` from scratch at the cursor.
pub fn insert_node(view: &NodeView, pass: &mut LayoutPass<'_>) {
    let node = &view.node;
    match node.node_type() {
        NodeType::Text => {
            if let Some(text) = node.text_at(view.version) {
                pass.insert_text_forward(&text, node);
            }
        }
        NodeType::Linebreak => Newline.insert_forward(pass, node),
        NodeType::Equation | NodeType::Fraction => {
            if let Some(fragment) = LayoutFragment::for_node(node, view.version) {
                pass.insert_fragment(fragment, node);
            }
        }
        _ => {
            let start = pass.cursor();
            for child in view.children() {
                insert_node(&child, pass);
            }
            if node.is_block() {
                pass.add_paragraph_style(node, start..pass.cursor());
            }
        }
    }
}

/// Reconcile `new` against `old` at the cursor and return the number of
/// positions `new` occupies.
pub fn reconcile_node(old: &NodeView, new: &NodeView, pass: &mut LayoutPass<'_>) -> usize {
    if old == new || !old.same_node(new) {
        return reconcile_forward(Some(old), Some(new), pass, &new.node);
    }

    let node = &new.node;
    match node.node_type() {
        NodeType::Text => {
            let before = old.node.text_at(old.version).unwrap_or_default();
            let after = node.text_at(new.version).unwrap_or_default();
            reconcile_forward(Some(&*before), Some(&*after), pass, node)
        }
        NodeType::Linebreak => reconcile_forward(Some(&Newline), Some(&Newline), pass, node),
        NodeType::Equation | NodeType::Fraction => {
            pass.invalidate_forward(1);
            1
        }
        _ => reconcile_children(old, new, pass),
    }
}

fn reconcile_children(old: &NodeView, new: &NodeView, pass: &mut LayoutPass<'_>) -> usize {
    let start = pass.cursor();
    let old_children = old.children();
    let new_children = new.children();
    let pairing = pair_children(&old_children, &new_children);

    let bounds = upcoming_matches(&pairing, old_children.len());

    let mut next_old = 0;
    for ((child, matched), bound) in new_children.iter().zip(pairing).zip(bounds) {
        for departed in &old_children[next_old..bound.max(next_old)] {
            reconcile_forward(Some(departed), None, pass, &new.node);
        }
        next_old = next_old.max(bound);
        match matched {
            Some(index) => {
                reconcile_node(&old_children[index], child, pass);
                next_old = index + 1;
            }
            None => {
                reconcile_forward(None, Some(child), pass, &child.node);
            }
        }
    }
    for departed in &old_children[next_old..] {
        reconcile_forward(Some(departed), None, pass, &new.node);
    }

    if new.node.is_block() {
        pass.add_paragraph_style(&new.node, start..pass.cursor());
    }
    pass.cursor() - start
}

/// For each new child, the index of the old child it continues, if any.
///
/// Matching is by node id, greedy and order preserving: a child moved
/// backwards is treated as deleted and reinserted.
fn pair_children(old: &[NodeView], new: &[NodeView]) -> Vec<Option<usize>> {
    let mut positions: HashMap<NodeId, Vec<usize>> = HashMap::new();
    for (index, child) in old.iter().enumerate() {
        positions.entry(child.node.id()).or_default().push(index);
    }

    let mut next = 0;
    new.iter()
        .map(|child| {
            let candidates = positions.get(&child.node.id())?;
            let at = candidates.partition_point(|&index| index < next);
            let index = *candidates.get(at)?;
            next = index + 1;
            Some(index)
        })
        .collect()
}

/// For each new child, the old index of the next matched child at or after
/// it. Old children before that index are gone and get deleted first.
fn upcoming_matches(pairing: &[Option<usize>], old_len: usize) -> Vec<usize> {
    let mut bound = old_len;
    let mut bounds: Vec<usize> = pairing
        .iter()
        .rev()
        .map(|matched| {
            if let Some(index) = matched {
                bound = *index;
            }
            bound
        })
        .collect();
    bounds.reverse();
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{RecordingContext, TextLayoutContext};
    use crate::reconcile::reconcile;

    const V0: VersionId = VersionId::INITIAL;

    fn sample() -> NodeRef {
        NodeRef::root(vec![
            NodeRef::heading(
                1,
                vec![
                    NodeRef::text("The "),
                    NodeRef::emphasis(vec![NodeRef::text("quick ")]),
                ],
            ),
            NodeRef::paragraph(vec![NodeRef::text("brown ")]),
        ])
    }

    fn render(root: &NodeRef, version: VersionId) -> TextLayoutContext {
        let mut ctx = TextLayoutContext::new();
        reconcile(None, &NodeView::new(root.clone(), version), &mut ctx);
        ctx
    }

    #[test]
    fn test_fresh_layout() {
        let root = sample();
        let mut recorder = RecordingContext::new();
        reconcile(None, &NodeView::new(root, V0), &mut recorder);
        assert_eq!(
            recorder.transcript(),
            "begin\ninsert \"The \"\ninsert \"quick \"\nparagraph 0..10\ninsert \"brown \"\nparagraph 10..16\nend"
        );
    }

    #[test]
    fn test_text_replacement_in_heading() {
        let root = sample();
        let v1 = V0.next();
        {
            let _root = root.edit(v1);
            let heading = root.child_mut(0);
            let _heading = heading.edit(v1);
            heading.replace_child(0, NodeRef::text("A "));
        }

        let mut ctx = render(&root, V0);
        let mut recorder = RecordingContext::new();
        let stats = reconcile(
            Some(&NodeView::new(root.clone(), V0)),
            &NodeView::new(root.clone(), v1),
            &mut recorder,
        );
        assert_eq!(
            recorder.transcript(),
            "begin\ndelete 4\ninsert \"A \"\nskip 6\nparagraph 0..8\nskip 6\nend"
        );
        assert_eq!(stats.old_length(), 16);
        assert_eq!(stats.new_length(), 14);

        ctx.replay(recorder.instructions());
        assert_eq!(ctx.text(), "A quick brown ");
    }

    #[test]
    fn test_same_text_node_edited_in_place() {
        let root = sample();
        let v1 = V0.next();
        let paragraph = root.child(1);
        let text = paragraph.child(0);
        {
            let _root = root.edit(v1);
            let _paragraph = paragraph.edit(v1);
            let _text = text.edit(v1);
            text.set_text("red ");
        }

        let mut recorder = RecordingContext::new();
        reconcile(
            Some(&NodeView::new(root.clone(), V0)),
            &NodeView::new(root, v1),
            &mut recorder,
        );
        assert_eq!(
            recorder.transcript(),
            "begin\nskip 10\ndelete 6\ninsert \"red \"\nparagraph 10..14\nend"
        );
    }

    #[test]
    fn test_math_change_invalidates_fragment() {
        let equation = NodeRef::equation(false, vec![NodeRef::text("x")]);
        let root = NodeRef::root(vec![NodeRef::paragraph(vec![NodeRef::text("a"), equation])]);
        let v1 = V0.next();
        {
            let _root = root.edit(v1);
            let paragraph = root.child_mut(0);
            let _paragraph = paragraph.edit(v1);
            let math = paragraph.child_mut(1);
            let row = math.component_mut(0);
            let _row = row.edit(v1);
            let x = row.child_mut(0);
            let _x = x.edit(v1);
            x.set_text("y");
        }

        let mut recorder = RecordingContext::new();
        let stats = reconcile(
            Some(&NodeView::new(root.clone(), V0)),
            &NodeView::new(root, v1),
            &mut recorder,
        );
        assert_eq!(
            recorder.transcript(),
            "begin\nskip 1\ninvalidate 1\nparagraph 0..2\nend"
        );
        assert_eq!(stats.invalidated, 1);
    }

    #[test]
    fn test_removed_and_inserted_children() {
        let root = sample();
        let v1 = V0.next();
        {
            let _root = root.edit(v1);
            root.remove_child(0);
            root.push_child(NodeRef::paragraph(vec![
                NodeRef::text("fox"),
                NodeRef::linebreak(),
            ]));
        }

        let mut ctx = render(&root, V0);
        let mut recorder = RecordingContext::new();
        reconcile(
            Some(&NodeView::new(root.clone(), V0)),
            &NodeView::new(root.clone(), v1),
            &mut recorder,
        );
        assert_eq!(
            recorder.transcript(),
            "begin\ndelete 10\nskip 6\ninsert \"fox\"\ninsert \"\\n\"\nparagraph 6..10\nend"
        );
        ctx.replay(recorder.instructions());
        assert_eq!(ctx.text(), "brown fox\n");
        assert_eq!(ctx.paragraph_styles().len(), 2);
    }

    #[test]
    fn test_pairing_is_order_preserving() {
        let a = NodeRef::text("a");
        let b = NodeRef::text("b");
        let c = NodeRef::text("c");
        let old: Vec<NodeView> = [&a, &b, &c]
            .into_iter()
            .map(|n| NodeView::new(n.clone(), V0))
            .collect();
        let new: Vec<NodeView> = [&c, &a, &b]
            .into_iter()
            .map(|n| NodeView::new(n.clone(), V0))
            .collect();
        let pairing = pair_children(&old, &new);
        assert_eq!(pairing, vec![Some(2), None, None]);
        assert_eq!(upcoming_matches(&pairing, 3), vec![2, 3, 3]);
    }

    #[test]
    fn test_unrelated_roots_replace() {
        let old = NodeRef::root(vec![NodeRef::text("old")]);
        let new = NodeRef::root(vec![NodeRef::text("new!")]);
        let mut recorder = RecordingContext::new();
        let stats = reconcile(
            Some(&NodeView::new(old, V0)),
            &NodeView::new(new, V0),
            &mut recorder,
        );
        assert_eq!(recorder.transcript(), "begin\ndelete 3\ninsert \"new!\"\nend");
        assert_eq!(stats.new_length(), 4);
    }
}
