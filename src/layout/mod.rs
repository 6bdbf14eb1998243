//! The layout sink protocol.
//!
//! A [`LayoutContext`] is an externally owned view of the laid-out document
//! with a forward-moving cursor. The reconciler drives it with an ordered
//! stream of instructions between [`begin_editing`](LayoutContext::begin_editing)
//! and [`end_editing`](LayoutContext::end_editing):
//!
//! - `skip_forward(n)` keeps `n` units and moves past them
//! - `delete_forward(n)` removes `n` units after the cursor
//! - `insert_*` places new content at the cursor and moves past it
//! - `invalidate_forward(n)` keeps `n` units but marks their layout stale
//! - `invalidate_backward(n)` marks `n` units before the cursor stale
//! - `add_paragraph_style` annotates an absolute range behind the cursor
//!
//! Over one pass, skipped + invalidated + deleted equals the old length and
//! skipped + invalidated + inserted equals the new length.

mod instruction;
mod text;

pub use instruction::{Instruction, RecordingContext};
pub use text::TextLayoutContext;

use std::ops::Range;

use crate::node::{MathKind, NodeId, NodeRef};
use crate::version::VersionId;

/// The object replacement character standing in for a fragment in plain text.
pub const FRAGMENT_CHAR: char = '\u{FFFC}';

/// Receiver of reconciliation instructions.
pub trait LayoutContext {
    fn begin_editing(&mut self);
    fn end_editing(&mut self);
    fn skip_forward(&mut self, n: usize);
    fn delete_forward(&mut self, n: usize);
    fn invalidate_forward(&mut self, n: usize);
    fn invalidate_backward(&mut self, n: usize);
    fn insert_text_forward(&mut self, text: &str, owner: &NodeRef);
    fn insert_fragment(&mut self, fragment: LayoutFragment, owner: &NodeRef);
    fn add_paragraph_style(&mut self, owner: &NodeRef, range: Range<usize>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Equation { is_block: bool },
    Fraction,
}

impl From<MathKind> for FragmentKind {
    fn from(kind: MathKind) -> Self {
        match kind {
            MathKind::Equation { is_block } => Self::Equation { is_block },
            MathKind::Fraction => Self::Fraction,
        }
    }
}

/// An opaque unit of layout, one position wide.
///
/// The sink lays out `node` as it was at `version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutFragment {
    pub kind: FragmentKind,
    pub node: NodeRef,
    pub version: VersionId,
}

impl LayoutFragment {
    /// Fragment for a math node, or `None` for any other node.
    #[must_use]
    pub fn for_node(node: &NodeRef, version: VersionId) -> Option<Self> {
        node.math_kind().map(|kind| Self {
            kind: kind.into(),
            node: node.clone(),
            version,
        })
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Unit counts of one reconcile pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutStats {
    pub skipped: usize,
    pub inserted: usize,
    pub deleted: usize,
    pub invalidated: usize,
    pub instructions: usize,
}

impl LayoutStats {
    /// Length of the layout before the pass.
    #[must_use]
    pub const fn old_length(&self) -> usize {
        self.skipped + self.invalidated + self.deleted
    }

    /// Length of the layout after the pass.
    #[must_use]
    pub const fn new_length(&self) -> usize {
        self.skipped + self.invalidated + self.inserted
    }

    /// Whether the pass left the layout untouched.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.inserted == 0 && self.deleted == 0 && self.invalidated == 0
    }

    pub fn record(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::Skip(n) => self.skipped += n,
            Instruction::Delete(n) => self.deleted += n,
            Instruction::InvalidateForward(n) => self.invalidated += n,
            Instruction::InsertText { text, .. } => self.inserted += text.chars().count(),
            Instruction::InsertFragment { .. } => self.inserted += 1,
            Instruction::BeginEditing
            | Instruction::EndEditing
            | Instruction::InvalidateBackward(_)
            | Instruction::ParagraphStyle { .. } => {}
        }
        self.instructions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_for_math_only() {
        let equation = NodeRef::equation(true, vec![NodeRef::text("x")]);
        let fragment = LayoutFragment::for_node(&equation, VersionId::INITIAL);
        assert_eq!(
            fragment.map(|f| f.kind),
            Some(FragmentKind::Equation { is_block: true })
        );
        assert!(LayoutFragment::for_node(&NodeRef::text("x"), VersionId::INITIAL).is_none());
    }

    #[test]
    fn test_stats_lengths() {
        let mut stats = LayoutStats::default();
        stats.record(&Instruction::Skip(4));
        stats.record(&Instruction::Delete(2));
        stats.record(&Instruction::InvalidateForward(1));
        stats.record(&Instruction::InsertText {
            text: "héllo".to_string(),
            owner: NodeRef::text("").id(),
        });
        assert_eq!(stats.old_length(), 7);
        assert_eq!(stats.new_length(), 10);
        assert_eq!(stats.instructions, 4);
        assert!(!stats.is_noop());
    }
}
