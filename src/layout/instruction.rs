//! Recorded instruction streams.

use std::fmt;
use std::ops::Range;

use super::{FragmentKind, LayoutContext, LayoutFragment, LayoutStats};
use crate::node::{NodeId, NodeRef};

/// One call on a [`LayoutContext`], detached from the sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    BeginEditing,
    EndEditing,
    Skip(usize),
    Delete(usize),
    InvalidateForward(usize),
    InvalidateBackward(usize),
    InsertText { text: String, owner: NodeId },
    InsertFragment { kind: FragmentKind, owner: NodeId },
    ParagraphStyle { owner: NodeId, range: Range<usize> },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginEditing => f.write_str("begin"),
            Self::EndEditing => f.write_str("end"),
            Self::Skip(n) => write!(f, "skip {n}"),
            Self::Delete(n) => write!(f, "delete {n}"),
            Self::InvalidateForward(n) => write!(f, "invalidate {n}"),
            Self::InvalidateBackward(n) => write!(f, "invalidate-back {n}"),
            Self::InsertText { text, .. } => write!(f, "insert {text:?}"),
            Self::InsertFragment { kind, .. } => match kind {
                FragmentKind::Equation { is_block: true } => f.write_str("fragment display-equation"),
                FragmentKind::Equation { is_block: false } => f.write_str("fragment equation"),
                FragmentKind::Fraction => f.write_str("fragment fraction"),
            },
            Self::ParagraphStyle { range, .. } => {
                write!(f, "paragraph {}..{}", range.start, range.end)
            }
        }
    }
}

/// A [`LayoutContext`] that only records what it is told.
#[derive(Clone, Debug, Default)]
pub struct RecordingContext {
    instructions: Vec<Instruction>,
}

impl RecordingContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Hand over the recorded instructions, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.instructions)
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
    }

    /// One instruction per line, without node ids.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.instructions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn stats(&self) -> LayoutStats {
        let mut stats = LayoutStats::default();
        for instruction in &self.instructions {
            stats.record(instruction);
        }
        stats
    }
}

impl LayoutContext for RecordingContext {
    fn begin_editing(&mut self) {
        self.instructions.push(Instruction::BeginEditing);
    }

    fn end_editing(&mut self) {
        self.instructions.push(Instruction::EndEditing);
    }

    fn skip_forward(&mut self, n: usize) {
        self.instructions.push(Instruction::Skip(n));
    }

    fn delete_forward(&mut self, n: usize) {
        self.instructions.push(Instruction::Delete(n));
    }

    fn invalidate_forward(&mut self, n: usize) {
        self.instructions.push(Instruction::InvalidateForward(n));
    }

    fn invalidate_backward(&mut self, n: usize) {
        self.instructions.push(Instruction::InvalidateBackward(n));
    }

    fn insert_text_forward(&mut self, text: &str, owner: &NodeRef) {
        self.instructions.push(Instruction::InsertText {
            text: text.to_string(),
            owner: owner.id(),
        });
    }

    fn insert_fragment(&mut self, fragment: LayoutFragment, owner: &NodeRef) {
        self.instructions.push(Instruction::InsertFragment {
            kind: fragment.kind,
            owner: owner.id(),
        });
    }

    fn add_paragraph_style(&mut self, owner: &NodeRef, range: Range<usize>) {
        self.instructions.push(Instruction::ParagraphStyle {
            owner: owner.id(),
            range,
        });
    }
}
