//! Plain-text materialization of an instruction stream.

use std::ops::Range;

use ropey::Rope;

use super::{FRAGMENT_CHAR, Instruction, LayoutContext, LayoutFragment};
use crate::node::{NodeId, NodeRef};

/// A [`LayoutContext`] that keeps the laid-out document as text in a rope.
///
/// Fragments become [`FRAGMENT_CHAR`]. Paragraph styles are kept as ranges
/// that move with the text around them. The context enforces the protocol:
/// instructions outside a bracket, moves past the end, or a pass that does not
/// end at the end of the text are bugs in the driver and panic.
#[derive(Clone, Debug, Default)]
pub struct TextLayoutContext {
    rope: Rope,
    cursor: usize,
    editing: bool,
    paragraphs: Vec<(NodeId, Range<usize>)>,
    invalidated: Vec<Range<usize>>,
    passes: usize,
}

impl TextLayoutContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing materialization.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    #[must_use]
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    #[must_use]
    pub fn line(&self, index: usize) -> Option<String> {
        (index < self.rope.len_lines()).then(|| self.rope.line(index).to_string())
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of completed passes.
    #[must_use]
    pub const fn passes(&self) -> usize {
        self.passes
    }

    /// Paragraph ranges, ordered by start.
    #[must_use]
    pub fn paragraph_styles(&self) -> Vec<(NodeId, Range<usize>)> {
        let mut styles = self.paragraphs.clone();
        styles.sort_by_key(|(_, range)| (range.start, range.end));
        styles
    }

    /// Ranges marked stale during the last pass.
    #[must_use]
    pub fn invalidated(&self) -> &[Range<usize>] {
        &self.invalidated
    }

    /// Replay a recorded instruction. Owners are not needed to materialize
    /// text, so recorded ids stand in for them.
    pub fn apply(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::BeginEditing => LayoutContext::begin_editing(self),
            Instruction::EndEditing => LayoutContext::end_editing(self),
            Instruction::Skip(n) => self.skip_forward(*n),
            Instruction::Delete(n) => self.delete_forward(*n),
            Instruction::InvalidateForward(n) => self.invalidate_forward(*n),
            Instruction::InvalidateBackward(n) => self.invalidate_backward(*n),
            Instruction::InsertText { text, .. } => self.insert_at_cursor(text),
            Instruction::InsertFragment { .. } => {
                self.insert_at_cursor(FRAGMENT_CHAR.encode_utf8(&mut [0; 4]));
            }
            Instruction::ParagraphStyle { owner, range } => {
                self.set_paragraph(*owner, range.clone());
            }
        }
    }

    /// Replay a whole stream.
    pub fn replay<'a>(&mut self, instructions: impl IntoIterator<Item = &'a Instruction>) {
        for instruction in instructions {
            self.apply(instruction);
        }
    }

    fn assert_editing(&self, operation: &str) {
        assert!(self.editing, "{operation} outside begin_editing/end_editing");
    }

    fn assert_room(&self, operation: &str, n: usize) {
        let len = self.rope.len_chars();
        assert!(
            self.cursor + n <= len,
            "{operation} {n} at {} runs past the end ({len})",
            self.cursor
        );
    }

    fn insert_at_cursor(&mut self, text: &str) {
        self.assert_editing("insert");
        let n = text.chars().count();
        if n == 0 {
            return;
        }
        let at = self.cursor;
        self.rope.insert(at, text);
        for (_, range) in &mut self.paragraphs {
            if range.start >= at {
                range.start += n;
                range.end += n;
            } else if range.end > at {
                range.end += n;
            }
        }
        self.cursor += n;
    }

    fn set_paragraph(&mut self, owner: NodeId, range: Range<usize>) {
        self.assert_editing("add_paragraph_style");
        assert!(
            range.start <= range.end && range.end <= self.cursor,
            "paragraph range {range:?} is not behind the cursor at {}",
            self.cursor
        );
        self.paragraphs.retain(|(id, _)| *id != owner);
        self.paragraphs.push((owner, range));
    }
}

impl LayoutContext for TextLayoutContext {
    fn begin_editing(&mut self) {
        assert!(!self.editing, "begin_editing while a pass is open");
        self.editing = true;
        self.cursor = 0;
        self.invalidated.clear();
    }

    fn end_editing(&mut self) {
        self.assert_editing("end_editing");
        let len = self.rope.len_chars();
        assert!(
            self.cursor == len,
            "pass ended at {} but the text has {len} positions",
            self.cursor
        );
        self.editing = false;
        self.passes += 1;
    }

    fn skip_forward(&mut self, n: usize) {
        self.assert_editing("skip_forward");
        self.assert_room("skip_forward", n);
        self.cursor += n;
    }

    fn delete_forward(&mut self, n: usize) {
        self.assert_editing("delete_forward");
        self.assert_room("delete_forward", n);
        let start = self.cursor;
        let end = start + n;
        self.rope.remove(start..end);
        self.paragraphs
            .retain(|(_, range)| range.is_empty() || range.start < start || range.end > end);
        for (_, range) in &mut self.paragraphs {
            let clip = |at: usize| {
                if at >= end {
                    at - n
                } else if at > start {
                    start
                } else {
                    at
                }
            };
            *range = clip(range.start)..clip(range.end);
        }
    }

    fn invalidate_forward(&mut self, n: usize) {
        self.assert_editing("invalidate_forward");
        self.assert_room("invalidate_forward", n);
        self.invalidated.push(self.cursor..self.cursor + n);
        self.cursor += n;
    }

    fn invalidate_backward(&mut self, n: usize) {
        self.assert_editing("invalidate_backward");
        assert!(
            n <= self.cursor,
            "invalidate_backward {n} reaches before the start (cursor {})",
            self.cursor
        );
        self.invalidated.push(self.cursor - n..self.cursor);
    }

    fn insert_text_forward(&mut self, text: &str, _owner: &NodeRef) {
        self.insert_at_cursor(text);
    }

    fn insert_fragment(&mut self, _fragment: LayoutFragment, _owner: &NodeRef) {
        self.insert_at_cursor(FRAGMENT_CHAR.encode_utf8(&mut [0; 4]));
    }

    fn add_paragraph_style(&mut self, owner: &NodeRef, range: Range<usize>) {
        self.set_paragraph(owner.id(), range);
    }
}
