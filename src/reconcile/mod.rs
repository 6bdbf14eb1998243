//! Incremental reconciliation of laid-out content against the tree.
//!
//! One primitive, [`reconcile_forward`], decides between skip, insert,
//! delete and replace for any pair of optional old/new values that know
//! their layout length. [`reconcile`] applies it recursively over two
//! [`NodeView`]s: views with equal stamps collapse into a single skip, so a
//! pass costs time proportional to what changed rather than to the size of
//! the document.
//!
//! The same walk serves two callers. Diffing one live tree between its
//! rendered version and its current version, and diffing a retained snapshot
//! against the live tree, are both just two views of nodes that share ids.
//!
//! # Examples
//!
//! ```
//! use doctree::layout::{RecordingContext, TextLayoutContext};
//! use doctree::reconcile::{NodeView, reconcile};
//! use doctree::{NodeRef, VersionId};
//!
//! let root = NodeRef::root(vec![NodeRef::paragraph(vec![NodeRef::text("hi")])]);
//! let v0 = VersionId::INITIAL;
//! let mut text = TextLayoutContext::new();
//! reconcile(None, &NodeView::new(root.clone(), v0), &mut text);
//! assert_eq!(text.text(), "hi");
//!
//! let mut recorder = RecordingContext::new();
//! let view = NodeView::new(root, v0);
//! let stats = reconcile(Some(&view), &view, &mut recorder);
//! assert_eq!(recorder.transcript(), "begin\nskip 2\nend");
//! assert!(stats.is_noop());
//! ```

mod node;

pub use node::{NodeView, insert_node, reconcile_node};

use std::ops::Range;

use crate::layout::{LayoutContext, LayoutFragment, LayoutStats};
use crate::node::NodeRef;

/// Something that occupies a run of layout positions.
pub trait Reconcilable {
    fn layout_length(&self) -> usize;

    /// Emit the instructions that lay this value out at the cursor.
    fn insert_forward(&self, pass: &mut LayoutPass<'_>, owner: &NodeRef);
}

impl Reconcilable for str {
    fn layout_length(&self) -> usize {
        self.chars().count()
    }

    fn insert_forward(&self, pass: &mut LayoutPass<'_>, owner: &NodeRef) {
        pass.insert_text_forward(self, owner);
    }
}

/// A single line break.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Newline;

impl Reconcilable for Newline {
    fn layout_length(&self) -> usize {
        1
    }

    fn insert_forward(&self, pass: &mut LayoutPass<'_>, owner: &NodeRef) {
        pass.insert_text_forward("\n", owner);
    }
}

/// Bring the layout of `old` in line with `new` and return the number of
/// positions now occupied by `new`.
///
/// | old | new | emitted | consumed |
/// |-----|-----|---------|----------|
/// | `a` | `a` | skip len(a) | len(a) |
/// | -   | `b` | insert b | len(b) |
/// | `a` | -   | delete len(a) | 0 |
/// | `a` | `b` | delete len(a), insert b | len(b) |
pub fn reconcile_forward<T>(
    old: Option<&T>,
    new: Option<&T>,
    pass: &mut LayoutPass<'_>,
    owner: &NodeRef,
) -> usize
where
    T: Reconcilable + PartialEq + ?Sized,
{
    match (old, new) {
        (None, None) => 0,
        (Some(old), Some(new)) if old == new => {
            let n = old.layout_length();
            pass.skip_forward(n);
            n
        }
        (None, Some(new)) => {
            new.insert_forward(pass, owner);
            new.layout_length()
        }
        (Some(old), None) => {
            pass.delete_forward(old.layout_length());
            0
        }
        (Some(old), Some(new)) => {
            pass.delete_forward(old.layout_length());
            new.insert_forward(pass, owner);
            new.layout_length()
        }
    }
}

/// Reconcile `new` against `old` (or lay it out from scratch when `old` is
/// `None`) inside one editing bracket on `ctx`.
pub fn reconcile(old: Option<&NodeView>, new: &NodeView, ctx: &mut dyn LayoutContext) -> LayoutStats {
    let mut pass = LayoutPass::new(ctx);
    pass.begin_editing();
    match old {
        Some(old) => {
            reconcile_node(old, new, &mut pass);
        }
        None => {
            reconcile_forward(None, Some(new), &mut pass, &new.node);
        }
    }
    pass.end_editing();
    pass.finish()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Idle,
    Skip(usize),
    Delete(usize),
    Invalidate(usize),
}

/// A [`LayoutContext`] adapter that tracks the absolute cursor, merges
/// adjacent skips, deletes and invalidations, drops zero-length
/// instructions and counts what it forwards.
pub struct LayoutPass<'a> {
    sink: &'a mut dyn LayoutContext,
    cursor: usize,
    pending: Pending,
    stats: LayoutStats,
}

impl<'a> LayoutPass<'a> {
    pub fn new(sink: &'a mut dyn LayoutContext) -> Self {
        Self {
            sink,
            cursor: 0,
            pending: Pending::Idle,
            stats: LayoutStats::default(),
        }
    }

    /// Absolute position in the new layout.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn stats(&self) -> LayoutStats {
        self.stats
    }

    /// Forward anything still buffered and return the pass counts.
    pub fn finish(mut self) -> LayoutStats {
        self.flush();
        self.stats
    }

    fn flush(&mut self) {
        match std::mem::replace(&mut self.pending, Pending::Idle) {
            Pending::Idle => return,
            Pending::Skip(n) => self.sink.skip_forward(n),
            Pending::Delete(n) => self.sink.delete_forward(n),
            Pending::Invalidate(n) => self.sink.invalidate_forward(n),
        }
        self.stats.instructions += 1;
    }

    fn buffer(&mut self, next: Pending) {
        self.pending = match (self.pending, next) {
            (Pending::Skip(a), Pending::Skip(b)) => Pending::Skip(a + b),
            (Pending::Delete(a), Pending::Delete(b)) => Pending::Delete(a + b),
            (Pending::Invalidate(a), Pending::Invalidate(b)) => Pending::Invalidate(a + b),
            _ => {
                self.flush();
                next
            }
        };
    }
}

impl LayoutContext for LayoutPass<'_> {
    fn begin_editing(&mut self) {
        self.flush();
        self.sink.begin_editing();
        self.stats.instructions += 1;
    }

    fn end_editing(&mut self) {
        self.flush();
        self.sink.end_editing();
        self.stats.instructions += 1;
    }

    fn skip_forward(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.buffer(Pending::Skip(n));
        self.cursor += n;
        self.stats.skipped += n;
    }

    fn delete_forward(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.buffer(Pending::Delete(n));
        self.stats.deleted += n;
    }

    fn invalidate_forward(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.buffer(Pending::Invalidate(n));
        self.cursor += n;
        self.stats.invalidated += n;
    }

    fn invalidate_backward(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.flush();
        self.sink.invalidate_backward(n);
        self.stats.instructions += 1;
    }

    fn insert_text_forward(&mut self, text: &str, owner: &NodeRef) {
        let n = text.chars().count();
        if n == 0 {
            return;
        }
        self.flush();
        self.sink.insert_text_forward(text, owner);
        self.cursor += n;
        self.stats.inserted += n;
        self.stats.instructions += 1;
    }

    fn insert_fragment(&mut self, fragment: LayoutFragment, owner: &NodeRef) {
        self.flush();
        self.sink.insert_fragment(fragment, owner);
        self.cursor += 1;
        self.stats.inserted += 1;
        self.stats.instructions += 1;
    }

    fn add_paragraph_style(&mut self, owner: &NodeRef, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.flush();
        self.sink.add_paragraph_style(owner, range);
        self.stats.instructions += 1;
    }
}
