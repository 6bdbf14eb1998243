//! Host-facing document facade.
//!
//! [`Document`] owns the live root and the version clock. It runs each edit
//! as one transaction at a fresh version, remembers which version the layout
//! sink last saw, and keeps a snapshot of that state when a rollback would
//! otherwise erase it, so every pass stays incremental.
//!
//! # Example
//!
//! ```
//! use doctree::layout::TextLayoutContext;
//! use doctree::{Document, NodeRef};
//!
//! let mut doc = Document::new(NodeRef::root(vec![
//!     NodeRef::paragraph(vec![NodeRef::text("hello")]),
//! ]));
//! let mut layout = TextLayoutContext::new();
//! doc.reconcile(&mut layout);
//!
//! doc.edit(|root, version| {
//!     let paragraph = root.child_mut(0);
//!     let _paragraph = paragraph.edit(version);
//!     paragraph.push_child(NodeRef::text(" world"));
//! });
//! doc.reconcile(&mut layout);
//! assert_eq!(layout.text(), "hello world");
//! ```

use std::env;

use crate::error::{Error, Result};
use crate::event::{LogLevel, emit_event, emit_log};
use crate::layout::{LayoutContext, LayoutStats};
use crate::node::NodeRef;
use crate::reconcile::{LayoutPass, NodeView, reconcile};
use crate::serialize;
use crate::version::VersionId;

/// Environment variable holding the history limit (`off`, `none` or a count).
pub const HISTORY_LIMIT_VAR: &str = "DOCTREE_HISTORY_LIMIT";
/// Environment variable toggling invariant checks after each edit.
pub const VERIFY_EDITS_VAR: &str = "DOCTREE_VERIFY_EDITS";

/// Document configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentOptions {
    /// Versions of history kept behind the rendered version. Once twice as
    /// many have accumulated, a reconcile pass compacts back down to this
    /// many. `None` disables automatic compaction.
    pub history_limit: Option<u64>,
    /// Check structural invariants after every edit.
    pub verify_edits: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            history_limit: Some(64),
            verify_edits: cfg!(debug_assertions),
        }
    }
}

impl DocumentOptions {
    /// Defaults overridden by `DOCTREE_HISTORY_LIMIT` and
    /// `DOCTREE_VERIFY_EDITS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup.
    ///
    /// Unrecognized values are reported through the log hook and ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(raw) = lookup(HISTORY_LIMIT_VAR) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "off" | "none" => options.history_limit = None,
                value => match value.parse::<u64>() {
                    Ok(limit) => options.history_limit = Some(limit),
                    Err(_) => emit_log(
                        LogLevel::Warn,
                        &format!("ignoring {HISTORY_LIMIT_VAR}={raw:?}: expected off, none or a count"),
                    ),
                },
            }
        }

        if let Some(raw) = lookup(VERIFY_EDITS_VAR) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => options.verify_edits = true,
                "0" | "false" | "off" | "no" => options.verify_edits = false,
                _ => emit_log(
                    LogLevel::Warn,
                    &format!("ignoring {VERIFY_EDITS_VAR}={raw:?}: expected a boolean"),
                ),
            }
        }

        options
    }
}

/// Counters over the lifetime of a [`Document`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub edits: u64,
    pub reconciles: u64,
    pub compactions: u64,
    pub rollbacks: u64,
    /// Counts of the most recent pass sent to a layout sink.
    pub last_pass: LayoutStats,
}

/// A live document tree with its version clock and render state.
#[derive(Debug)]
pub struct Document {
    root: NodeRef,
    /// Latest issued version. Never decreases, including across rollbacks.
    version: VersionId,
    rendered: Option<VersionId>,
    /// The rendered state, kept when a rollback erased it from `root`.
    retained: Option<NodeView>,
    floor: VersionId,
    options: DocumentOptions,
    stats: DocumentStats,
}

impl Document {
    /// Wrap a detached root with default options.
    #[must_use]
    pub fn new(root: NodeRef) -> Self {
        Self::with_options(root, DocumentOptions::default())
    }

    #[must_use]
    pub fn with_options(root: NodeRef, options: DocumentOptions) -> Self {
        let version = root.subtree_version();
        Self {
            root,
            version,
            rendered: None,
            retained: None,
            floor: VersionId::INITIAL,
            options,
            stats: DocumentStats::default(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> &NodeRef {
        &self.root
    }

    #[must_use]
    pub const fn version(&self) -> VersionId {
        self.version
    }

    /// Version the layout sink last reconciled to.
    #[must_use]
    pub const fn rendered_version(&self) -> Option<VersionId> {
        self.rendered
    }

    /// Oldest version still queryable.
    #[must_use]
    pub const fn floor(&self) -> VersionId {
        self.floor
    }

    #[must_use]
    pub const fn options(&self) -> &DocumentOptions {
        &self.options
    }

    #[must_use]
    pub const fn stats(&self) -> &DocumentStats {
        &self.stats
    }

    /// Whether the sink already shows the current state.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.rendered == Some(self.version) && self.retained.is_none()
    }

    /// Run `f` as one transaction at a fresh version.
    ///
    /// The root is open for editing while `f` runs; descendants must be
    /// reached through [`NodeRef::child_mut`] and opened themselves.
    ///
    /// # Panics
    ///
    /// Panics if `f` violates the editing protocol, or if invariant checks
    /// are enabled and the edit left the tree inconsistent.
    pub fn edit<R>(&mut self, f: impl FnOnce(&NodeRef, VersionId) -> R) -> R {
        let version = self.version.next();
        self.version = version;
        let result = {
            let _root = self.root.edit(version);
            f(&self.root, version)
        };

        if self.options.verify_edits {
            if let Err(err) = self.root.check_invariants() {
                emit_log(LogLevel::Error, &format!("edit at {version} broke the tree: {err}"));
                panic!("edit at {version}: {err}");
            }
        }

        self.stats.edits += 1;
        emit_event(
            "document.edit",
            &format!("version={version} length={}", self.root.len()),
        );
        result
    }

    /// Fork the current state. The snapshot is unaffected by later edits.
    #[must_use]
    pub fn snapshot(&self) -> NodeView {
        NodeView::new(self.root.fork(), self.version)
    }

    /// Bring `ctx` up to the current version and return the new layout
    /// length.
    ///
    /// The first pass lays the whole document out; later passes only touch
    /// what changed since the previous one.
    pub fn reconcile(&mut self, ctx: &mut dyn LayoutContext) -> usize {
        let new = NodeView::new(self.root.clone(), self.version);
        let old = self
            .retained
            .take()
            .or_else(|| self.rendered.map(|v| NodeView::new(self.root.clone(), v)));
        let pass = reconcile(old.as_ref(), &new, ctx);

        self.rendered = Some(self.version);
        self.stats.reconciles += 1;
        self.stats.last_pass = pass;
        emit_log(
            LogLevel::Debug,
            &format!(
                "reconciled to {}: skipped {} inserted {} deleted {} invalidated {} in {} instructions",
                self.version,
                pass.skipped,
                pass.inserted,
                pass.deleted,
                pass.invalidated,
                pass.instructions
            ),
        );
        emit_event(
            "document.reconcile",
            &format!(
                "version={} skipped={} inserted={} deleted={} invalidated={}",
                self.version, pass.skipped, pass.inserted, pass.deleted, pass.invalidated
            ),
        );

        self.apply_history_limit();
        pass.new_length()
    }

    fn apply_history_limit(&mut self) {
        let (Some(limit), Some(rendered)) = (self.options.history_limit, self.rendered) else {
            return;
        };
        let retained = rendered.get().saturating_sub(self.floor.get());
        if retained > limit.saturating_mul(2) {
            self.compact(rendered.saturating_back(limit));
        }
    }

    /// Forget history before `through`, clamped to the rendered version so
    /// the next pass can still read its starting point.
    pub fn compact(&mut self, through: VersionId) {
        let ceiling = self.rendered.unwrap_or(self.version);
        let floor = through.min(ceiling);
        if floor <= self.floor {
            return;
        }
        self.root.drop_versions(floor);
        if let Some(retained) = &self.retained {
            retained.node.drop_versions(floor);
        }
        self.floor = floor;
        self.stats.compactions += 1;
        emit_event("document.compact", &format!("floor={floor}"));
    }

    /// Current version, to roll back to later.
    #[must_use]
    pub const fn checkpoint(&self) -> VersionId {
        self.version
    }

    /// Restore the tree to its state at `target`.
    ///
    /// The version clock keeps running; the next edit gets a version newer
    /// than any issued before.
    pub fn try_rollback(&mut self, target: VersionId) -> Result<()> {
        if target > self.version {
            return Err(Error::FutureVersion {
                requested: target,
                latest: self.version,
            });
        }
        if target < self.floor {
            return Err(Error::VersionBelowFloor {
                requested: target,
                floor: self.floor,
            });
        }

        if self.retained.is_none() {
            if let Some(rendered) = self.rendered.filter(|rendered| *rendered > target) {
                self.retained = Some(NodeView::new(self.root.fork(), rendered));
            }
        }
        self.root.rollback(target);

        self.stats.rollbacks += 1;
        emit_event(
            "document.rollback",
            &format!("target={target} version={}", self.version),
        );
        Ok(())
    }

    /// Panicking form of [`try_rollback`](Self::try_rollback).
    ///
    /// # Panics
    ///
    /// Panics if `target` is newer than the current version or below the
    /// retained history.
    pub fn rollback(&mut self, target: VersionId) {
        if let Err(err) = self.try_rollback(target) {
            panic!("rollback to {target}: {err}");
        }
    }

    /// Drop every cached style and mark the whole layout stale, bringing the
    /// sink up to date first if needed. Returns the layout length.
    pub fn restyle(&mut self, ctx: &mut dyn LayoutContext) -> usize {
        if !self.is_rendered() {
            self.reconcile(ctx);
        }
        self.root.invalidate_styles();

        let length = self.root.len();
        let mut pass = LayoutPass::new(ctx);
        pass.begin_editing();
        pass.invalidate_forward(length);
        pass.end_editing();
        self.stats.last_pass = pass.finish();

        emit_event(
            "document.restyle",
            &format!("version={} length={length}", self.version),
        );
        length
    }

    /// Text runs of the current version, separated by `|`.
    #[must_use]
    pub fn synopsis(&self) -> String {
        serialize::synopsis(&self.root, self.version)
    }

    /// Text runs as of `version`.
    pub fn synopsis_at(&self, version: VersionId) -> Result<String> {
        self.check_readable(version)?;
        Ok(serialize::synopsis(&self.root, version))
    }

    /// The current version as plain text.
    #[must_use]
    pub fn layout_text(&self) -> String {
        serialize::layout_text(&self.root, self.version)
    }

    fn check_readable(&self, version: VersionId) -> Result<()> {
        if version > self.version {
            Err(Error::FutureVersion {
                requested: version,
                latest: self.version,
            })
        } else if version < self.floor {
            Err(Error::VersionBelowFloor {
                requested: version,
                floor: self.floor,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{RecordingContext, TextLayoutContext};

    fn sample() -> Document {
        Document::new(NodeRef::root(vec![
            NodeRef::heading(
                1,
                vec![
                    NodeRef::text("The "),
                    NodeRef::emphasis(vec![NodeRef::text("quick ")]),
                ],
            ),
            NodeRef::paragraph(vec![NodeRef::text("brown ")]),
        ]))
    }

    fn replace_first_word(doc: &mut Document, word: &str) {
        doc.edit(|root, version| {
            let heading = root.child_mut(0);
            let _heading = heading.edit(version);
            heading.replace_child(0, NodeRef::text(word));
        });
    }

    #[test]
    fn test_options_from_lookup() {
        let options = DocumentOptions::from_lookup(|name| match name {
            HISTORY_LIMIT_VAR => Some("off".to_string()),
            VERIFY_EDITS_VAR => Some("1".to_string()),
            _ => None,
        });
        assert_eq!(options.history_limit, None);
        assert!(options.verify_edits);

        let options = DocumentOptions::from_lookup(|name| {
            (name == HISTORY_LIMIT_VAR).then(|| " 8 ".to_string())
        });
        assert_eq!(options.history_limit, Some(8));

        let options = DocumentOptions::from_lookup(|_| Some("bogus".to_string()));
        assert_eq!(options, DocumentOptions::default());
    }

    #[test]
    fn test_edit_advances_version() {
        let mut doc = sample();
        assert_eq!(doc.version(), VersionId::INITIAL);
        replace_first_word(&mut doc, "A ");
        assert_eq!(doc.version(), VersionId::new(1));
        assert_eq!(doc.synopsis(), "A |quick |brown ");
        assert_eq!(
            doc.synopsis_at(VersionId::INITIAL).as_deref(),
            Ok("The |quick |brown ")
        );
        assert_eq!(doc.stats().edits, 1);
    }

    #[test]
    fn test_incremental_reconcile() {
        let mut doc = sample();
        let mut layout = TextLayoutContext::new();
        assert_eq!(doc.reconcile(&mut layout), 16);
        assert!(doc.is_rendered());

        replace_first_word(&mut doc, "A ");
        let mut recorder = RecordingContext::new();
        let old = NodeView::new(doc.root().clone(), VersionId::INITIAL);
        let new = NodeView::new(doc.root().clone(), doc.version());
        reconcile(Some(&old), &new, &mut recorder);
        layout.replay(recorder.instructions());
        assert_eq!(layout.text(), "A quick brown ");

        let mut fresh = TextLayoutContext::from_text("The quick brown ");
        assert_eq!(doc.reconcile(&mut fresh), 14);
        assert_eq!(fresh.text(), "A quick brown ");
        assert_eq!(doc.stats().last_pass.deleted, 4);
        assert_eq!(doc.stats().last_pass.skipped, 12);
    }

    #[test]
    fn test_rollback_keeps_rendered_state() {
        let mut doc = sample();
        let mut layout = TextLayoutContext::new();
        let checkpoint = doc.checkpoint();
        replace_first_word(&mut doc, "A ");
        doc.reconcile(&mut layout);
        assert_eq!(layout.text(), "A quick brown ");

        doc.rollback(checkpoint);
        assert_eq!(doc.synopsis(), "The |quick |brown ");
        assert!(!doc.is_rendered());
        doc.reconcile(&mut layout);
        assert_eq!(layout.text(), "The quick brown ");
        assert_eq!(doc.stats().last_pass.skipped, 12);

        replace_first_word(&mut doc, "One ");
        assert_eq!(doc.version(), VersionId::new(2));
        doc.reconcile(&mut layout);
        assert_eq!(layout.text(), "One quick brown ");
    }

    #[test]
    fn test_rollback_errors() {
        let mut doc = sample();
        replace_first_word(&mut doc, "A ");
        assert_eq!(
            doc.try_rollback(VersionId::new(5)),
            Err(Error::FutureVersion {
                requested: VersionId::new(5),
                latest: VersionId::new(1),
            })
        );

        replace_first_word(&mut doc, "B ");
        doc.compact(VersionId::new(1));
        assert_eq!(
            doc.try_rollback(VersionId::INITIAL),
            Err(Error::VersionBelowFloor {
                requested: VersionId::INITIAL,
                floor: VersionId::new(1),
            })
        );
        assert!(doc.synopsis_at(VersionId::INITIAL).is_err());
        assert_eq!(doc.synopsis_at(VersionId::new(1)).as_deref(), Ok("A |quick |brown "));
    }

    #[test]
    fn test_history_limit_compacts() {
        let options = DocumentOptions {
            history_limit: Some(2),
            verify_edits: true,
        };
        let mut doc = Document::with_options(
            NodeRef::root(vec![NodeRef::paragraph(vec![NodeRef::text("0")])]),
            options,
        );
        let mut layout = TextLayoutContext::new();
        for round in 1..=5 {
            doc.edit(|root, version| {
                let paragraph = root.child_mut(0);
                let _paragraph = paragraph.edit(version);
                let text = paragraph.child_mut(0);
                let _text = text.edit(version);
                text.set_text(&round.to_string());
            });
            doc.reconcile(&mut layout);
        }
        assert_eq!(layout.text(), "5");
        assert_eq!(doc.floor(), VersionId::new(3));
        assert_eq!(doc.stats().compactions, 1);
        assert_eq!(doc.synopsis_at(VersionId::new(3)).as_deref(), Ok("3"));
    }

    #[test]
    fn test_restyle_invalidates_everything() {
        let mut doc = sample();
        let mut recorder = RecordingContext::new();
        doc.reconcile(&mut recorder);
        recorder.clear();

        assert_eq!(doc.restyle(&mut recorder), 16);
        assert_eq!(recorder.transcript(), "begin\ninvalidate 16\nend");
        assert_eq!(doc.stats().last_pass.invalidated, 16);
    }
}
