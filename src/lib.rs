//! `doctree` - versioned document trees with incremental layout
//!
//! A copy-on-write node tree whose every field keeps a short version history,
//! an editing-transaction protocol that stamps changes and reports them to the
//! ancestors, and a reconciler that turns the difference between two versions
//! into a forward-only stream of skip/insert/delete instructions for an
//! external layout engine.

// Crate-level lint configuration
#![allow(clippy::cast_possible_truncation)] // Version arithmetic stays in u64
#![allow(clippy::cast_possible_wrap)] // Lengths never approach isize::MAX
#![allow(clippy::module_name_repetitions)] // Allow layout::LayoutContext etc
#![allow(clippy::missing_errors_doc)] // Error variants are self-describing
#![allow(clippy::missing_panics_doc)] // Protocol violations are documented per module
#![allow(clippy::missing_const_for_fn)] // Many functions could be const, not critical
#![allow(clippy::doc_markdown)] // Allow technical names without backticks
#![allow(clippy::must_use_candidate)] // Accessors are obvious
#![allow(clippy::use_self)] // Allow explicit type names in impl blocks
#![allow(clippy::format_push_string)] // format! with push_str is fine
#![allow(clippy::needless_pass_by_value)] // Node handles are cheap Rc clones
#![allow(clippy::collapsible_if)] // Sometimes nested ifs are clearer
#![allow(clippy::items_after_statements)] // Common pattern in tests
#![allow(clippy::redundant_clone)] // Clones in tests for clarity are fine
#![allow(clippy::semicolon_if_nothing_returned)] // Style preference
#![allow(clippy::significant_drop_tightening)] // RefCell borrows are scoped by hand

pub mod document;
pub mod error;
pub mod event;
pub mod layout;
pub mod node;
pub mod reconcile;
pub mod serialize;
pub mod style;
pub mod version;

// Re-export core types at crate root
pub use document::{Document, DocumentOptions, DocumentStats};
pub use error::{Error, Result};
pub use event::{
    LogLevel, clear_event_callback, clear_log_callback, emit_event, emit_log, set_event_callback,
    set_log_callback,
};
pub use node::{EditGuard, ElementKind, MathKind, NodeFlags, NodeId, NodeRef, NodeType};
pub use version::{VersionId, VersionRollup, VersionedCell};

// Re-export layout types
pub use layout::{
    FragmentKind, Instruction, LayoutContext, LayoutFragment, LayoutStats, RecordingContext,
    TextLayoutContext,
};

// Re-export reconciliation entry points
pub use reconcile::{LayoutPass, NodeView, Reconcilable, reconcile, reconcile_forward};

// Re-export style types
pub use style::{
    FontStyle, FontWeight, PropertyKey, PropertyMap, PropertyValue, RuleSheet, Selector, StyleSheet,
    TextAlign, TextProperties,
};
