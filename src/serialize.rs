//! Read-only walks over a tree at one version.
//!
//! Nothing here claims ownership of a child, so serializing a snapshot never
//! triggers a copy.

use std::fmt::Write as _;

use crate::layout::FRAGMENT_CHAR;
use crate::node::{ElementKind, NodeRef, NodeType};
use crate::version::VersionId;

/// Visit `node` and its descendants depth-first, parents before children.
/// Math components are visited like children.
pub fn walk(node: &NodeRef, version: VersionId, visit: &mut dyn FnMut(&NodeRef, usize)) {
    walk_at_depth(node, version, 0, visit);
}

fn walk_at_depth(
    node: &NodeRef,
    version: VersionId,
    depth: usize,
    visit: &mut dyn FnMut(&NodeRef, usize),
) {
    visit(node, depth);
    for child in node.children_at(version) {
        walk_at_depth(&child, version, depth + 1, visit);
    }
    for component in node.components() {
        walk_at_depth(&component, version, depth + 1, visit);
    }
}

/// Every text run in document order, separated by `|`.
///
/// ```
/// use doctree::{NodeRef, VersionId, serialize};
///
/// let root = NodeRef::root(vec![
///     NodeRef::paragraph(vec![NodeRef::text("a "), NodeRef::text("b")]),
/// ]);
/// assert_eq!(serialize::synopsis(&root, VersionId::INITIAL), "a |b");
/// ```
#[must_use]
pub fn synopsis(node: &NodeRef, version: VersionId) -> String {
    let mut runs = Vec::new();
    walk(node, version, &mut |node, _| {
        if let Some(text) = node.text_at(version) {
            runs.push(text);
        }
    });
    runs.iter().map(|run| &**run).collect::<Vec<_>>().join("|")
}

/// The document as a layout sink sees it: text, `\n` for line breaks and
/// [`FRAGMENT_CHAR`] for each math node.
#[must_use]
pub fn layout_text(node: &NodeRef, version: VersionId) -> String {
    let mut out = String::with_capacity(node.len_at(version));
    push_layout_text(node, version, &mut out);
    out
}

fn push_layout_text(node: &NodeRef, version: VersionId, out: &mut String) {
    match node.node_type() {
        NodeType::Text => {
            if let Some(text) = node.text_at(version) {
                out.push_str(&text);
            }
        }
        NodeType::Linebreak => out.push('\n'),
        NodeType::Equation | NodeType::Fraction => out.push(FRAGMENT_CHAR),
        _ => {
            for child in node.children_at(version) {
                push_layout_text(&child, version, out);
            }
        }
    }
}

/// Nested lengths: containers and math nodes as `(len, [..])`, leaves as
/// their length in backticks.
#[must_use]
pub fn length_summary(node: &NodeRef, version: VersionId) -> String {
    let mut out = String::new();
    push_length_summary(node, version, &mut out);
    out
}

fn push_length_summary(node: &NodeRef, version: VersionId, out: &mut String) {
    let nested = match node.node_type() {
        NodeType::Text | NodeType::Linebreak => {
            let _ = write!(out, "`{}`", node.len_at(version));
            return;
        }
        NodeType::Equation | NodeType::Fraction => node.components(),
        _ => node.children_at(version),
    };
    let _ = write!(out, "({}, [", node.len_at(version));
    for (index, child) in nested.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        push_length_summary(child, version, out);
    }
    out.push_str("])");
}

/// Number of nodes reachable at `version`, math components included.
#[must_use]
pub fn node_count(node: &NodeRef, version: VersionId) -> usize {
    let mut count = 0;
    walk(node, version, &mut |_, _| count += 1);
    count
}

/// Indented tree dump without node ids, one node per line.
#[must_use]
pub fn outline(node: &NodeRef, version: VersionId) -> String {
    let mut out = String::new();
    walk(node, version, &mut |node, depth| {
        let _ = write!(out, "{:indent$}{}", "", node.node_type(), indent = depth * 2);
        if let Some(ElementKind::Heading { level }) = node.element_kind() {
            let _ = write!(out, " level={level}");
        }
        if let Some(text) = node.text_at(version) {
            let _ = write!(out, " {:?}", &*text);
        }
        out.push('\n');
    });
    out
}
