//! Random edit scripts over a root of paragraphs.

use doctree::{NodeRef, NodeType, VersionId};
use proptest::prelude::*;

/// One structural or textual change, applied as a single transaction.
#[derive(Clone, Debug)]
pub enum EditOp {
    InsertParagraph { at: usize, text: String },
    RemoveParagraph { at: usize },
    SetText { paragraph: usize, text: String },
    AppendEmphasis { paragraph: usize, text: String },
    AppendBreak { paragraph: usize },
    AppendEquation { paragraph: usize, text: String },
    ExtendEquation { paragraph: usize, text: String },
    RemoveLastRun { paragraph: usize },
}

fn run_text() -> impl Strategy<Value = String> {
    "[a-cé漢 ]{0,5}"
}

pub fn edit_op() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        (0usize..8, run_text()).prop_map(|(at, text)| EditOp::InsertParagraph { at, text }),
        (0usize..8).prop_map(|at| EditOp::RemoveParagraph { at }),
        (0usize..8, run_text()).prop_map(|(paragraph, text)| EditOp::SetText { paragraph, text }),
        (0usize..8, run_text())
            .prop_map(|(paragraph, text)| EditOp::AppendEmphasis { paragraph, text }),
        (0usize..8).prop_map(|paragraph| EditOp::AppendBreak { paragraph }),
        (0usize..8, run_text())
            .prop_map(|(paragraph, text)| EditOp::AppendEquation { paragraph, text }),
        (0usize..8, run_text())
            .prop_map(|(paragraph, text)| EditOp::ExtendEquation { paragraph, text }),
        (0usize..8).prop_map(|paragraph| EditOp::RemoveLastRun { paragraph }),
    ]
}

pub fn edit_script(max_len: usize) -> impl Strategy<Value = Vec<EditOp>> {
    prop::collection::vec(edit_op(), 1..=max_len)
}

/// Apply `op` to `root`, which must already be open for editing at
/// `version`.
pub fn apply(root: &NodeRef, version: VersionId, op: &EditOp) {
    let count = root.child_count();
    match op {
        EditOp::InsertParagraph { at, text } => {
            root.insert_child(at % (count + 1), NodeRef::paragraph(vec![NodeRef::text(text)]));
        }
        EditOp::RemoveParagraph { at } => {
            if count > 0 {
                root.remove_child(at % count);
            }
        }
        EditOp::SetText { paragraph, text } => {
            with_paragraph(root, version, *paragraph, |paragraph| {
                let first_text = (0..paragraph.child_count())
                    .find(|&i| paragraph.child(i).node_type() == NodeType::Text);
                if let Some(index) = first_text {
                    let run = paragraph.child_mut(index);
                    let _run = run.edit(version);
                    run.set_text(text);
                }
            });
        }
        EditOp::AppendEmphasis { paragraph, text } => {
            with_paragraph(root, version, *paragraph, |paragraph| {
                paragraph.push_child(NodeRef::emphasis(vec![NodeRef::text(text)]));
            });
        }
        EditOp::AppendBreak { paragraph } => {
            with_paragraph(root, version, *paragraph, |paragraph| {
                paragraph.push_child(NodeRef::linebreak());
            });
        }
        EditOp::AppendEquation { paragraph, text } => {
            with_paragraph(root, version, *paragraph, |paragraph| {
                paragraph.push_child(NodeRef::equation(false, vec![NodeRef::text(text)]));
            });
        }
        EditOp::ExtendEquation { paragraph, text } => {
            with_paragraph(root, version, *paragraph, |paragraph| {
                let equation = (0..paragraph.child_count())
                    .find(|&i| paragraph.child(i).node_type() == NodeType::Equation);
                if let Some(index) = equation {
                    let equation = paragraph.child_mut(index);
                    let nucleus = equation.component_mut(0);
                    let _nucleus = nucleus.edit(version);
                    nucleus.push_child(NodeRef::text(text));
                }
            });
        }
        EditOp::RemoveLastRun { paragraph } => {
            with_paragraph(root, version, *paragraph, |paragraph| {
                let runs = paragraph.child_count();
                if runs > 0 {
                    paragraph.remove_child(runs - 1);
                }
            });
        }
    }
}

fn with_paragraph(root: &NodeRef, version: VersionId, index: usize, f: impl FnOnce(&NodeRef)) {
    let count = root.child_count();
    if count == 0 {
        return;
    }
    let paragraph = root.child_mut(index % count);
    let _paragraph = paragraph.edit(version);
    f(&paragraph);
}
