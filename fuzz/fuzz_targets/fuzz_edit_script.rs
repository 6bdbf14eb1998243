//! Fuzz target for edit scripts driven through a document.
//!
//! Every incremental pass must leave the sink holding the same text as a
//! fresh layout, and rollbacks must restore earlier synopses.

#![no_main]

use arbitrary::Arbitrary;
use doctree::{Document, DocumentOptions, NodeRef, NodeType, TextLayoutContext, VersionId};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert { at: u8, text: String },
    Remove { at: u8 },
    SetText { at: u8, text: String },
    Emphasize { at: u8, text: String },
    Break { at: u8 },
    Equation { at: u8, text: String },
    Reconcile,
    Rollback { back: u8 },
    Compact { back: u8 },
}

fn with_paragraph(root: &NodeRef, version: VersionId, at: u8, f: impl FnOnce(&NodeRef)) {
    let count = root.child_count();
    if count == 0 {
        return;
    }
    let paragraph = root.child_mut(usize::from(at) % count);
    let _paragraph = paragraph.edit(version);
    f(&paragraph);
}

fuzz_target!(|ops: Vec<Op>| {
    let mut doc = Document::with_options(
        NodeRef::root(vec![NodeRef::paragraph(vec![NodeRef::text("seed")])]),
        DocumentOptions {
            history_limit: Some(4),
            verify_edits: true,
        },
    );
    let mut text = TextLayoutContext::new();
    let mut synopses = vec![doc.synopsis()];

    for op in ops.iter().take(64) {
        match op {
            Op::Reconcile => {
                doc.reconcile(&mut text);
                assert_eq!(text.text(), doc.layout_text());
                continue;
            }
            Op::Rollback { back } => {
                let target = doc.version().saturating_back(u64::from(*back));
                if doc.try_rollback(target).is_ok() {
                    let restored = synopses[target.get() as usize].clone();
                    assert_eq!(doc.synopsis(), restored);
                    // Erased versions now read as the target state.
                    for erased in &mut synopses[target.get() as usize..] {
                        erased.clone_from(&restored);
                    }
                }
                continue;
            }
            Op::Compact { back } => {
                doc.compact(doc.version().saturating_back(u64::from(*back)));
                continue;
            }
            _ => {}
        }

        doc.edit(|root, version| match op {
            Op::Insert { at, text } => {
                let at = usize::from(*at) % (root.child_count() + 1);
                root.insert_child(at, NodeRef::paragraph(vec![NodeRef::text(text)]));
            }
            Op::Remove { at } => {
                let count = root.child_count();
                if count > 0 {
                    root.remove_child(usize::from(*at) % count);
                }
            }
            Op::SetText { at, text } => with_paragraph(root, version, *at, |paragraph| {
                let first = (0..paragraph.child_count())
                    .find(|&i| paragraph.child(i).node_type() == NodeType::Text);
                if let Some(index) = first {
                    let run = paragraph.child_mut(index);
                    let _run = run.edit(version);
                    run.set_text(text);
                }
            }),
            Op::Emphasize { at, text } => with_paragraph(root, version, *at, |paragraph| {
                paragraph.push_child(NodeRef::emphasis(vec![NodeRef::text(text)]));
            }),
            Op::Break { at } => with_paragraph(root, version, *at, |paragraph| {
                paragraph.push_child(NodeRef::linebreak());
            }),
            Op::Equation { at, text } => with_paragraph(root, version, *at, |paragraph| {
                paragraph.push_child(NodeRef::equation(false, vec![NodeRef::text(text)]));
            }),
            Op::Reconcile | Op::Rollback { .. } | Op::Compact { .. } => {}
        });
        synopses.push(doc.synopsis());
    }

    doc.reconcile(&mut text);
    assert_eq!(text.text(), doc.layout_text());
});
