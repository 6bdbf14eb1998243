//! Instruction streams emitted by the reconciler, pinned as transcripts.

mod common;

use common::{init_logging, paragraphs, quick_brown, set_run_text, v};
use doctree::serialize::layout_text;
use doctree::{
    Instruction, NodeRef, NodeView, RecordingContext, TextLayoutContext, VersionId, reconcile,
};

fn transcript(old: Option<&NodeView>, new: &NodeView) -> String {
    let mut recorder = RecordingContext::new();
    let stats = reconcile(old, new, &mut recorder);
    assert_eq!(stats.new_length(), new.len());
    if let Some(old) = old {
        assert_eq!(stats.old_length(), old.len());
    }
    tracing::debug!(?stats, "reconciled");
    recorder.transcript()
}

fn view(node: &NodeRef, version: VersionId) -> NodeView {
    NodeView::new(node.clone(), version)
}

// ============================================================================
// Full layout
// ============================================================================

#[test]
fn initial_layout_of_scenario_tree() {
    init_logging();
    let root = quick_brown();
    insta::assert_snapshot!(transcript(None, &view(&root, VersionId::INITIAL)), @r#"
    begin
    insert "The "
    insert "quick "
    paragraph 0..10
    insert "brown "
    paragraph 10..16
    end
    "#);
}

#[test]
fn initial_layout_with_math_and_breaks() {
    init_logging();
    let root = NodeRef::root(vec![
        NodeRef::paragraph(vec![
            NodeRef::text("x = "),
            NodeRef::fraction(vec![NodeRef::text("1")], vec![NodeRef::text("2")]),
            NodeRef::linebreak(),
            NodeRef::text("done"),
        ]),
        NodeRef::equation(true, vec![NodeRef::text("e")]),
    ]);
    insta::assert_snapshot!(transcript(None, &view(&root, VersionId::INITIAL)), @r#"
    begin
    insert "x = "
    fragment fraction
    insert "\n"
    insert "done"
    paragraph 0..10
    fragment display-equation
    end
    "#);
}

// ============================================================================
// Incremental passes
// ============================================================================

#[test]
fn scenario_edit_emits_delete_insert_skip() {
    init_logging();
    let root = quick_brown();
    {
        let v1 = v(1);
        let _root = root.edit(v1);
        let heading = root.child_mut(0);
        let _heading = heading.edit(v1);
        heading.replace_child(0, NodeRef::text("A "));
    }
    insta::assert_snapshot!(
        transcript(Some(&view(&root, VersionId::INITIAL)), &view(&root, v(1))),
        @r#"
    begin
    delete 4
    insert "A "
    skip 6
    paragraph 0..8
    skip 6
    end
    "#
    );
}

#[test]
fn unchanged_tree_is_one_skip() {
    init_logging();
    let root = paragraphs(&["alpha", "beta", "gamma"]);
    set_run_text(&root, v(1), 1, 0, "BETA");
    let current = view(&root, v(1));
    insta::assert_snapshot!(transcript(Some(&current), &current), @r"
    begin
    skip 14
    end
    ");
}

#[test]
fn middle_paragraph_edit_skips_neighbours() {
    init_logging();
    let root = paragraphs(&["alpha", "beta", "gamma"]);
    set_run_text(&root, v(1), 1, 0, "BETA!");
    insta::assert_snapshot!(
        transcript(Some(&view(&root, VersionId::INITIAL)), &view(&root, v(1))),
        @r#"
    begin
    skip 5
    delete 4
    insert "BETA!"
    paragraph 5..10
    skip 5
    end
    "#
    );
}

#[test]
fn removed_and_inserted_paragraphs() {
    init_logging();
    let root = paragraphs(&["alpha", "beta", "gamma"]);
    {
        let v1 = v(1);
        let _root = root.edit(v1);
        root.remove_child(1);
        root.insert_child(0, NodeRef::paragraph(vec![NodeRef::text("zero")]));
    }
    insta::assert_snapshot!(
        transcript(Some(&view(&root, VersionId::INITIAL)), &view(&root, v(1))),
        @r#"
    begin
    insert "zero"
    paragraph 0..4
    skip 5
    delete 4
    skip 5
    end
    "#
    );
}

#[test]
fn moved_paragraph_keeps_the_longest_prefix_match() {
    init_logging();
    let root = paragraphs(&["a", "b", "c"]);
    let moved = root.child(2);
    {
        let v1 = v(1);
        let _root = root.edit(v1);
        let last = root.remove_child(2);
        root.insert_child(0, last);
    }
    let mut recorder = RecordingContext::new();
    reconcile(
        Some(&view(&root, VersionId::INITIAL)),
        &view(&root, v(1)),
        &mut recorder,
    );
    insta::assert_snapshot!(recorder.transcript(), @r#"
    begin
    delete 2
    skip 1
    insert "a"
    paragraph 1..2
    insert "b"
    paragraph 2..3
    end
    "#);

    let moved_text = moved.child(0).id();
    assert!(recorder.instructions().iter().all(|instruction| !matches!(
        instruction,
        Instruction::InsertText { owner, .. } if *owner == moved_text
    )));
}

#[test]
fn equation_edit_invalidates_fragment_only() {
    init_logging();
    let root = NodeRef::root(vec![NodeRef::paragraph(vec![
        NodeRef::text("see "),
        NodeRef::equation(false, vec![NodeRef::text("x")]),
        NodeRef::text(" here"),
    ])]);
    {
        let v1 = v(1);
        let _root = root.edit(v1);
        let paragraph = root.child_mut(0);
        let _paragraph = paragraph.edit(v1);
        let equation = paragraph.child_mut(1);
        let nucleus = equation.component_mut(0);
        let _nucleus = nucleus.edit(v1);
        nucleus.push_child(NodeRef::text("+1"));
    }
    insta::assert_snapshot!(
        transcript(Some(&view(&root, VersionId::INITIAL)), &view(&root, v(1))),
        @r"
    begin
    skip 4
    invalidate 1
    skip 5
    paragraph 0..10
    end
    "
    );
}

// ============================================================================
// Materialization
// ============================================================================

#[test]
fn incremental_stream_replays_onto_old_text() {
    init_logging();
    let root = paragraphs(&["alpha", "beta", "gamma"]);
    let mut text = TextLayoutContext::new();
    reconcile(None, &view(&root, VersionId::INITIAL), &mut text);
    assert_eq!(text.text(), "alphabetagamma");

    set_run_text(&root, v(1), 2, 0, "γάμμα");
    {
        let v2 = v(2);
        let _root = root.edit(v2);
        root.push_child(NodeRef::paragraph(vec![NodeRef::linebreak()]));
    }

    reconcile(Some(&view(&root, VersionId::INITIAL)), &view(&root, v(2)), &mut text);
    assert_eq!(text.text(), layout_text(&root, v(2)));
    assert_eq!(text.text(), "alphabetaγάμμα\n");
    assert_eq!(text.len_lines(), 2);
    assert_eq!(text.passes(), 2);

    let styles: Vec<_> = text.paragraph_styles().into_iter().map(|(_, r)| r).collect();
    assert_eq!(styles, vec![0..5, 5..9, 9..14, 14..15]);
}
