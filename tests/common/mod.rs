#![allow(clippy::nursery)] // Test infra prioritizes clarity over pedantry
#![allow(clippy::pedantic)] // Test infra prioritizes clarity over pedantry
#![allow(dead_code)] // Each test binary uses a different subset

pub mod edits;

use std::sync::Once;

use doctree::{LogLevel, NodeRef, VersionId, set_log_callback};

/// Route test output through `tracing` and forward the crate's log hook to it.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
        set_log_callback(|level, message| match level {
            LogLevel::Debug => tracing::debug!(target: "doctree", "{message}"),
            LogLevel::Info => tracing::info!(target: "doctree", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "doctree", "{message}"),
            LogLevel::Error => tracing::error!(target: "doctree", "{message}"),
        });
    });
}

/// Root[Heading[Text("The "), Emphasis[Text("quick ")]], Paragraph[Text("brown ")]]
pub fn quick_brown() -> NodeRef {
    NodeRef::root(vec![
        NodeRef::heading(
            1,
            vec![
                NodeRef::text("The "),
                NodeRef::emphasis(vec![NodeRef::text("quick ")]),
            ],
        ),
        NodeRef::paragraph(vec![NodeRef::text("brown ")]),
    ])
}

/// One paragraph per entry, each holding a single text run.
pub fn paragraphs(texts: &[&str]) -> NodeRef {
    NodeRef::root(
        texts
            .iter()
            .map(|text| NodeRef::paragraph(vec![NodeRef::text(text)]))
            .collect(),
    )
}

/// Replace the text of run `run` in paragraph `paragraph` as one
/// transaction at `version`.
pub fn set_run_text(root: &NodeRef, version: VersionId, paragraph: usize, run: usize, text: &str) {
    let _root = root.edit(version);
    let paragraph = root.child_mut(paragraph);
    let _paragraph = paragraph.edit(version);
    let run = paragraph.child_mut(run);
    let _run = run.edit(version);
    run.set_text(text);
}

pub fn v(raw: u64) -> VersionId {
    VersionId::new(raw)
}
