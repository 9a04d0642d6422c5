//! Runs every `tests/runs/*.json` fixture: a document snapshot, one command,
//! and what the document and close message should look like afterwards.

use std::collections::BTreeMap;

use datatest_stable::Utf8Path;
use serde::Deserialize;
use spiralgen::layout::find_generated;
use spiralgen::{Config, Document, MemoryDocument, ParameterBag, StaticFetcher, run_on_snapshot};

#[derive(Deserialize)]
struct Fixture {
    command: String,
    #[serde(default)]
    params: Option<ParameterBag>,
    document: serde_json::Value,
    expect: Expect,
}

#[derive(Deserialize)]
struct Expect {
    status: String,
    message: String,
    /// Node name to expected characters
    #[serde(default)]
    texts: BTreeMap<String, String>,
    generated: Option<usize>,
    selected: Option<usize>,
    notifications: Option<Vec<String>>,
}

fn run_fixture(path: &Utf8Path) -> datatest_stable::Result<()> {
    let source = std::fs::read_to_string(path)?;
    let fixture: Fixture = serde_json::from_str(&source)?;
    let doc: MemoryDocument = serde_json::from_value(fixture.document)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (outcome, doc) = runtime.block_on(run_on_snapshot(
        doc,
        StaticFetcher::new(),
        Config::default(),
        &fixture.command,
        fixture.params.as_ref(),
    ));

    let expect = fixture.expect;
    let status = serde_json::to_value(outcome.status)?;
    assert_eq!(status, expect.status.as_str(), "status of {path}");
    assert_eq!(outcome.message, expect.message, "close message of {path}");

    for (name, characters) in &expect.texts {
        assert_eq!(
            doc.text_of(name),
            Some(characters.as_str()),
            "text of `{name}` in {path}"
        );
    }
    if let Some(generated) = expect.generated {
        assert_eq!(find_generated(&doc).len(), generated, "generated shapes in {path}");
    }
    if let Some(selected) = expect.selected {
        assert_eq!(doc.selection().len(), selected, "selection in {path}");
    }
    if let Some(notifications) = expect.notifications {
        assert_eq!(doc.notifications(), notifications.as_slice(), "notifications in {path}");
    }
    Ok(())
}

datatest_stable::harness! {
    { test = run_fixture, root = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/runs"), pattern = r"\.json$" },
}
