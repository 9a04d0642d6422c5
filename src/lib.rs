//! Procedural shape generation for design documents.
//!
//! A run places orange rectangles along a spiral, fades earlier generations
//! and shrinks a counter persisted in the document until it bottoms out.
//! Image work is delegated to a sandbox over a correlated request channel.

pub mod commands;
pub mod config;
pub mod controller;
pub mod counter;
pub mod delegate;
pub mod document;
pub mod errors;
pub mod fetch;
pub mod images;
pub mod layout;
pub mod log;
pub mod params;
pub mod suggest;
pub mod text;
pub mod types;

pub use commands::{Command, Outcome, Plugin, Status};
pub use config::{Config, LayoutConfig};
pub use controller::{RunSummary, generate};
pub use document::{Document, MemoryDocument};
pub use errors::{ErrorKind, PluginError};
pub use fetch::{Fetcher, StaticFetcher};
pub use params::ParameterBag;

/// Run one command against an in-memory document snapshot.
///
/// Returns the close outcome and the document as it was left.
pub async fn run_on_snapshot<F: Fetcher>(
    snapshot: MemoryDocument,
    fetcher: F,
    config: Config,
    command: &str,
    params: Option<&ParameterBag>,
) -> (Outcome, MemoryDocument) {
    let mut plugin = Plugin::new(snapshot, fetcher, config);
    let outcome = plugin.run(command, params).await;
    (outcome, plugin.into_document())
}
