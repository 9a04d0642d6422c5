//! Command dispatch.
//!
//! Every run resolves to exactly one [`Outcome`]: completed, aborted with a
//! user-facing message, or failed with the generic failure line after the
//! error has been logged and shown to the user.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::Config;
use crate::controller::generate;
use crate::delegate::{DelegationChannel, InvertColors};
use crate::document::Document;
use crate::errors::PluginError;
use crate::fetch::{Fetcher, fetch_and_render};
use crate::images::{invert_image_colors, place_image};
use crate::log::{info, warn};
use crate::params::ParameterBag;
use crate::text::inspect_selected_text;
use crate::types::Dimensions;

pub const UNKNOWN_COMMAND: &str = "Unknown command";
pub const EMPTY_SELECTION: &str = "Select a node with an image fill";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    GenerateShapes,
    FetchAndRender,
    PlaceImage,
    InvertImageColors,
    InspectSelectedText,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::GenerateShapes,
        Command::FetchAndRender,
        Command::PlaceImage,
        Command::InvertImageColors,
        Command::InspectSelectedText,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::GenerateShapes => "generate-shapes",
            Command::FetchAndRender => "fetch-and-render",
            Command::PlaceImage => "place-image",
            Command::InvertImageColors => "invert-image-colors",
            Command::InspectSelectedText => "inspect-selected-text",
        }
    }

    /// Older name still accepted by dispatch
    pub fn alias(self) -> Option<&'static str> {
        match self {
            Command::GenerateShapes => Some("create-rectangles"),
            Command::FetchAndRender => Some("network-request"),
            Command::PlaceImage => Some("add-image"),
            Command::InvertImageColors => None,
            Command::InspectSelectedText => Some("test-text-nodes"),
        }
    }
}

impl FromStr for Command {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s || c.alias() == Some(s))
            .ok_or_else(|| PluginError::UnknownCommand {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Completed,
    Aborted,
    Failed,
}

/// How a run closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Command name as it was invoked
    pub command: String,
    pub status: Status,
    /// The one close message shown to the user
    pub message: String,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.status == Status::Completed
    }
}

enum Flow {
    Done,
    Abort(String),
}

/// A document plus everything commands need to act on it.
pub struct Plugin<D, F> {
    doc: D,
    fetcher: F,
    config: Config,
    /// Created on the first inversion, then reused
    channel: Option<DelegationChannel>,
}

impl<D: Document, F: Fetcher> Plugin<D, F> {
    pub fn new(doc: D, fetcher: F, config: Config) -> Self {
        Plugin {
            doc,
            fetcher,
            config,
            channel: None,
        }
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn into_document(self) -> D {
        self.doc
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `command`. Hosts pass `None` when the invocation had no
    /// parameters; that is treated like an empty parameter set.
    pub async fn run(&mut self, command: &str, params: Option<&ParameterBag>) -> Outcome {
        info!(command, "running command");
        let empty = ParameterBag::new();
        let params = params.unwrap_or(&empty);

        let result = match command.parse::<Command>() {
            Ok(parsed) => self.dispatch(parsed, params).await,
            Err(_) => Ok(Flow::Abort(UNKNOWN_COMMAND.to_string())),
        };

        let (status, message) = match result {
            Ok(Flow::Done) => (Status::Completed, format!("Completed {command}.")),
            Ok(Flow::Abort(message)) => (Status::Aborted, message),
            Err(err) if err.kind().is_abort() => (Status::Aborted, err.to_string()),
            Err(err) => {
                warn!(command, error = %err, kind = ?err.kind(), "command failed");
                self.doc.notify(&err.to_string());
                (
                    Status::Failed,
                    format!("The command {command} failed. Check the console for more info."),
                )
            }
        };
        info!(command, ?status, %message, "closing");
        Outcome {
            command: command.to_string(),
            status,
            message,
        }
    }

    async fn dispatch(&mut self, command: Command, params: &ParameterBag) -> Result<Flow, PluginError> {
        match command {
            Command::GenerateShapes => {
                let count = params.require_count("count", "Count parameter is required")?;
                let summary = generate(&mut self.doc, count, &self.config.layout).await?;
                info!(
                    generations = summary.generations.len(),
                    shapes = summary.shapes_created(),
                    "generated shapes"
                );
            }
            Command::FetchAndRender => {
                let url = params.require_str("requestUrl", "Request URL parameter is required")?;
                fetch_and_render(&mut self.doc, &self.fetcher, &url, &self.config.default_font)
                    .await?;
            }
            Command::PlaceImage => {
                let url = params.require_str("imageUrl", "Image URL parameter is required")?;
                // both or neither
                let requested = match (params.dimension("width"), params.dimension("height")) {
                    (Some(width), Some(height)) => Some(Dimensions::new(width, height)),
                    _ => None,
                };
                place_image(
                    &mut self.doc,
                    &self.fetcher,
                    &url,
                    requested,
                    self.config.max_image_dimension,
                )
                .await?;
            }
            Command::InvertImageColors => {
                let selection = self.doc.selection();
                if selection.is_empty() {
                    return Ok(Flow::Abort(EMPTY_SELECTION.to_string()));
                }
                let channel = match self.channel.take() {
                    Some(channel) => channel,
                    None => DelegationChannel::spawn(InvertColors, self.config.transform_timeout())?,
                };
                let channel = self.channel.insert(channel);
                for id in selection {
                    invert_image_colors(&mut self.doc, channel, id).await?;
                }
            }
            Command::InspectSelectedText => {
                inspect_selected_text(&mut self.doc).await?;
            }
        }
        Ok(Flow::Done)
    }
}
