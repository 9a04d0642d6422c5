//! The host document, seen through the capabilities the plugin consumes.
//!
//! The plugin never owns the document. It finds nodes, mutates a handful of
//! properties, creates rectangles, text and images, and moves the selection.
//! Everything else about the host stays behind [`Document`].

pub mod memory;

pub use memory::MemoryDocument;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PluginError;
use crate::types::{Opacity, Rgb};

/// Host-assigned node identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of an image resource owned by the host
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHash(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        FontName {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl std::fmt::Display for FontName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleMode {
    #[default]
    Fill,
    Fit,
    Crop,
    Tile,
}

/// A single entry of a node's fill list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Paint {
    Solid {
        color: Rgb,
    },
    Image {
        #[serde(rename = "imageHash")]
        image_hash: Option<ImageHash>,
        #[serde(rename = "scaleMode", default)]
        scale_mode: ScaleMode,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RectangleNode {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub opacity: Opacity,
    #[serde(default)]
    pub fills: Vec<Paint>,
}

impl Default for RectangleNode {
    /// Hosts create rectangles 100x100 at the origin with a white fill.
    fn default() -> Self {
        RectangleNode {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            opacity: Opacity::OPAQUE,
            fills: vec![Paint::Solid {
                color: Rgb::new(1.0, 1.0, 1.0),
            }],
        }
    }
}

/// A run of characters sharing one font
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSegment {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "fontName")]
    pub font_name: FontName,
}

/// Font of a text node: either one font or per-range segments
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFont {
    Uniform(FontName),
    Mixed(Vec<FontSegment>),
}

impl TextFont {
    /// Every distinct font the node needs loaded before mutation.
    pub fn required(&self) -> Vec<&FontName> {
        match self {
            TextFont::Uniform(font) => vec![font],
            TextFont::Mixed(segments) => {
                let mut fonts: Vec<&FontName> = Vec::new();
                for segment in segments {
                    if !fonts.contains(&&segment.font_name) {
                        fonts.push(&segment.font_name);
                    }
                }
                fonts
            }
        }
    }
}

/// A run of characters sharing one size
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeSegment {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "fontSize")]
    pub font_size: f64,
}

/// Point size of a text node. A bare number in snapshots is uniform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontSize {
    Uniform(f64),
    Mixed(Vec<SizeSegment>),
}

impl Default for FontSize {
    fn default() -> Self {
        FontSize::Uniform(12.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub characters: String,
    pub font: TextFont,
    #[serde(default)]
    pub font_size: FontSize,
    #[serde(default)]
    pub text_align_horizontal: HorizontalAlign,
    #[serde(default)]
    pub text_align_vertical: VerticalAlign,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Rectangle(RectangleNode),
    Text(TextNode),
    Frame,
}

/// A node in the page tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    /// `None` for direct children of the page
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn as_rectangle(&self) -> Option<&RectangleNode> {
        match &self.kind {
            NodeKind::Rectangle(rect) => Some(rect),
            _ => None,
        }
    }

    pub fn as_rectangle_mut(&mut self) -> Option<&mut RectangleNode> {
        match &mut self.kind {
            NodeKind::Rectangle(rect) => Some(rect),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextNode> {
        match &mut self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Capabilities the plugin needs from its host document.
///
/// Lookups walk the current page. `find_all` and `find_one` descend into
/// frames depth-first in document order; `find_child` only looks at the
/// page's direct children.
#[async_trait]
pub trait Document: Send + Sync {
    fn find_all(&self, predicate: &dyn Fn(&Node) -> bool) -> Vec<NodeId>;

    fn find_one(&self, predicate: &dyn Fn(&Node) -> bool) -> Option<NodeId>;

    fn find_child(&self, predicate: &dyn Fn(&Node) -> bool) -> Option<NodeId>;

    fn node(&self, id: NodeId) -> Option<&Node>;

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node>;

    /// Create a default rectangle appended to the page.
    fn create_rectangle(&mut self) -> NodeId;

    /// Create an empty text node in the host's default font.
    fn create_text(&mut self) -> NodeId;

    /// Make a font usable for text mutation. Suspends while the host loads it.
    async fn load_font(&mut self, font: &FontName) -> Result<(), PluginError>;

    /// Replace a text node's characters. Every font the node uses must have
    /// been loaded first.
    fn set_characters(&mut self, id: NodeId, characters: &str) -> Result<(), PluginError>;

    /// Assign a font to a character range of a text node.
    fn set_range_font(
        &mut self,
        id: NodeId,
        start: usize,
        end: usize,
        font: &FontName,
    ) -> Result<(), PluginError>;

    fn selection(&self) -> Vec<NodeId>;

    fn set_selection(&mut self, nodes: Vec<NodeId>);

    fn scroll_and_zoom_into_view(&mut self, nodes: &[NodeId]);

    /// Raw bytes of an image resource.
    async fn image_bytes(&self, hash: &ImageHash) -> Result<Vec<u8>, PluginError>;

    /// Register new image bytes, returning the content hash that paints use.
    fn create_image(&mut self, bytes: Vec<u8>) -> ImageHash;

    /// Show a transient message to the user.
    fn notify(&mut self, message: &str);
}
