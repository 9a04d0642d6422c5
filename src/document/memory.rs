//! In-memory document used by tests and the headless host.
//!
//! Snapshots are plain JSON. Image bytes are stored base64-encoded.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{
    Document, FontName, FontSegment, FontSize, ImageHash, Node, NodeId, NodeKind, RectangleNode, TextFont,
    TextNode,
};
use crate::errors::{PluginError, SourceContext};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct StoredImage {
    hash: ImageHash,
    #[serde(with = "base64_bytes")]
    bytes: Vec<u8>,
}

/// Nodes in insertion order, indexed by id. Serialized as a plain list.
#[derive(Clone, Debug, Default)]
struct NodeTable {
    nodes: Vec<Node>,
    /// First position of each id
    index: HashMap<NodeId, usize>,
    last_id: u64,
}

impl NodeTable {
    fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id).or_insert(i);
        }
        let last_id = nodes.iter().map(|n| n.id.0).max().unwrap_or(0);
        NodeTable {
            nodes,
            index,
            last_id,
        }
    }

    fn push(&mut self, name: &str, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        self.last_id += 1;
        let id = NodeId(self.last_id);
        self.index.insert(id, self.nodes.len());
        self.nodes.push(Node {
            id,
            name: name.to_string(),
            parent,
            kind,
        });
        id
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.index.get(&id).map(|&i| &mut self.nodes[i])
    }

    /// Positions in depth-first pre-order from the page.
    fn document_order(&self) -> Vec<usize> {
        let mut children: HashMap<Option<NodeId>, Vec<usize>> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            children.entry(node.parent).or_default().push(i);
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut seen = HashSet::with_capacity(self.nodes.len());
        self.walk(&children, None, &mut seen, &mut out);
        out
    }

    fn walk(
        &self,
        children: &HashMap<Option<NodeId>, Vec<usize>>,
        parent: Option<NodeId>,
        seen: &mut HashSet<NodeId>,
        out: &mut Vec<usize>,
    ) {
        for &i in children.get(&parent).into_iter().flatten() {
            let id = self.nodes[i].id;
            // Malformed snapshots may contain parent cycles
            if !seen.insert(id) {
                continue;
            }
            out.push(i);
            self.walk(children, Some(id), seen, out);
        }
    }
}

impl Serialize for NodeTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.nodes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Node>::deserialize(deserializer).map(NodeTable::from_nodes)
    }
}

/// A page of nodes plus the bits of host state the plugin touches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryDocument {
    #[serde(default)]
    nodes: NodeTable,
    #[serde(default)]
    selection: Vec<NodeId>,
    #[serde(default)]
    images: Vec<StoredImage>,
    /// Fonts the host cannot load
    #[serde(default)]
    missing_fonts: Vec<FontName>,
    #[serde(default = "default_font")]
    default_font: FontName,
    /// Nodes last scrolled into view
    #[serde(default)]
    viewport: Vec<NodeId>,
    #[serde(default)]
    notifications: Vec<String>,
    #[serde(skip)]
    loaded_fonts: Vec<FontName>,
    #[serde(skip)]
    font_loads: usize,
}

fn default_font() -> FontName {
    FontName::new("Inter", "Regular")
}

impl Default for MemoryDocument {
    fn default() -> Self {
        MemoryDocument {
            nodes: NodeTable::default(),
            selection: Vec::new(),
            images: Vec::new(),
            missing_fonts: Vec::new(),
            default_font: default_font(),
            viewport: Vec::new(),
            notifications: Vec::new(),
            loaded_fonts: Vec::new(),
            font_loads: 0,
        }
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot, pointing at the offending byte on failure.
    pub fn from_json(name: &str, source: &str) -> Result<Self, PluginError> {
        let ctx = SourceContext::new(name, source);
        serde_json::from_str(source).map_err(|e| ctx.json_error(&e))
    }

    pub fn to_json(&self) -> Result<String, PluginError> {
        serde_json::to_string_pretty(self).map_err(|e| PluginError::Other(e.to_string()))
    }

    /// Mark a font as one the host cannot load.
    pub fn with_missing_font(mut self, font: FontName) -> Self {
        self.missing_fonts.push(font);
        self
    }

    /// Insert a node under `parent` (or the page), returning its id.
    pub fn insert(&mut self, name: &str, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        self.nodes.push(name, parent, kind)
    }

    /// Add a page-level text node in the default font.
    pub fn add_text(&mut self, name: &str, characters: &str) -> NodeId {
        let font = self.default_font.clone();
        self.add_text_in(name, None, characters, TextFont::Uniform(font))
    }

    pub fn add_text_in(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        characters: &str,
        font: TextFont,
    ) -> NodeId {
        self.insert(
            name,
            parent,
            NodeKind::Text(TextNode {
                characters: characters.to_string(),
                font,
                font_size: FontSize::default(),
                text_align_horizontal: Default::default(),
                text_align_vertical: Default::default(),
            }),
        )
    }

    pub fn add_rectangle(&mut self, name: &str, rect: RectangleNode) -> NodeId {
        self.insert(name, None, NodeKind::Rectangle(rect))
    }

    pub fn add_frame(&mut self, name: &str) -> NodeId {
        self.insert(name, None, NodeKind::Frame)
    }

    /// Characters of the first node with this name, anywhere on the page.
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.nodes
            .nodes
            .iter()
            .find(|n| n.name == name)
            .and_then(Node::as_text)
            .map(|t| t.characters.as_str())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes.nodes
    }

    pub fn viewport(&self) -> &[NodeId] {
        &self.viewport
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    /// How many times a font load was requested.
    pub fn font_loads(&self) -> usize {
        self.font_loads
    }

    pub fn image(&self, hash: &ImageHash) -> Option<&[u8]> {
        self.images
            .iter()
            .find(|img| &img.hash == hash)
            .map(|img| img.bytes.as_slice())
    }

    fn require_loaded(&self, font: &FontName) -> Result<(), PluginError> {
        if self.loaded_fonts.contains(font) {
            Ok(())
        } else {
            Err(PluginError::unavailable(
                format!("font {font}"),
                "font must be loaded before editing text",
            ))
        }
    }

    fn text_mut(&mut self, id: NodeId) -> Result<&mut TextNode, PluginError> {
        self.nodes
            .get_mut(id)
            .ok_or(PluginError::MissingNode { id: id.0 })?
            .as_text_mut()
            .ok_or_else(|| PluginError::Other(format!("node {id} is not a text node")))
    }
}

/// Per-character fonts, recompressed into segments.
fn assign_range(text: &TextNode, start: usize, end: usize, font: &FontName) -> TextFont {
    let len = text.characters.chars().count();
    let mut per_char: Vec<&FontName> = match &text.font {
        TextFont::Uniform(f) => vec![f; len],
        TextFont::Mixed(segments) => (0..len)
            .map(|i| {
                segments
                    .iter()
                    .find(|s| s.start <= i && i < s.end)
                    .or(segments.last())
                    .map(|s| &s.font_name)
                    .unwrap_or(font)
            })
            .collect(),
    };
    for slot in per_char.iter_mut().take(end.min(len)).skip(start) {
        *slot = font;
    }

    let mut segments: Vec<FontSegment> = Vec::new();
    for (i, f) in per_char.into_iter().enumerate() {
        match segments.last_mut() {
            Some(last) if &last.font_name == f => last.end = i + 1,
            _ => segments.push(FontSegment {
                start: i,
                end: i + 1,
                font_name: f.clone(),
            }),
        }
    }
    match segments.len() {
        0 => TextFont::Uniform(font.clone()),
        1 => TextFont::Uniform(segments.remove(0).font_name),
        _ => TextFont::Mixed(segments),
    }
}

fn content_hash(bytes: &[u8]) -> ImageHash {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    let lo = hasher.finish();
    bytes.len().hash(&mut hasher);
    let hi = hasher.finish();
    ImageHash(format!("{hi:016x}{lo:016x}"))
}

#[async_trait]
impl Document for MemoryDocument {
    fn find_all(&self, predicate: &dyn Fn(&Node) -> bool) -> Vec<NodeId> {
        let nodes = &self.nodes.nodes;
        self.nodes
            .document_order()
            .into_iter()
            .map(|i| &nodes[i])
            .filter(|n| predicate(n))
            .map(|n| n.id)
            .collect()
    }

    fn find_one(&self, predicate: &dyn Fn(&Node) -> bool) -> Option<NodeId> {
        let nodes = &self.nodes.nodes;
        self.nodes
            .document_order()
            .into_iter()
            .map(|i| &nodes[i])
            .find(|n| predicate(n))
            .map(|n| n.id)
    }

    fn find_child(&self, predicate: &dyn Fn(&Node) -> bool) -> Option<NodeId> {
        self.nodes
            .nodes
            .iter()
            .find(|n| n.parent.is_none() && predicate(n))
            .map(|n| n.id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    fn create_rectangle(&mut self) -> NodeId {
        self.insert("Rectangle", None, NodeKind::Rectangle(RectangleNode::default()))
    }

    fn create_text(&mut self) -> NodeId {
        let font = self.default_font.clone();
        self.add_text_in("", None, "", TextFont::Uniform(font))
    }

    async fn load_font(&mut self, font: &FontName) -> Result<(), PluginError> {
        self.font_loads += 1;
        if self.missing_fonts.contains(font) {
            return Err(PluginError::unavailable(
                format!("font {font}"),
                "the host does not have this font",
            ));
        }
        if !self.loaded_fonts.contains(font) {
            self.loaded_fonts.push(font.clone());
        }
        Ok(())
    }

    fn set_characters(&mut self, id: NodeId, characters: &str) -> Result<(), PluginError> {
        let required: Vec<FontName> = {
            let node = self.node(id).ok_or(PluginError::MissingNode { id: id.0 })?;
            let text = node
                .as_text()
                .ok_or_else(|| PluginError::Other(format!("node {id} is not a text node")))?;
            text.font.required().into_iter().cloned().collect()
        };
        for font in &required {
            self.require_loaded(font)?;
        }

        let text = self.text_mut(id)?;
        // The whole text takes the font of its first character
        let first_font = match &text.font {
            TextFont::Mixed(segments) => segments.first().map(|s| s.font_name.clone()),
            TextFont::Uniform(_) => None,
        };
        if let Some(font) = first_font {
            text.font = TextFont::Uniform(font);
        }
        if let FontSize::Mixed(segments) = &text.font_size {
            let first = segments.first().map_or(12.0, |s| s.font_size);
            text.font_size = FontSize::Uniform(first);
        }
        text.characters = characters.to_string();
        Ok(())
    }

    fn set_range_font(
        &mut self,
        id: NodeId,
        start: usize,
        end: usize,
        font: &FontName,
    ) -> Result<(), PluginError> {
        self.require_loaded(font)?;
        let text = self.text_mut(id)?;
        text.font = assign_range(text, start, end, font);
        Ok(())
    }

    fn selection(&self) -> Vec<NodeId> {
        self.selection.clone()
    }

    fn set_selection(&mut self, nodes: Vec<NodeId>) {
        self.selection = nodes;
    }

    fn scroll_and_zoom_into_view(&mut self, nodes: &[NodeId]) {
        self.viewport = nodes.to_vec();
    }

    async fn image_bytes(&self, hash: &ImageHash) -> Result<Vec<u8>, PluginError> {
        self.image(hash)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| PluginError::Other(format!("no image with hash {}", hash.0)))
    }

    fn create_image(&mut self, bytes: Vec<u8>) -> ImageHash {
        let hash = content_hash(&bytes);
        if self.image(&hash).is_none() {
            self.images.push(StoredImage {
                hash: hash.clone(),
                bytes,
            });
        }
        hash
    }

    fn notify(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
