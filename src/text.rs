//! Text node helpers: populating new nodes and inspecting selected ones.

use serde::Serialize;

use crate::document::{
    Document, FontName, FontSegment, FontSize, HorizontalAlign, Node, NodeId, SizeSegment,
    TextFont, VerticalAlign,
};
use crate::errors::PluginError;
use crate::log::info;

pub const NO_MIXED_FONTS: &str = "No mixed fonts found so we won't cycle them";

/// Create a text node in `font` holding `text`.
pub async fn add_populated_text_node<D: Document + ?Sized>(
    doc: &mut D,
    text: &str,
    font: &FontName,
) -> Result<NodeId, PluginError> {
    let id = doc.create_text();
    if let Some(node) = doc.node_mut(id).and_then(Node::as_text_mut) {
        node.font = TextFont::Uniform(font.clone());
    }
    doc.load_font(font).await?;
    doc.set_characters(id, text)?;
    Ok(id)
}

/// Font column of a [`TextDescription`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FontLabel {
    Named(FontName),
    /// Always `"mixed"`
    Mixed(&'static str),
}

/// Size column of a [`TextDescription`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SizeLabel {
    Points(f64),
    /// Always `"mixed"`
    Mixed(&'static str),
}

/// Snapshot of a selected text node's typography
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDescription {
    pub node: NodeId,
    pub characters: String,
    pub font_name: FontLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fonts: Option<Vec<FontSegment>>,
    pub font_size: SizeLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<SizeSegment>>,
    pub text_align_horizontal: HorizontalAlign,
    pub text_align_vertical: VerticalAlign,
}

impl TextDescription {
    pub fn of(node: &Node) -> Option<Self> {
        let text = node.as_text()?;
        let (font_name, fonts) = match &text.font {
            TextFont::Uniform(font) => (FontLabel::Named(font.clone()), None),
            TextFont::Mixed(segments) => (FontLabel::Mixed("mixed"), Some(segments.clone())),
        };
        let (font_size, sizes) = match &text.font_size {
            FontSize::Uniform(points) => (SizeLabel::Points(*points), None),
            FontSize::Mixed(segments) => (SizeLabel::Mixed("mixed"), Some(segments.clone())),
        };
        Some(TextDescription {
            node: node.id,
            characters: text.characters.clone(),
            font_name,
            fonts,
            font_size,
            sizes,
            text_align_horizontal: text.text_align_horizontal,
            text_align_vertical: text.text_align_vertical,
        })
    }
}

/// Describe every selected text node, then rotate its fonts.
///
/// Non-text selections are skipped.
pub async fn inspect_selected_text<D: Document + ?Sized>(
    doc: &mut D,
) -> Result<Vec<TextDescription>, PluginError> {
    let mut described = Vec::new();
    for id in doc.selection() {
        let Some(description) = doc.node(id).and_then(TextDescription::of) else {
            continue;
        };
        info!(?description, "selected text");
        cycle_fonts(doc, id, &description).await?;
        described.push(description);
    }
    Ok(described)
}

/// Segment `i` takes the font of segment `i + 1`, wrapping around.
async fn cycle_fonts<D: Document + ?Sized>(
    doc: &mut D,
    id: NodeId,
    description: &TextDescription,
) -> Result<(), PluginError> {
    match (&description.font_name, &description.fonts) {
        (_, Some(segments)) if !segments.is_empty() => {
            for segment in segments {
                doc.load_font(&segment.font_name).await?;
            }
            for (i, segment) in segments.iter().enumerate() {
                let next = &segments[(i + 1) % segments.len()];
                doc.set_range_font(id, segment.start, segment.end, &next.font_name)?;
            }
        }
        (FontLabel::Named(font), _) => {
            doc.load_font(font).await?;
            doc.notify(NO_MIXED_FONTS);
        }
        _ => doc.notify(NO_MIXED_FONTS),
    }
    Ok(())
}
