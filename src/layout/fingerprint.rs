//! Recognising shapes this plugin created.
//!
//! Generated shapes carry no id or tag. They are recognised by their first
//! fill: solid, exactly [`FINGERPRINT`]. A user shape painted the same
//! colour is indistinguishable and will be treated as generated.

use crate::document::{Document, Node, NodeId, Paint};

use super::defaults::FINGERPRINT;

/// Whether a node looks like one of ours.
pub fn is_generated(node: &Node) -> bool {
    let Some(rect) = node.as_rectangle() else {
        return false;
    };
    matches!(
        rect.fills.first(),
        Some(Paint::Solid { color }) if color.same_as(&FINGERPRINT)
    )
}

/// Every generated shape on the page, in document order.
pub fn find_generated<D: Document + ?Sized>(doc: &D) -> Vec<NodeId> {
    doc.find_all(&is_generated)
}
