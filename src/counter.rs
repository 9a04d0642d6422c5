//! Persisted scalars kept as text inside document nodes.
//!
//! A run's only durable state is two text nodes, `"Count"` and
//! `"Distance"`. Reading and writing them needs the node's font loaded, which
//! is done once per store and remembered.

use crate::document::{Document, Node, NodeId, TextFont};
use crate::errors::PluginError;
use crate::log::debug;
use crate::types::Scalar;

pub const COUNT_NODE: &str = "Count";
pub const DISTANCE_NODE: &str = "Distance";

/// Which persisted scalar to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Searched for anywhere on the page
    Count,
    /// Only searched for among the page's direct children
    Distance,
}

impl Slot {
    pub fn node_name(self) -> &'static str {
        match self {
            Slot::Count => COUNT_NODE,
            Slot::Distance => DISTANCE_NODE,
        }
    }

    fn locate<D: Document + ?Sized>(self, doc: &D) -> Option<NodeId> {
        let name = self.node_name();
        let named = move |n: &Node| n.name == name;
        let found = match self {
            Slot::Count => doc.find_one(&named),
            Slot::Distance => doc.find_child(&named),
        };
        // only the first node carrying the name counts, and it has to be text
        found.filter(|id| doc.node(*id).is_some_and(|n| n.as_text().is_some()))
    }
}

/// Reads and writes the persisted scalars of one run.
#[derive(Debug, Default)]
pub struct CounterStore {
    count: Option<NodeId>,
    distance: Option<NodeId>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cached(&mut self, slot: Slot) -> &mut Option<NodeId> {
        match slot {
            Slot::Count => &mut self.count,
            Slot::Distance => &mut self.distance,
        }
    }

    /// Find the slot's node and make it editable. `None` when the document
    /// has no such node.
    async fn prepare<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        slot: Slot,
    ) -> Result<Option<NodeId>, PluginError> {
        if let Some(id) = *self.cached(slot) {
            if doc.node(id).is_some() {
                return Ok(Some(id));
            }
        }

        let Some(id) = slot.locate(&*doc) else {
            return Ok(None);
        };
        let font = match doc.node(id).and_then(Node::as_text).map(|t| &t.font) {
            Some(TextFont::Uniform(font)) => font.clone(),
            Some(TextFont::Mixed(_)) => {
                return Err(PluginError::unavailable(
                    format!("node `{}`", slot.node_name()),
                    "it mixes several fonts",
                ));
            }
            None => return Ok(None),
        };
        doc.load_font(&font).await.map_err(|e| {
            PluginError::unavailable(format!("node `{}`", slot.node_name()), e.to_string())
        })?;

        debug!(slot = slot.node_name(), node = id.0, "prepared persisted scalar");
        *self.cached(slot) = Some(id);
        Ok(Some(id))
    }

    /// Whether the document has a node for this slot.
    pub async fn exists<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        slot: Slot,
    ) -> Result<bool, PluginError> {
        Ok(self.prepare(doc, slot).await?.is_some())
    }

    /// Current value; `0` when the node does not exist, NaN when its text is
    /// not a number.
    pub async fn get<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        slot: Slot,
    ) -> Result<Scalar, PluginError> {
        let Some(id) = self.prepare(doc, slot).await? else {
            return Ok(Scalar::ZERO);
        };
        let text = doc
            .node(id)
            .and_then(Node::as_text)
            .map(|t| t.characters.as_str())
            .unwrap_or_default();
        Ok(Scalar::parse_lenient(text))
    }

    /// Overwrite the node's text with `value`. Returns `false` when the node
    /// does not exist and nothing was written.
    pub async fn set<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        slot: Slot,
        value: Scalar,
    ) -> Result<bool, PluginError> {
        let Some(id) = self.prepare(doc, slot).await? else {
            return Ok(false);
        };
        debug!(slot = slot.node_name(), value = %value, "persisting scalar");
        doc.set_characters(id, &value.to_canonical())?;
        Ok(true)
    }
}
