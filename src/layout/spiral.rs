//! Spiral placement and opacity decay

use glam::dvec2;

use crate::config::LayoutConfig;
use crate::document::{Document, NodeId, Paint};
use crate::types::Point;

use super::defaults::FINGERPRINT;
use super::fingerprint::find_generated;

/// Places shapes along an Archimedean spiral.
///
/// Shape `i` sits at angle `angle_step * i` and radius `separation * angle`,
/// so the first shape of every batch lands on the origin and the spiral's
/// pitch grows with `separation`.
#[derive(Debug, Clone, Copy)]
pub struct SpiralLayout {
    angle_step: f64,
    opacity_decay: f64,
}

impl Default for SpiralLayout {
    fn default() -> Self {
        SpiralLayout::new(&LayoutConfig::default())
    }
}

impl SpiralLayout {
    pub fn new(config: &LayoutConfig) -> Self {
        SpiralLayout {
            angle_step: config.angle_step,
            opacity_decay: config.opacity_decay,
        }
    }

    /// Position of the `index`-th shape of a batch.
    pub fn place(&self, index: usize, separation: f64) -> Point {
        let angle = self.angle_step * index as f64;
        let radius = separation * angle;
        dvec2(radius * angle.cos(), radius * angle.sin())
    }

    /// Create `count` fingerprinted rectangles along the spiral.
    pub fn emit<D: Document + ?Sized>(
        &self,
        doc: &mut D,
        count: usize,
        separation: f64,
    ) -> Vec<NodeId> {
        (0..count)
            .map(|i| {
                let pos = self.place(i, separation);
                let id = doc.create_rectangle();
                if let Some(rect) = doc.node_mut(id).and_then(|n| n.as_rectangle_mut()) {
                    rect.x = pos.x;
                    rect.y = pos.y;
                    rect.fills = vec![Paint::Solid { color: FINGERPRINT }];
                }
                id
            })
            .collect()
    }

    /// Fade every generated shape on the page by one step. Returns how many
    /// shapes were touched.
    pub fn decay<D: Document + ?Sized>(&self, doc: &mut D) -> usize {
        let generated = find_generated(doc);
        for id in &generated {
            if let Some(rect) = doc.node_mut(*id).and_then(|n| n.as_rectangle_mut()) {
                rect.opacity = rect.opacity.scaled(self.opacity_decay);
            }
        }
        generated.len()
    }
}
