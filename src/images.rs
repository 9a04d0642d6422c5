//! Image fills: placing fetched images and inverting existing ones.

use std::io::Cursor;

use image::{ImageError, ImageReader};

use crate::delegate::DelegationChannel;
use crate::document::{Document, Node, NodeId, Paint, ScaleMode};
use crate::errors::PluginError;
use crate::fetch::Fetcher;
use crate::log::{debug, info};
use crate::types::Dimensions;

pub const NOT_NUMBERS: &str = "Width and height must be numbers";

/// Intrinsic pixel size of encoded image bytes.
pub fn intrinsic_size(bytes: &[u8]) -> Result<Dimensions, PluginError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::from)?
        .into_dimensions()?;
    Ok(Dimensions::new(f64::from(width), f64::from(height)))
}

/// Reject sizes a rectangle cannot take. The upper bound is checked before
/// the NaN check.
pub fn check_dimensions(dims: Dimensions, max: u32) -> Result<(), PluginError> {
    let limit = f64::from(max);
    if dims.width > limit || dims.height > limit {
        return Err(PluginError::DimensionOutOfRange {
            message: format!("Width and height must not be more than {max} pixels"),
        });
    }
    if dims.width.is_nan() || dims.height.is_nan() {
        return Err(PluginError::DimensionOutOfRange {
            message: NOT_NUMBERS.to_string(),
        });
    }
    if dims.width <= 0.0 || dims.height <= 0.0 {
        return Err(PluginError::Other(format!(
            "cannot size a rectangle to {}x{}",
            dims.width, dims.height
        )));
    }
    Ok(())
}

/// Fetch an image and show it in a new rectangle.
///
/// The rectangle takes `requested` when given, otherwise the image's own
/// size. The image is painted with [`ScaleMode::Fill`].
pub async fn place_image<D, F>(
    doc: &mut D,
    fetcher: &F,
    url: &str,
    requested: Option<Dimensions>,
    max: u32,
) -> Result<NodeId, PluginError>
where
    D: Document + ?Sized,
    F: Fetcher + ?Sized,
{
    let bytes = fetcher.fetch(url).await?;
    let dims = match requested {
        Some(dims) => dims,
        None => intrinsic_size(&bytes)?,
    };
    check_dimensions(dims, max)?;

    let hash = doc.create_image(bytes);
    let id = doc.create_rectangle();
    if let Some(rect) = doc.node_mut(id).and_then(Node::as_rectangle_mut) {
        rect.width = dims.width;
        rect.height = dims.height;
        rect.fills = vec![Paint::Image {
            image_hash: Some(hash),
            scale_mode: ScaleMode::Fill,
        }];
    }
    info!(url, width = dims.width, height = dims.height, "placed image");
    Ok(id)
}

/// Replace every image fill of a rectangle with its inverted copy. Other
/// paints stay where they are. Returns how many fills were inverted.
pub async fn invert_image_colors<D: Document + ?Sized>(
    doc: &mut D,
    channel: &DelegationChannel,
    id: NodeId,
) -> Result<usize, PluginError> {
    let Some(fills) = doc.node(id).and_then(Node::as_rectangle).map(|r| r.fills.clone()) else {
        return Ok(0);
    };

    let mut inverted = 0;
    let mut new_fills = Vec::with_capacity(fills.len());
    for paint in fills {
        match paint {
            Paint::Image {
                image_hash: Some(hash),
                scale_mode,
            } => {
                let bytes = doc.image_bytes(&hash).await?;
                let bytes = channel.transform(bytes).await?;
                new_fills.push(Paint::Image {
                    image_hash: Some(doc.create_image(bytes)),
                    scale_mode,
                });
                inverted += 1;
            }
            other => new_fills.push(other),
        }
    }

    if let Some(rect) = doc.node_mut(id).and_then(Node::as_rectangle_mut) {
        rect.fills = new_fills;
    }
    debug!(node = id.0, inverted, "inverted image fills");
    Ok(inverted)
}
