//! Spiral placement of generated shapes
//!
//! This module is organized into submodules:
//! - `defaults`: layout constants and the fingerprint colour
//! - `spiral`: placement, batch emission and opacity decay
//! - `fingerprint`: telling generated shapes apart from user content

pub mod defaults;
pub mod fingerprint;
pub mod spiral;

pub use fingerprint::{find_generated, is_generated};
pub use spiral::SpiralLayout;
