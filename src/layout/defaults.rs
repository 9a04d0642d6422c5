//! Default layout settings

use crate::types::Rgb;

/// Width a generated shape occupies along the spiral
pub const SHAPE_FOOTPRINT: f64 = 100.0;
/// Radians between consecutive shapes
pub const ANGLE_STEP: f64 = 0.1;
/// Opacity multiplier applied to every generated shape per generation
pub const OPACITY_DECAY: f64 = 0.84;
/// Counter multiplier between generations
pub const COUNT_DECAY: f64 = 0.76;
/// Counts at or below this end the run
pub const TERMINAL_COUNT: f64 = 2.0;

/// Fill of every generated shape. Doubles as the provenance fingerprint,
/// so it is not configurable.
pub const FINGERPRINT: Rgb = Rgb::new(1.0, 0.5, 0.0);
