//! Preparation of the engine's inputs from a bare DEM: slope and aspect
//! rasters, and filled contour bands.
//!
//! The spacing engine treats these as opaque read-only inputs; hosts with
//! their own terrain derivatives (or better contouring) can skip this
//! module entirely and hand the engine equivalent data.

mod bands;
mod gradient;

pub use bands::filled_bands;
pub use gradient::{aspect_raster, slope_raster};
