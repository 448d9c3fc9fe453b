// SPDX-License-Identifier: MPL-2.0

//! Media handling between the camera and the decode engine
//!
//! # Surfaces
//!
//! A [`VideoSurface`] is the target a stream gets attached to. It waits for
//! the first frame to learn the intrinsic video size and then exposes the
//! latest frame while playing.
//!
//! # Rasterization
//!
//! A [`FrameSink`] draws a (possibly cropped) frame into a reusable buffer
//! and encodes it into a [`StillImage`]. [`RasterCanvas`] is the bundled
//! RGBA/PNG implementation.
//!
//! # Modules
//!
//! - [`raster`]: frame sink trait, canvas, still images
//! - [`surface`]: capture surface with readiness wait

pub mod raster;
pub mod surface;

pub use raster::{FrameSink, PixelRect, RasterCanvas, StillImage};
pub use surface::VideoSurface;
