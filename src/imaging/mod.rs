//! Image transcoding for the scanner display.
//!
//! The scanners render raw RGB565 framebuffers, so every proxied image goes
//! through two steps: a decode-and-cover-resize pass producing an RGB888
//! raster at the exact requested dimensions, then a lossless repack of that
//! raster into 16-bit pixels.

pub mod pixel;
pub mod transform;
