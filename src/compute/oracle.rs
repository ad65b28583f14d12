//! Renderer and iterator oracles used by the statistical helpers.
//!
//! The breeder only needs pixels and orbit points; how they are produced is
//! up to the implementation. `ChaosGame` is the in-crate reference.

use crate::schema::{Genome, VariationId};

use super::RandomSource;

/// A 2D orbit sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Render request options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderSettings {
    /// Render at quality 1, supersample 1 and no density estimation.
    pub proxy: bool,
    /// Upper bound on total samples drawn.
    pub max_samples: Option<usize>,
}

impl RenderSettings {
    /// Fast low-fidelity settings.
    pub fn proxy() -> Self {
        Self {
            proxy: true,
            max_samples: None,
        }
    }
}

/// Interleaved 8-bit pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub pixels: Vec<u8>,
}

impl RenderedImage {
    /// Image of `width * height` pixels filled with `fill`.
    pub fn filled(width: usize, height: usize, fill: &[u8]) -> Self {
        Self {
            width,
            height,
            channels: fill.len(),
            pixels: fill.repeat(width * height),
        }
    }

    /// The first three channels of every pixel.
    pub fn rgb(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.pixels
            .chunks_exact(self.channels.max(1))
            .filter(|px| px.len() >= 3)
            .map(|px| [px[0], px[1], px[2]])
    }
}

/// Renderer or iterator failure.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Genome has no xforms")]
    EmptyGenome,
    #[error("Genome xform weights sum to zero")]
    ZeroWeight,
    #[error("Invalid raster size {width}x{height}")]
    InvalidRaster { width: usize, height: usize },
    #[error("Variation {0} is not in the catalog")]
    UnknownVariation(VariationId),
    #[error("Render failed: {0}")]
    Failed(String),
}

/// Produces an image from a genome. Calls block until the image is complete.
pub trait Renderer {
    fn render(
        &mut self,
        genome: &Genome,
        settings: &RenderSettings,
    ) -> Result<RenderedImage, OracleError>;

    /// Worker threads used per render.
    fn thread_count(&self) -> usize;

    /// Channels per output pixel.
    fn channels(&self) -> usize;
}

/// Produces raw orbit points from a genome.
pub trait PointIterator {
    /// Fill `out` with `count` points after `warmup` discarded iterations.
    /// Returns the number of escaped (non-finite or divergent) iterations.
    fn iterate(
        &mut self,
        genome: &Genome,
        count: usize,
        warmup: usize,
        rng: &mut RandomSource,
        out: &mut Vec<Point>,
    ) -> Result<usize, OracleError>;
}
