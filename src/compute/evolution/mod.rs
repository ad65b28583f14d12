//! Evolutionary operators for flame genomes.
//!
//! # Overview
//!
//! [`Breeder`] is the composition root: it owns one random source, handles
//! to the variation and palette catalogs, a renderer/iterator oracle, an
//! interpolator and a sample buffer. Operators live in their own files as
//! further `impl` blocks:
//!
//! - **Randomizer** (`random`): structurally random genomes
//! - **Mutation** (`mutate`): seven mutation modes
//! - **Crossover** (`crossover`): union, interpolate, alternate
//! - **Color improvement** (`improve`): hill-climbing on color diversity
//! - **Bounds** (`bounds`): trimmed bounding box from orbit samples
//!
//! A breeder is not meant to be shared between threads; run one per worker.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flame_evolve::animation::LinearInterpolator;
//! use flame_evolve::compute::{ChaosGame, PaletteCatalog, VariationCatalog};
//! use flame_evolve::compute::evolution::{Breeder, MutationMode};
//! use flame_evolve::schema::BreederConfig;
//!
//! let variations = Arc::new(VariationCatalog::builtin());
//! let palettes = Arc::new(PaletteCatalog::builtin());
//! let renderer = ChaosGame::new(Arc::clone(&variations), [1, 2, 3]);
//! let config = BreederConfig { seed: Some([1, 2, 3]), ..Default::default() };
//!
//! let mut breeder =
//!     Breeder::new(config, variations, palettes, renderer, LinearInterpolator).unwrap();
//! let mut genome = breeder.random_genome(None);
//! let description = breeder.mutate(&mut genome, Some(MutationMode::PostXforms), 0).unwrap();
//! println!("{description}");
//! ```

mod bounds;
mod crossover;
mod improve;
mod mutate;
mod random;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::compute::{OracleError, PaletteCatalog, Point, RandomSource, VariationCatalog};
use crate::schema::{BreederConfig, ConfigError, PaletteError};

pub use bounds::BoundingBox;
pub use crossover::CrossMode;
pub use mutate::MutationMode;

/// Errors surfaced by breeder construction and operators.
#[derive(Debug, thiserror::Error)]
pub enum BreederError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Variation catalog is empty")]
    EmptyVariationCatalog,
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Owns everything the operators need. `R` is the renderer/iterator oracle,
/// `I` the structural interpolator.
pub struct Breeder<R, I> {
    rng: RandomSource,
    variations: Arc<VariationCatalog>,
    palettes: Arc<PaletteCatalog>,
    renderer: R,
    interpolator: I,
    samples: Vec<Point>,
    config: BreederConfig,
}

impl<R, I> Breeder<R, I> {
    /// Validate the configuration and catalogs, then seed the random source.
    pub fn new(
        config: BreederConfig,
        variations: Arc<VariationCatalog>,
        palettes: Arc<PaletteCatalog>,
        renderer: R,
        interpolator: I,
    ) -> Result<Self, BreederError> {
        config.validate()?;
        if variations.is_empty() {
            return Err(BreederError::EmptyVariationCatalog);
        }
        if palettes.is_empty() {
            return Err(PaletteError::EmptyCatalog.into());
        }

        let [a, b, c] = config.seed.unwrap_or_else(rand::random);
        log::debug!("breeder seeded with ({a}, {b}, {c})");

        Ok(Self {
            rng: RandomSource::new(a, b, c),
            variations,
            palettes,
            renderer,
            interpolator,
            samples: Vec::new(),
            config,
        })
    }

    /// Restart the random stream from `(a, b, c)`.
    pub fn reseed(&mut self, a: u32, b: u32, c: u32) {
        self.rng.seed(a, b, c, None);
    }

    pub fn rng_mut(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    pub fn config(&self) -> &BreederConfig {
        &self.config
    }

    pub fn variations(&self) -> &VariationCatalog {
        &self.variations
    }

    pub fn palettes(&self) -> &PaletteCatalog {
        &self.palettes
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn interpolator(&self) -> &I {
        &self.interpolator
    }
}
