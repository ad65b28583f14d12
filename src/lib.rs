//! Flame evolve - Deterministic evolution of fractal flame genomes.
//!
//! This crate breeds procedural fractal-image descriptions ("genomes"):
//! random generation, mutation, crossover, colour improvement, bounding box
//! estimation and animation frames. Every operator draws from one seeded
//! ISAAC stream, so a seed triple reproduces the same results everywhere.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Genome, palette, lineage and configuration types (serde)
//! - `compute`: ISAAC, colour pipeline, catalogs, oracles and the evolutionary operators
//! - `animation`: Keyframe interpolation, motion and spin/interpolate frames
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flame_evolve::{
//!     animation::LinearInterpolator,
//!     compute::{ChaosGame, PaletteCatalog, VariationCatalog, evolution::Breeder},
//!     schema::BreederConfig,
//! };
//!
//! let variations = Arc::new(VariationCatalog::builtin());
//! let palettes = Arc::new(PaletteCatalog::builtin());
//! let renderer = ChaosGame::new(Arc::clone(&variations), [1, 2, 3]);
//! let config = BreederConfig { seed: Some([1, 2, 3]), ..Default::default() };
//!
//! let mut breeder =
//!     Breeder::new(config, variations, palettes, renderer, LinearInterpolator).unwrap();
//! let parent0 = breeder.random_genome(None);
//! let parent1 = breeder.random_genome(None);
//! let (child, description) = breeder.cross(&parent0, &parent1, None);
//!
//! println!("{description}: {} xforms", child.xforms.len());
//! ```

pub mod animation;
pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use animation::{Interpolate, LinearInterpolator};
pub use compute::evolution::{Breeder, BreederError, CrossMode, MutationMode};
pub use compute::{ChaosGame, RandomSource};
pub use schema::{BreederConfig, Genome, Palette, Xform};
