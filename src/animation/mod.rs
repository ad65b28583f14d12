//! Animation: keyframe interpolation, motion elements and per-frame
//! genome generation for spinning and interpolating sequences.
//!
//! ```text
//! loop_genome(g, blend)     motion at blend, affines turned by -blend*360
//! edge([a, b], blend, ..)   align, reference angles, spin both, interpolate
//! Breeder::spin(..)         loop_genome + template + time + lineage + jitter
//! Breeder::spin_inter(..)   edge + template + time + lineage + jitter
//! ```

mod interpolate;
mod motion;
mod sequence;

pub use interpolate::{Interpolate, LinearInterpolator, smoother, stagger_coef};
pub use motion::{apply_genome_motion, apply_motion};
pub use sequence::{edge, loop_genome};
