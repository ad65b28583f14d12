//! Compute module - Random source, color pipeline, catalogs, oracles and the
//! evolutionary operators.

mod chaos;
mod color;
mod isaac;
mod oracle;
mod palettes;
mod variations;

pub mod evolution;

pub use chaos::*;
pub use color::*;
pub use isaac::*;
pub use oracle::*;
pub use palettes::*;
pub use variations::*;
