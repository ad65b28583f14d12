//! Schema module - Genome, palette, lineage and configuration types.

mod config;
mod edit;
mod genome;
mod io;
mod palette;
mod template;
mod variation;

pub use config::*;
pub use edit::*;
pub use genome::*;
pub use io::*;
pub use palette::*;
pub use template::*;
pub use variation::*;
