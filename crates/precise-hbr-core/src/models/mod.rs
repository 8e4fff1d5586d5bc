//! Domain models for the PRECISE-HBR scoring pipeline.

mod clinical;
mod score;
mod tradeoff;

pub use clinical::*;
pub use score::*;
pub use tradeoff::*;
