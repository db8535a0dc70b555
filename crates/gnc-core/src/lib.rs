pub mod access;
pub mod canonical;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod types;

pub use access::{AccessTier, AeadAlgorithm};
pub use error::{GncError, GncResult};
pub use types::{GeneticDataset, Variant, VariantType};
