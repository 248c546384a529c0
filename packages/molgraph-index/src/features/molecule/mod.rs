//! Molecule construction
//!
//! A molecule is the hop-limited neighborhood of a center entity, rendered
//! as one line of text and indexed as one document.

pub mod builder;
pub mod filter;
pub mod model;
pub mod pattern;

pub use builder::{MoleculeBuilder, NeighborSource};
pub use filter::{FlagFilter, IncludeFilter, IndexFilter};
pub use model::{LanguageFilter, MoleculeConfig};
pub use pattern::ExcludePattern;
