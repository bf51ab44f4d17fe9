//! Text normalization and technical-term canonicalization.
//!
//! Everything here is pure and allocation-light; every scorer builds on it.

pub mod normalize;
pub mod synonyms;

pub use normalize::{analyze, normalize, tokenize, truncate_chars};
pub use synonyms::{canonicalize, expand, registry, SynonymRegistry};
