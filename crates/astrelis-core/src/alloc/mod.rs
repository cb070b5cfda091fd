//! Hash collections used across the Astrelis crates.
//!
//! Glyph tables are keyed by `char` and looked up once per rendered glyph, so
//! they use AHash instead of SipHash. Iteration order is unspecified.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet};
