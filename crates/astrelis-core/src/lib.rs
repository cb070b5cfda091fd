//! Astrelis Core
//!
//! Shared plumbing for the Astrelis MSDF crates: logging setup, profiling
//! hooks, hash collections and the small math/geometry vocabulary used by the
//! atlas pipeline.

pub mod alloc;
pub mod geometry;
pub mod logging;
pub mod math;
pub mod profiling;
