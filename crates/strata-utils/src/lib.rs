//! Small data structures shared by the strata crates.

pub mod dependency;
pub mod id;
pub mod lru;
pub mod tracker;
pub mod visit;
