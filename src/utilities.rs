//! Primitives consumed by `protocols`.

pub mod commits;
pub mod ferret;
pub mod field;
pub mod hashes;
pub mod link;
pub mod permute;
pub mod prg;
pub mod rng;
