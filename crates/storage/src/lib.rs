//! Owned asset storage.
//!
//! Everything the catalog keeps lives under a single library root. This crate
//! stages copies of files and directory trees inside that root, swaps them
//! into place (keeping what they replaced until the caller is done), measures
//! and removes them, and writes files atomically. Paths given relative to
//! the root are validated so nothing can escape it.

pub mod error;
mod local;
mod path;

pub use crate::local::{LocalStore, Placed, STAGING_PREFIX, Staged, size_of};
pub use crate::path::validate as validate_path;
