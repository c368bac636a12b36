//! Core data types for pcs.
//!
//! This crate defines the values the conflict engine works on: packages and
//! their semantic versions, npm-style version ranges, per-version dependency
//! metadata, the resolved logical dependency tree, the lockfile loader that
//! builds it, and user configuration.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod dependency;
pub mod lockfile;
pub mod package;
pub mod tree;
pub mod version;
