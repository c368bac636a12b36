//! Shared utilities for pcs.
//!
//! This crate provides the cross-cutting concerns used by every other pcs
//! crate: the unified error type and terminal status/progress indicators.

pub mod errors;
pub mod progress;
