//! Package metadata access for pcs.
//!
//! A [`RegistryClient`](client::RegistryClient) performs one raw metadata
//! fetch. [`PackageRepository`](repository::PackageRepository) wraps a client
//! with retries, bounded concurrency and a per-name cache, and is what the
//! solvers talk to.

pub mod cache;
pub mod client;
pub mod mock;
pub mod npm;
pub mod repository;

pub use client::RegistryClient;
pub use mock::MockRegistryClient;
pub use npm::NpmRegistryClient;
pub use repository::{PackageRepository, RetryPolicy};
