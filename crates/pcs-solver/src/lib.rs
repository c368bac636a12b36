//! Conflict detection and resolution.
//!
//! [`conflict::detect`] finds package names installed at more than one
//! version. A [`solver::ConflictSolver`] then searches for upgrades of the
//! direct dependencies responsible (the root causes) that let every
//! occurrence collapse onto one version, either by enumerating candidate
//! combinations ([`bruteforce`]) or by encoding the question as CNF for a SAT
//! engine ([`sat`]).

pub mod bruteforce;
pub mod closure;
pub mod cnf;
pub mod conflict;
pub mod engine;
pub mod sat;
pub mod situation;
pub mod solver;

pub use conflict::{detect, ConflictPackage, ConflictReport, Occurrence};
pub use situation::NoConflictSituation;
pub use solver::{ConflictSolver, SolveOptions, SolverKind};
