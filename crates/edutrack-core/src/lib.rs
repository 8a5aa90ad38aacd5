//! Core types and trait definitions for the EduTrack fee ledger and
//! curriculum roadmap.
//!
//! This crate has no HTTP or database dependencies. The
//! rules that keep derived state consistent (guardian pending balances, the
//! discontinuation flag, topic-forest shape) live here so every backend
//! applies them identically.

pub mod error;
pub mod fee;
pub mod month;
pub mod policy;
pub mod roadmap;
pub mod school;
pub mod store;
pub mod topic;

pub use error::{Classify, Error, ErrorKind, Result};
