//! SQLite backend for the EduTrack store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Fee writes and their recompute
//! cascade share one SQLite transaction.

mod encode;
mod ledger;
mod roadmap;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
