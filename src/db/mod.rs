//! Durable storage for lanwatch.
//!
//! SQLite with an embedded migration.

mod models;
mod store;

pub use models::*;
pub use store::*;
