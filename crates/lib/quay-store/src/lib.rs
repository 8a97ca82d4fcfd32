//! Lookup statements and row model for quay.
//!
//! This crate defines the fixed set of parameterized statements run against
//! the terminal operating database, the table names the bootstrap check
//! depends on, and the shape rows take once they leave the driver.

pub mod models;
pub mod queries;
pub mod schema;

pub use models::*;
pub use queries::Query;
