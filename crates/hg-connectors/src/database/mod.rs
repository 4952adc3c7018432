//! Relational asset database sources.

pub mod postgres;

pub use postgres::{DatabaseConfig, PostgresAdapter};
