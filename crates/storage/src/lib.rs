//! Storage layer for the Tally indexer.
//!
//! This crate provides PostgreSQL implementations of the repository traits
//! defined in `tally-core`: connection pooling, migrations and the atomic
//! batch write.
//!
//! # Usage
//!
//! ```ignore
//! use tally_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! let config = DatabaseConfig::for_indexer(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = Arc::new(PgRepositories::new(Arc::new(db)));
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, PgRepositories, PurgeStats};
