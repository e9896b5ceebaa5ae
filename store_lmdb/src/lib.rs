//! LMDB storage backend for the awards voting core.
//!
//! Implements all storage traits from `awards-store` using the `heed` LMDB
//! bindings. Each logical store maps to one or more LMDB databases within a
//! single environment, and [`LmdbEnvironment`] itself is the store handle.

pub mod catalog;
pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod user;
pub mod vote;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
