//! Metadata storage trait.

use crate::StoreError;

/// Key-value bookkeeping that belongs to no entity: the schema version, and
/// whatever else a backend needs to remember about itself.
pub trait MetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// `NotFound` if the key was never written.
    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Stored schema version; `0` for a fresh database.
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
