//! LMDB environment setup.
//!
//! One environment holds every database. Entity records are bincode-encoded
//! values keyed by the 16 raw bytes of their id; secondary indexes use
//! 32-byte composite keys `(owner_id, member_id)` with empty values so that a
//! prefix scan over the owner lists its members.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::migration::Migrator;
use crate::LmdbError;

/// Names of every database this backend creates.
pub(crate) const DATABASE_NAMES: &[&str] = &[
    "users",
    "user_emails",
    "categories",
    "nominees",
    "nominee_categories",
    "category_nominees",
    "votes",
    "free_votes",
    "user_votes",
    "category_votes",
    "nominee_votes",
    "meta",
];

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    pub(crate) users_db: Database<Bytes, Bytes>,
    /// e-mail → user id.
    pub(crate) user_emails_db: Database<Bytes, Bytes>,
    pub(crate) categories_db: Database<Bytes, Bytes>,
    pub(crate) nominees_db: Database<Bytes, Bytes>,
    /// (nominee, category) → ().
    pub(crate) nominee_categories_db: Database<Bytes, Bytes>,
    /// (category, nominee) → ().
    pub(crate) category_nominees_db: Database<Bytes, Bytes>,
    pub(crate) votes_db: Database<Bytes, Bytes>,
    /// (user, category) → vote id, free votes only. Uniqueness constraint.
    pub(crate) free_votes_db: Database<Bytes, Bytes>,
    /// (user, vote) → ().
    pub(crate) user_votes_db: Database<Bytes, Bytes>,
    /// (category, vote) → ().
    pub(crate) category_votes_db: Database<Bytes, Bytes>,
    /// (nominee, vote) → ().
    pub(crate) nominee_votes_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path and bring its
    /// schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // never through a second handle.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(DATABASE_NAMES.len() as u32))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut create = |name: &str| -> Result<Database<Bytes, Bytes>, LmdbError> {
            Ok(env.create_database(&mut wtxn, Some(name))?)
        };
        let users_db = create("users")?;
        let user_emails_db = create("user_emails")?;
        let categories_db = create("categories")?;
        let nominees_db = create("nominees")?;
        let nominee_categories_db = create("nominee_categories")?;
        let category_nominees_db = create("category_nominees")?;
        let votes_db = create("votes")?;
        let free_votes_db = create("free_votes")?;
        let user_votes_db = create("user_votes")?;
        let category_votes_db = create("category_votes")?;
        let nominee_votes_db = create("nominee_votes")?;
        let meta_db = create("meta")?;
        wtxn.commit()?;

        let environment = Self {
            env,
            users_db,
            user_emails_db,
            categories_db,
            nominees_db,
            nominee_categories_db,
            category_nominees_db,
            votes_db,
            free_votes_db,
            user_votes_db,
            category_votes_db,
            nominee_votes_db,
            meta_db,
        };

        Migrator::run(&environment)?;
        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    /// Get a reference to the underlying heed environment.
    pub fn env(&self) -> &Env {
        &self.env
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Concatenate two 16-byte ids into a composite index key.
pub(crate) fn composite_key(owner: &[u8; 16], member: &[u8; 16]) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(owner);
    key[16..].copy_from_slice(member);
    key
}

/// The member half of a composite key.
pub(crate) fn member_of(key: &[u8]) -> Result<[u8; 16], LmdbError> {
    key.get(16..32)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| LmdbError::Serialization(format!("bad index key length {}", key.len())))
}

/// Decode a stored 16-byte id value.
pub(crate) fn id_bytes(value: &[u8]) -> Result<[u8; 16], LmdbError> {
    value
        .try_into()
        .map_err(|_| LmdbError::Serialization(format!("bad id length {}", value.len())))
}
