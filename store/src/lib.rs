//! Abstract storage traits for the awards voting core.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The voting crate depends only on the traits.

pub mod category;
pub mod error;
pub mod meta;
pub mod nominee;
pub mod nominee_category;
pub mod user;
pub mod vote;

pub use category::{Category, CategoryStore};
pub use error::StoreError;
pub use meta::MetaStore;
pub use nominee::{Nominee, NomineeStore};
pub use nominee_category::NomineeCategoryStore;
pub use user::{User, UserStore, VoteBalance};
pub use vote::{Vote, VoteStore};

/// Everything the voting core reads and writes, behind one handle.
///
/// Blanket-implemented for any backend that provides all entity stores.
pub trait EntityStore:
    UserStore + CategoryStore + NomineeStore + NomineeCategoryStore + VoteStore + Send + Sync
{
}

impl<T> EntityStore for T where
    T: UserStore + CategoryStore + NomineeStore + NomineeCategoryStore + VoteStore + Send + Sync
{
}
