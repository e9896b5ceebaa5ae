//! Nominee storage trait.

use crate::StoreError;
use awards_types::{NomineeId, Timestamp};
use serde::{Deserialize, Serialize};

/// A nominee. Inactive nominees keep their votes but receive no new ones.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Nominee {
    pub id: NomineeId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

pub trait NomineeStore {
    /// Insert or replace a nominee.
    fn put_nominee(&self, nominee: &Nominee) -> Result<(), StoreError>;

    fn get_nominee(&self, id: &NomineeId) -> Result<Nominee, StoreError>;

    fn iter_nominees(&self) -> Result<Vec<Nominee>, StoreError>;
}
