//! Category storage trait.

use crate::StoreError;
use awards_types::{CategoryId, Timestamp};
use serde::{Deserialize, Serialize};

/// An award category. Votes may only target active categories.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

pub trait CategoryStore {
    /// Insert or replace a category.
    fn put_category(&self, category: &Category) -> Result<(), StoreError>;

    fn get_category(&self, id: &CategoryId) -> Result<Category, StoreError>;

    fn iter_categories(&self) -> Result<Vec<Category>, StoreError>;
}
