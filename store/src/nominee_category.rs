//! Nominee ↔ category association trait.

use crate::StoreError;
use awards_types::{CategoryId, NomineeId};

/// Many-to-many association between nominees and categories.
///
/// Keys are `(nominee, category)` pairs with no payload. Removing an
/// association never touches votes already cast under it.
pub trait NomineeCategoryStore {
    /// Associate a nominee with a category. Idempotent.
    fn assign(&self, nominee: &NomineeId, category: &CategoryId) -> Result<(), StoreError>;

    /// Remove an association. Returns whether it existed.
    fn unassign(&self, nominee: &NomineeId, category: &CategoryId) -> Result<bool, StoreError>;

    fn is_assigned(&self, nominee: &NomineeId, category: &CategoryId) -> Result<bool, StoreError>;

    /// All nominees associated with a category.
    fn nominees_in_category(&self, category: &CategoryId) -> Result<Vec<NomineeId>, StoreError>;

    /// All categories a nominee is associated with.
    fn categories_for_nominee(&self, nominee: &NomineeId) -> Result<Vec<CategoryId>, StoreError>;
}
