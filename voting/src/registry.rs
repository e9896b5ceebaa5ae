//! Setup of users, categories, nominees and their associations.

use std::sync::Arc;

use awards_store::{
    Category, CategoryStore, Nominee, NomineeCategoryStore, NomineeStore, User, UserStore,
    VoteBalance,
};
use awards_types::{CategoryId, Clock, NomineeId, UserId};

use crate::VotingError;

pub struct Registry<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    default_free_votes: u32,
}

impl<S> Registry<S>
where
    S: UserStore + CategoryStore + NomineeStore + NomineeCategoryStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, default_free_votes: u32) -> Self {
        Self {
            store,
            clock,
            default_free_votes,
        }
    }

    /// Create a user with the default free allocation and no paid votes.
    pub fn register_user(&self, name: &str, email: &str) -> Result<User, VotingError> {
        let now = self.clock.now();
        let user = User {
            id: UserId::generate(),
            name: name.to_string(),
            email: email.to_string(),
            balance: VoteBalance::new(self.default_free_votes, 0),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user)?;
        tracing::info!(user = %user.id, free = self.default_free_votes, "registered user");
        Ok(user)
    }

    pub fn get_user(&self, id: &UserId) -> Result<User, VotingError> {
        Ok(self.store.get_user(id)?)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<User, VotingError> {
        Ok(self.store.get_user_by_email(email)?)
    }

    pub fn create_category(&self, name: &str, description: &str) -> Result<Category, VotingError> {
        let category = Category {
            id: CategoryId::generate(),
            name: name.to_string(),
            description: description.to_string(),
            is_active: true,
            created_at: self.clock.now(),
        };
        self.store.put_category(&category)?;
        tracing::info!(category = %category.id, name, "created category");
        Ok(category)
    }

    pub fn set_category_active(&self, id: &CategoryId, active: bool) -> Result<Category, VotingError> {
        let mut category = self.store.get_category(id)?;
        category.is_active = active;
        self.store.put_category(&category)?;
        tracing::info!(category = %id, active, "category status changed");
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, VotingError> {
        Ok(self.store.iter_categories()?)
    }

    pub fn create_nominee(&self, name: &str, description: &str) -> Result<Nominee, VotingError> {
        let nominee = Nominee {
            id: NomineeId::generate(),
            name: name.to_string(),
            description: description.to_string(),
            is_active: true,
            created_at: self.clock.now(),
        };
        self.store.put_nominee(&nominee)?;
        tracing::info!(nominee = %nominee.id, name, "created nominee");
        Ok(nominee)
    }

    pub fn set_nominee_active(&self, id: &NomineeId, active: bool) -> Result<Nominee, VotingError> {
        let mut nominee = self.store.get_nominee(id)?;
        nominee.is_active = active;
        self.store.put_nominee(&nominee)?;
        tracing::info!(nominee = %id, active, "nominee status changed");
        Ok(nominee)
    }

    pub fn list_nominees(&self) -> Result<Vec<Nominee>, VotingError> {
        Ok(self.store.iter_nominees()?)
    }

    /// Make `nominee` eligible for votes in `category`. Both must exist.
    pub fn assign_nominee(&self, nominee: &NomineeId, category: &CategoryId) -> Result<(), VotingError> {
        self.store.get_nominee(nominee)?;
        self.store.get_category(category)?;
        self.store.assign(nominee, category)?;
        tracing::info!(%nominee, %category, "nominee assigned");
        Ok(())
    }

    /// Remove the association. Existing votes are left untouched.
    pub fn unassign_nominee(
        &self,
        nominee: &NomineeId,
        category: &CategoryId,
    ) -> Result<bool, VotingError> {
        let removed = self.store.unassign(nominee, category)?;
        if removed {
            tracing::info!(%nominee, %category, "nominee unassigned");
        }
        Ok(removed)
    }

    pub fn nominees_in_category(&self, category: &CategoryId) -> Result<Vec<Nominee>, VotingError> {
        self.store.get_category(category)?;
        self.store
            .nominees_in_category(category)?
            .iter()
            .map(|id| self.store.get_nominee(id).map_err(VotingError::from))
            .collect()
    }

    pub fn categories_for_nominee(&self, nominee: &NomineeId) -> Result<Vec<Category>, VotingError> {
        self.store.get_nominee(nominee)?;
        self.store
            .categories_for_nominee(nominee)?
            .iter()
            .map(|id| self.store.get_category(id).map_err(VotingError::from))
            .collect()
    }
}
