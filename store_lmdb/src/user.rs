//! LMDB implementation of UserStore.

use awards_store::user::{User, UserStore, VoteBalance};
use awards_store::StoreError;
use awards_types::{Timestamp, UserId, VoteType};

use crate::environment::{decode, encode, id_bytes};
use crate::{LmdbEnvironment, LmdbError};

impl UserStore for LmdbEnvironment {
    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;
        if self
            .users_db
            .get(&wtxn, user.id.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        if self
            .user_emails_db
            .get(&wtxn, user.email.as_bytes())
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        let bytes = encode(user)?;
        self.users_db
            .put(&mut wtxn, user.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.user_emails_db
            .put(&mut wtxn, user.email.as_bytes(), user.id.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_user(&self, id: &UserId) -> Result<User, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .users_db
            .get(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("user {}", id)))?;
        Ok(decode(bytes)?)
    }

    fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let id = self
            .user_emails_db
            .get(&rtxn, email.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("email {}", email)))?;
        let id = id_bytes(id)?;
        let bytes = self
            .users_db
            .get(&rtxn, &id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| {
                LmdbError::NotFound(format!("user {} (indexed by {})", UserId::from_bytes(id), email))
            })?;
        Ok(decode(bytes)?)
    }

    fn debit_balance(
        &self,
        id: &UserId,
        pool: VoteType,
        updated_at: Timestamp,
    ) -> Result<VoteBalance, StoreError> {
        self.update_balance(id, updated_at, |balance| balance.debited(pool))
    }

    fn credit_balance(
        &self,
        id: &UserId,
        pool: VoteType,
        amount: u32,
        updated_at: Timestamp,
    ) -> Result<VoteBalance, StoreError> {
        self.update_balance(id, updated_at, |balance| balance.credited(pool, amount))
    }

    fn iter_users(&self) -> Result<Vec<User>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let iter = self.users_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut users = Vec::new();
        for entry in iter {
            let (_, val) = entry.map_err(LmdbError::from)?;
            users.push(decode(val)?);
        }
        Ok(users)
    }

    fn user_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.users_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

impl LmdbEnvironment {
    /// Read, change and write a user's counters in one write transaction.
    ///
    /// LMDB admits one write transaction per environment at a time, across
    /// processes, so the read cannot go stale before the write. An error from
    /// `f` aborts the transaction untouched.
    fn update_balance(
        &self,
        id: &UserId,
        updated_at: Timestamp,
        f: impl FnOnce(VoteBalance) -> Result<VoteBalance, StoreError>,
    ) -> Result<VoteBalance, StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;
        let mut user: User = {
            let bytes = self
                .users_db
                .get(&wtxn, id.as_bytes())
                .map_err(LmdbError::from)?
                .ok_or_else(|| LmdbError::NotFound(format!("user {}", id)))?;
            decode(bytes)?
        };
        user.balance = f(user.balance)?;
        user.updated_at = updated_at;
        let bytes = encode(&user)?;
        self.users_db
            .put(&mut wtxn, id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(user.balance)
    }
}
