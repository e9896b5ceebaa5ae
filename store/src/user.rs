//! User storage trait.

use crate::StoreError;
use awards_types::{Timestamp, UserId, VoteType};
use serde::{Deserialize, Serialize};

/// A user's two vote counters.
///
/// Unsigned, so the non-negative invariant is carried by the type; the ledger
/// refuses a debit that would underflow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteBalance {
    pub free: u32,
    pub paid: u32,
}

impl VoteBalance {
    pub fn new(free: u32, paid: u32) -> Self {
        Self { free, paid }
    }

    /// Units left in the given pool.
    pub fn available(&self, pool: VoteType) -> u32 {
        match pool {
            VoteType::Free => self.free,
            VoteType::Paid => self.paid,
        }
    }

    pub fn total(&self) -> u64 {
        u64::from(self.free) + u64::from(self.paid)
    }

    /// The counters with one unit taken from `pool`.
    pub fn debited(self, pool: VoteType) -> Result<Self, StoreError> {
        let mut next = self;
        let slot = next.slot_mut(pool);
        *slot = slot
            .checked_sub(1)
            .ok_or_else(|| StoreError::Exhausted(format!("{pool} pool is empty")))?;
        Ok(next)
    }

    /// The counters with `amount` units added to `pool`.
    pub fn credited(self, pool: VoteType, amount: u32) -> Result<Self, StoreError> {
        let mut next = self;
        let slot = next.slot_mut(pool);
        *slot = slot
            .checked_add(amount)
            .ok_or_else(|| StoreError::Overflow(format!("{pool} pool + {amount}")))?;
        Ok(next)
    }

    fn slot_mut(&mut self, pool: VoteType) -> &mut u32 {
        match pool {
            VoteType::Free => &mut self.free,
            VoteType::Paid => &mut self.paid,
        }
    }
}

/// A registered voter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub balance: VoteBalance,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Trait for user storage operations.
///
/// Balances are only written through [`UserStore::debit_balance`] and
/// [`UserStore::credit_balance`], which the vote-pool ledger owns. Each is a
/// single read-check-write on the stored row: two callers, in this process
/// or another one sharing the backend, can never both take the last unit.
pub trait UserStore {
    /// Insert a new user. Fails with `Duplicate` if the id or e-mail is taken.
    fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    fn get_user(&self, id: &UserId) -> Result<User, StoreError>;

    fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Take one unit from `pool` and return the new counters.
    ///
    /// Fails with `Exhausted` and writes nothing when the pool is empty,
    /// `NotFound` for an unknown user.
    fn debit_balance(
        &self,
        id: &UserId,
        pool: VoteType,
        updated_at: Timestamp,
    ) -> Result<VoteBalance, StoreError>;

    /// Add `amount` units to `pool` and return the new counters.
    ///
    /// Fails with `Overflow` and writes nothing past `u32::MAX`.
    fn credit_balance(
        &self,
        id: &UserId,
        pool: VoteType,
        amount: u32,
        updated_at: Timestamp,
    ) -> Result<VoteBalance, StoreError>;

    fn iter_users(&self) -> Result<Vec<User>, StoreError>;

    fn user_count(&self) -> Result<u64, StoreError> {
        self.iter_users().map(|v| v.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_stops_at_zero() {
        let b = VoteBalance::new(1, 0);
        assert_eq!(b.debited(VoteType::Free).unwrap(), VoteBalance::new(0, 0));
        assert!(b.debited(VoteType::Paid).unwrap_err().is_exhausted());
    }

    #[test]
    fn credit_refuses_overflow() {
        let b = VoteBalance::new(0, u32::MAX - 1);
        assert_eq!(b.credited(VoteType::Paid, 1).unwrap().paid, u32::MAX);
        assert!(matches!(
            b.credited(VoteType::Paid, 2),
            Err(StoreError::Overflow(_))
        ));
        assert_eq!(b.credited(VoteType::Free, 3).unwrap(), VoteBalance::new(3, u32::MAX - 1));
    }
}
