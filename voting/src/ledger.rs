//! Vote-pool ledger.
//!
//! Owns every write to a user's free and paid counters. The check and the
//! write happen in one store call, which is what keeps two coordinators over
//! one backend from both spending the last unit. Within a coordinator,
//! requests for the same user also queue on a per-user lease so they reach
//! the store one at a time; leases for different users never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use awards_store::{StoreError, UserStore, VoteBalance};
use awards_types::{Clock, UserId, VoteType};
use awards_utils::StatsCounter;

use crate::VotingError;

pub const STAT_COMPENSATIONS: &str = "compensations";
pub const STAT_UNITS_LOST: &str = "units_lost";

/// Per-user exclusive leases.
///
/// Entries are created on demand and dropped once no request holds or
/// waits on them.
#[derive(Default)]
struct UserLeases {
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLeases {
    fn with_lease<R>(&self, user: &UserId, f: impl FnOnce() -> R) -> R {
        let lease = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(*user).or_default())
        };
        let result = {
            // The guarded value is `()`; a poisoned lease carries no torn state.
            let _held = lease.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&lease) == 2 {
            locks.remove(user);
        }
        result
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct VoteLedger<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    leases: UserLeases,
    credit_attempts: u32,
    stats: Arc<StatsCounter>,
}

impl<S: UserStore> VoteLedger<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        credit_attempts: u32,
        stats: Arc<StatsCounter>,
    ) -> Self {
        Self {
            store,
            clock,
            leases: UserLeases::default(),
            credit_attempts: credit_attempts.max(1),
            stats,
        }
    }

    /// Current counters for `user`.
    pub fn balance(&self, user: &UserId) -> Result<VoteBalance, VotingError> {
        Ok(self.store.get_user(user)?.balance)
    }

    /// Take one unit from `pool`, failing with the pool's exhaustion error
    /// when it is empty.
    ///
    /// The returned [`Debit`] must be [committed](Debit::commit) once the
    /// vote is durable. Dropping it uncommitted credits the unit back.
    pub fn debit(&self, user: &UserId, pool: VoteType) -> Result<Debit<'_, S>, VotingError> {
        self.leases.with_lease(user, || -> Result<(), VotingError> {
            let balance = self
                .store
                .debit_balance(user, pool, self.clock.now())
                .map_err(|e| match e {
                    StoreError::Exhausted(_) => VotingError::exhausted(pool),
                    e => e.into(),
                })?;
            tracing::debug!(%user, %pool, remaining = balance.available(pool), "debited vote unit");
            Ok(())
        })?;
        Ok(Debit {
            ledger: self,
            user: *user,
            pool,
            settled: false,
        })
    }

    /// Return one unit to `pool`. Unconditional: the unit was debited earlier.
    pub fn credit(&self, user: &UserId, pool: VoteType) -> Result<VoteBalance, VotingError> {
        self.add(user, pool, 1)
    }

    /// Add purchased units to the paid pool.
    pub fn top_up_paid(&self, user: &UserId, amount: u32) -> Result<VoteBalance, VotingError> {
        if amount == 0 {
            return Err(VotingError::InvalidAmount);
        }
        let balance = self.add(user, VoteType::Paid, amount)?;
        tracing::info!(%user, amount, paid = balance.paid, "topped up paid votes");
        Ok(balance)
    }

    /// Credit back a unit whose vote was never written.
    pub fn compensate(&self, user: &UserId, pool: VoteType) -> Result<(), VotingError> {
        self.stats.increment(STAT_COMPENSATIONS);
        tracing::warn!(%user, %pool, "crediting back unused vote unit");
        self.restore(user, pool)
    }

    /// Credit one unit back, retrying transient failures.
    ///
    /// When every attempt fails the unit is lost: an error is logged under
    /// the `awards::ledger_loss` target and `CompensationFailed` returned.
    pub fn restore(&self, user: &UserId, pool: VoteType) -> Result<(), VotingError> {
        let mut attempt = 1;
        loop {
            match self.credit(user, pool) {
                Ok(_) => return Ok(()),
                Err(e) if attempt < self.credit_attempts => {
                    tracing::warn!(%user, %pool, attempt, error = %e, "vote credit failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    self.stats.increment(STAT_UNITS_LOST);
                    tracing::error!(
                        target: "awards::ledger_loss",
                        %user,
                        %pool,
                        attempts = attempt,
                        error = %e,
                        "vote unit lost: credit could not be applied"
                    );
                    return Err(VotingError::CompensationFailed {
                        user: *user,
                        pool,
                        source: Box::new(e),
                    });
                }
            }
        }
    }

    fn add(&self, user: &UserId, pool: VoteType, amount: u32) -> Result<VoteBalance, VotingError> {
        self.leases.with_lease(user, || {
            self.store
                .credit_balance(user, pool, amount, self.clock.now())
                .map_err(|e| match e {
                    StoreError::Overflow(_) => VotingError::BalanceOverflow(*user),
                    e => e.into(),
                })
        })
    }
}

/// A unit taken from a user's pool that is not yet backed by a vote.
#[must_use = "an uncommitted debit is credited back on drop"]
pub struct Debit<'a, S: UserStore> {
    ledger: &'a VoteLedger<S>,
    user: UserId,
    pool: VoteType,
    settled: bool,
}

impl<S: UserStore> Debit<'_, S> {
    pub fn pool(&self) -> VoteType {
        self.pool
    }

    /// The vote is durable; keep the unit spent.
    pub fn commit(mut self) {
        self.settled = true;
    }

    /// Give the unit back now and report whether that worked.
    pub fn refund(mut self) -> Result<(), VotingError> {
        self.settled = true;
        self.ledger.compensate(&self.user, self.pool)
    }
}

impl<S: UserStore> Drop for Debit<'_, S> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(user = %self.user, pool = %self.pool, "debit abandoned");
            // A failure is already logged and counted as a lost unit.
            let _ = self.ledger.compensate(&self.user, self.pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awards_nullables::{NullClock, NullStore};
    use awards_store::User;
    use awards_types::Timestamp;

    fn ledger_with(balance: VoteBalance) -> (Arc<NullStore>, VoteLedger<NullStore>, UserId) {
        let store = Arc::new(NullStore::new());
        let id = UserId::from_u128(1);
        store
            .insert_user(&User {
                id,
                name: "Ada".into(),
                email: "ada@example.com".into(),
                balance,
                created_at: Timestamp::new(1),
                updated_at: Timestamp::new(1),
            })
            .unwrap();
        let stats = Arc::new(StatsCounter::new(&[STAT_COMPENSATIONS, STAT_UNITS_LOST]));
        let ledger = VoteLedger::new(
            Arc::clone(&store),
            Arc::new(NullClock::new(50)),
            3,
            stats,
        );
        (store, ledger, id)
    }

    #[test]
    fn committed_debit_stays_spent() {
        let (_store, ledger, id) = ledger_with(VoteBalance::new(2, 0));
        ledger.debit(&id, VoteType::Free).unwrap().commit();
        assert_eq!(ledger.balance(&id).unwrap(), VoteBalance::new(1, 0));
        assert_eq!(ledger.leases.tracked(), 0);
    }

    #[test]
    fn empty_pool_is_refused_without_writing() {
        let (_store, ledger, id) = ledger_with(VoteBalance::new(0, 1));
        assert!(matches!(
            ledger.debit(&id, VoteType::Free),
            Err(VotingError::NoFreeVotesAvailable)
        ));
        ledger.debit(&id, VoteType::Paid).unwrap().commit();
        assert!(matches!(
            ledger.debit(&id, VoteType::Paid),
            Err(VotingError::NoPaidVotesAvailable)
        ));
        assert_eq!(ledger.balance(&id).unwrap(), VoteBalance::new(0, 0));
    }

    #[test]
    fn dropped_debit_is_credited_back() {
        let (_store, ledger, id) = ledger_with(VoteBalance::new(1, 0));
        {
            let _debit = ledger.debit(&id, VoteType::Free).unwrap();
            assert_eq!(ledger.balance(&id).unwrap().free, 0);
        }
        assert_eq!(ledger.balance(&id).unwrap().free, 1);
        assert_eq!(ledger.stats.get(STAT_COMPENSATIONS), 1);
    }

    #[test]
    fn compensation_retries_transient_failures() {
        let (store, ledger, id) = ledger_with(VoteBalance::new(1, 0));
        let debit = ledger.debit(&id, VoteType::Free).unwrap();
        store.fail_balance_writes_after(0, 2);
        debit.refund().unwrap();
        assert_eq!(ledger.balance(&id).unwrap().free, 1);
        assert_eq!(ledger.stats.get(STAT_UNITS_LOST), 0);
    }

    #[test]
    fn exhausted_retries_report_lost_unit() {
        let (store, ledger, id) = ledger_with(VoteBalance::new(1, 0));
        let debit = ledger.debit(&id, VoteType::Free).unwrap();
        store.fail_balance_writes_after(0, 3);
        let err = debit.refund().unwrap_err();
        assert!(matches!(
            err,
            VotingError::CompensationFailed { pool: VoteType::Free, .. }
        ));
        assert_eq!(ledger.balance(&id).unwrap().free, 0);
        assert_eq!(ledger.stats.get(STAT_UNITS_LOST), 1);
    }

    #[test]
    fn top_up_rejects_zero_and_overflow() {
        let (_store, ledger, id) = ledger_with(VoteBalance::new(0, u32::MAX - 1));
        assert!(matches!(
            ledger.top_up_paid(&id, 0),
            Err(VotingError::InvalidAmount)
        ));
        assert_eq!(ledger.top_up_paid(&id, 1).unwrap().paid, u32::MAX);
        assert!(matches!(
            ledger.top_up_paid(&id, 1),
            Err(VotingError::BalanceOverflow(_))
        ));
    }

    #[test]
    fn ledgers_sharing_a_store_share_the_last_unit() {
        let (store, first, id) = ledger_with(VoteBalance::new(1, 0));
        let second = VoteLedger::new(
            Arc::clone(&store),
            Arc::new(NullClock::new(50)),
            3,
            Arc::new(StatsCounter::new(&[STAT_COMPENSATIONS, STAT_UNITS_LOST])),
        );
        let held = first.debit(&id, VoteType::Free).unwrap();
        assert!(matches!(
            second.debit(&id, VoteType::Free),
            Err(VotingError::NoFreeVotesAvailable)
        ));
        held.commit();
        assert_eq!(second.balance(&id).unwrap(), VoteBalance::new(0, 0));
    }

    #[test]
    fn unknown_user_is_not_found() {
        let (_store, ledger, _id) = ledger_with(VoteBalance::default());
        assert!(matches!(
            ledger.debit(&UserId::from_u128(9), VoteType::Paid),
            Err(VotingError::NotFound(_))
        ));
    }
}
