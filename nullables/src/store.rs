//! Nullable store: thread-safe in-memory storage for testing.
//!
//! All state sits behind one mutex, so every trait call is atomic with
//! respect to every other, matching the single-writer guarantees of the LMDB
//! backend. Faults can be injected to exercise the voting core's
//! compensation paths.

use awards_store::category::{Category, CategoryStore};
use awards_store::nominee::{Nominee, NomineeStore};
use awards_store::nominee_category::NomineeCategoryStore;
use awards_store::user::{User, UserStore, VoteBalance};
use awards_store::vote::{Vote, VoteStore};
use awards_store::StoreError;
use awards_types::{CategoryId, NomineeId, Timestamp, UserId, VoteId, VoteType};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct NullState {
    users: BTreeMap<UserId, User>,
    emails: HashMap<String, UserId>,
    categories: BTreeMap<CategoryId, Category>,
    nominees: BTreeMap<NomineeId, Nominee>,
    associations: BTreeSet<(NomineeId, CategoryId)>,
    votes: BTreeMap<VoteId, Vote>,
    free_index: HashMap<(UserId, CategoryId), VoteId>,
}

/// Skip `skip` calls, then fail the next `fail` calls.
#[derive(Default)]
struct FaultPlan {
    skip: u32,
    fail: u32,
}

impl FaultPlan {
    fn should_fail(&mut self) -> bool {
        if self.skip > 0 {
            self.skip -= 1;
            false
        } else if self.fail > 0 {
            self.fail -= 1;
            true
        } else {
            false
        }
    }
}

/// An in-memory implementation of every entity store.
#[derive(Default)]
pub struct NullStore {
    state: Mutex<NullState>,
    vote_insert_faults: AtomicU32,
    vote_read_faults: AtomicU32,
    panic_on_vote_insert: AtomicBool,
    balance_faults: Mutex<FaultPlan>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `insert_vote` fail with a backend error.
    pub fn fail_next_vote_inserts(&self, count: u32) {
        self.vote_insert_faults.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `get_vote` fail with a backend error.
    pub fn fail_next_vote_reads(&self, count: u32) {
        self.vote_read_faults.store(count, Ordering::SeqCst);
    }

    /// Make the next call to `insert_vote` panic, simulating a request that
    /// is torn down between the debit and the insert.
    pub fn panic_on_next_vote_insert(&self) {
        self.panic_on_vote_insert.store(true, Ordering::SeqCst);
    }

    /// Let `skip` balance writes succeed, then fail the following `fail`.
    pub fn fail_balance_writes_after(&self, skip: u32, fail: u32) {
        *self.balance_faults.lock().unwrap() = FaultPlan { skip, fail };
    }

    /// Directly overwrite a balance, bypassing fault injection. Test setup only.
    pub fn seed_balance(&self, id: &UserId, balance: VoteBalance) {
        if let Some(user) = self.state.lock().unwrap().users.get_mut(id) {
            user.balance = balance;
        }
    }

    fn update_balance(
        &self,
        id: &UserId,
        updated_at: Timestamp,
        f: impl FnOnce(VoteBalance) -> Result<VoteBalance, StoreError>,
    ) -> Result<VoteBalance, StoreError> {
        if self.balance_faults.lock().unwrap().should_fail() {
            return Err(StoreError::Backend("injected balance write failure".into()));
        }
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.balance = f(user.balance)?;
        user.updated_at = updated_at;
        Ok(user.balance)
    }

    /// Number of free votes currently held by `user` in `category`.
    pub fn free_votes_in(&self, user: &UserId, category: &CategoryId) -> usize {
        self.state
            .lock()
            .unwrap()
            .votes
            .values()
            .filter(|v| {
                v.user_id == *user && v.category_id == *category && v.vote_type == VoteType::Free
            })
            .count()
    }
}

impl UserStore for NullStore {
    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        if state.emails.contains_key(&user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        state.emails.insert(user.email.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user(&self, id: &UserId) -> Result<User, StoreError> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .emails
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("email {}", email)))
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
        Ok(self.state.lock().unwrap().users.values().cloned().collect())
    }
}

impl CategoryStore for NullStore {
    fn put_category(&self, category: &Category) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .categories
            .insert(category.id, category.clone());
        Ok(())
    }

    fn get_category(&self, id: &CategoryId) -> Result<Category, StoreError> {
        self.state
            .lock()
            .unwrap()
            .categories
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))
    }

    fn iter_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .categories
            .values()
            .cloned()
            .collect())
    }
}

impl NomineeStore for NullStore {
    fn put_nominee(&self, nominee: &Nominee) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .nominees
            .insert(nominee.id, nominee.clone());
        Ok(())
    }

    fn get_nominee(&self, id: &NomineeId) -> Result<Nominee, StoreError> {
        self.state
            .lock()
            .unwrap()
            .nominees
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("nominee {}", id)))
    }

    fn iter_nominees(&self) -> Result<Vec<Nominee>, StoreError> {
        Ok(self.state.lock().unwrap().nominees.values().cloned().collect())
    }
}

impl NomineeCategoryStore for NullStore {
    fn assign(&self, nominee: &NomineeId, category: &CategoryId) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .associations
            .insert((*nominee, *category));
        Ok(())
    }

    fn unassign(&self, nominee: &NomineeId, category: &CategoryId) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .associations
            .remove(&(*nominee, *category)))
    }

    fn is_assigned(&self, nominee: &NomineeId, category: &CategoryId) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .associations
            .contains(&(*nominee, *category)))
    }

    fn nominees_in_category(&self, category: &CategoryId) -> Result<Vec<NomineeId>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .associations
            .iter()
            .filter(|(_, c)| c == category)
            .map(|(n, _)| *n)
            .collect())
    }

    fn categories_for_nominee(&self, nominee: &NomineeId) -> Result<Vec<CategoryId>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .associations
            .iter()
            .filter(|(n, _)| n == nominee)
            .map(|(_, c)| *c)
            .collect())
    }
}

impl VoteStore for NullStore {
    fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        if self.panic_on_vote_insert.swap(false, Ordering::SeqCst) {
            panic!("injected panic during vote insert");
        }
        if self
            .vote_insert_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Backend("injected vote insert failure".into()));
        }

        let mut state = self.state.lock().unwrap();
        if state.votes.contains_key(&vote.id) {
            return Err(StoreError::Duplicate(format!("vote {}", vote.id)));
        }
        if vote.vote_type == VoteType::Free {
            let key = (vote.user_id, vote.category_id);
            if state.free_index.contains_key(&key) {
                return Err(StoreError::Duplicate(format!(
                    "free vote for user {} in category {}",
                    vote.user_id, vote.category_id
                )));
            }
            state.free_index.insert(key, vote.id);
        }
        state.votes.insert(vote.id, vote.clone());
        Ok(())
    }

    fn get_vote(&self, id: &VoteId) -> Result<Vote, StoreError> {
        if self
            .vote_read_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Backend("injected vote read failure".into()));
        }
        self.state
            .lock()
            .unwrap()
            .votes
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("vote {}", id)))
    }

    fn set_vote_nominee(
        &self,
        id: &VoteId,
        nominee: &NomineeId,
        updated_at: Timestamp,
    ) -> Result<Vote, StoreError> {
        let mut state = self.state.lock().unwrap();
        let vote = state
            .votes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("vote {}", id)))?;
        vote.nominee_id = *nominee;
        vote.updated_at = updated_at;
        Ok(vote.clone())
    }

    fn delete_vote(&self, id: &VoteId) -> Result<Vote, StoreError> {
        let mut state = self.state.lock().unwrap();
        let vote = state
            .votes
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("vote {}", id)))?;
        if vote.vote_type == VoteType::Free {
            state.free_index.remove(&(vote.user_id, vote.category_id));
        }
        Ok(vote)
    }

    fn free_vote_for(
        &self,
        user: &UserId,
        category: &CategoryId,
    ) -> Result<Option<VoteId>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .free_index
            .get(&(*user, *category))
            .copied())
    }

    fn votes_for_user(&self, user: &UserId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.filter_votes(|v| v.user_id == *user))
    }

    fn votes_for_category(&self, category: &CategoryId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.filter_votes(|v| v.category_id == *category))
    }

    fn votes_for_nominee(&self, nominee: &NomineeId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.filter_votes(|v| v.nominee_id == *nominee))
    }

    fn iter_votes(&self) -> Result<Vec<Vote>, StoreError> {
        Ok(self.filter_votes(|_| true))
    }
}

impl NullStore {
    fn filter_votes(&self, pred: impl Fn(&Vote) -> bool) -> Vec<Vote> {
        self.state
            .lock()
            .unwrap()
            .votes
            .values()
            .filter(|v| pred(v))
            .cloned()
            .collect()
    }
}
