//! LMDB implementation of VoteStore.
//!
//! Every mutation touches the vote row and its secondary indexes inside one
//! write transaction. LMDB allows a single writer at a time, so the free-vote
//! uniqueness check and the insert cannot interleave with another insert.

use awards_store::vote::{Vote, VoteStore};
use awards_store::StoreError;
use awards_types::{CategoryId, NomineeId, Timestamp, UserId, VoteId, VoteType};
use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use crate::environment::{composite_key, decode, encode, id_bytes, member_of};
use crate::{LmdbEnvironment, LmdbError};

impl LmdbEnvironment {
    fn read_vote(&self, txn: &RoTxn, id: &VoteId) -> Result<Option<Vote>, LmdbError> {
        match self.votes_db.get(txn, id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn put_vote_indexes(&self, wtxn: &mut RwTxn, vote: &Vote) -> Result<(), LmdbError> {
        let vid = vote.id.as_bytes();
        self.user_votes_db
            .put(wtxn, &composite_key(vote.user_id.as_bytes(), vid), &[])?;
        self.category_votes_db
            .put(wtxn, &composite_key(vote.category_id.as_bytes(), vid), &[])?;
        self.nominee_votes_db
            .put(wtxn, &composite_key(vote.nominee_id.as_bytes(), vid), &[])?;
        Ok(())
    }

    fn delete_vote_indexes(&self, wtxn: &mut RwTxn, vote: &Vote) -> Result<(), LmdbError> {
        let vid = vote.id.as_bytes();
        self.user_votes_db
            .delete(wtxn, &composite_key(vote.user_id.as_bytes(), vid))?;
        self.category_votes_db
            .delete(wtxn, &composite_key(vote.category_id.as_bytes(), vid))?;
        self.nominee_votes_db
            .delete(wtxn, &composite_key(vote.nominee_id.as_bytes(), vid))?;
        if vote.vote_type == VoteType::Free {
            self.free_votes_db.delete(
                wtxn,
                &composite_key(vote.user_id.as_bytes(), vote.category_id.as_bytes()),
            )?;
        }
        Ok(())
    }

    /// Load every vote listed under `owner` in a `(owner, vote)` index.
    fn votes_by_index(
        &self,
        index: Database<Bytes, Bytes>,
        owner: &[u8; 16],
    ) -> Result<Vec<Vote>, LmdbError> {
        let rtxn = self.env().read_txn()?;
        let mut votes = Vec::new();
        for entry in index.prefix_iter(&rtxn, owner)? {
            let (key, _) = entry?;
            let id = VoteId::from_bytes(member_of(key)?);
            let vote = self.read_vote(&rtxn, &id)?.ok_or_else(|| {
                LmdbError::NotFound(format!("vote {} referenced by index", id))
            })?;
            votes.push(vote);
        }
        Ok(votes)
    }
}

impl VoteStore for LmdbEnvironment {
    fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;
        if self.read_vote(&wtxn, &vote.id)?.is_some() {
            return Err(StoreError::Duplicate(format!("vote {}", vote.id)));
        }
        if vote.vote_type == VoteType::Free {
            let key = composite_key(vote.user_id.as_bytes(), vote.category_id.as_bytes());
            if self
                .free_votes_db
                .get(&wtxn, &key)
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Err(StoreError::Duplicate(format!(
                    "free vote for user {} in category {}",
                    vote.user_id, vote.category_id
                )));
            }
            self.free_votes_db
                .put(&mut wtxn, &key, vote.id.as_bytes())
                .map_err(LmdbError::from)?;
        }
        let bytes = encode(vote)?;
        self.votes_db
            .put(&mut wtxn, vote.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.put_vote_indexes(&mut wtxn, vote)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_vote(&self, id: &VoteId) -> Result<Vote, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        self.read_vote(&rtxn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("vote {}", id)))
    }

    fn set_vote_nominee(
        &self,
        id: &VoteId,
        nominee: &NomineeId,
        updated_at: Timestamp,
    ) -> Result<Vote, StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;
        let mut vote = self
            .read_vote(&wtxn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("vote {}", id)))?;
        self.nominee_votes_db
            .delete(
                &mut wtxn,
                &composite_key(vote.nominee_id.as_bytes(), id.as_bytes()),
            )
            .map_err(LmdbError::from)?;
        vote.nominee_id = *nominee;
        vote.updated_at = updated_at;
        let bytes = encode(&vote)?;
        self.votes_db
            .put(&mut wtxn, id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        self.nominee_votes_db
            .put(&mut wtxn, &composite_key(nominee.as_bytes(), id.as_bytes()), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(vote)
    }

    fn delete_vote(&self, id: &VoteId) -> Result<Vote, StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;
        let vote = self
            .read_vote(&wtxn, id)?
            .ok_or_else(|| StoreError::NotFound(format!("vote {}", id)))?;
        self.votes_db
            .delete(&mut wtxn, id.as_bytes())
            .map_err(LmdbError::from)?;
        self.delete_vote_indexes(&mut wtxn, &vote)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(vote)
    }

    fn free_vote_for(
        &self,
        user: &UserId,
        category: &CategoryId,
    ) -> Result<Option<VoteId>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let key = composite_key(user.as_bytes(), category.as_bytes());
        match self.free_votes_db.get(&rtxn, &key).map_err(LmdbError::from)? {
            Some(val) => Ok(Some(VoteId::from_bytes(id_bytes(val)?))),
            None => Ok(None),
        }
    }

    fn votes_for_user(&self, user: &UserId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.votes_by_index(self.user_votes_db, user.as_bytes())?)
    }

    fn votes_for_category(&self, category: &CategoryId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.votes_by_index(self.category_votes_db, category.as_bytes())?)
    }

    fn votes_for_nominee(&self, nominee: &NomineeId) -> Result<Vec<Vote>, StoreError> {
        Ok(self.votes_by_index(self.nominee_votes_db, nominee.as_bytes())?)
    }

    fn iter_votes(&self) -> Result<Vec<Vote>, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let mut votes = Vec::new();
        for entry in self.votes_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, val) = entry.map_err(LmdbError::from)?;
            votes.push(decode(val)?);
        }
        Ok(votes)
    }

    fn vote_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        Ok(self.votes_db.len(&rtxn).map_err(LmdbError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 20).unwrap();
        (dir, env)
    }

    fn vote(id: u128, user: u128, category: u128, nominee: u128, vote_type: VoteType) -> Vote {
        Vote {
            id: VoteId::from_u128(id),
            user_id: UserId::from_u128(user),
            category_id: CategoryId::from_u128(category),
            nominee_id: NomineeId::from_u128(nominee),
            vote_type,
            created_at: Timestamp::new(100),
            updated_at: Timestamp::new(100),
        }
    }

    #[test]
    fn second_free_vote_in_category_rejected() {
        let (_dir, env) = temp_env();
        env.insert_vote(&vote(1, 1, 10, 100, VoteType::Free)).unwrap();
        let err = env
            .insert_vote(&vote(2, 1, 10, 101, VoteType::Free))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(env.vote_count().unwrap(), 1);
        assert_eq!(
            env.free_vote_for(&UserId::from_u128(1), &CategoryId::from_u128(10))
                .unwrap(),
            Some(VoteId::from_u128(1))
        );
    }

    #[test]
    fn paid_votes_are_uncapped() {
        let (_dir, env) = temp_env();
        env.insert_vote(&vote(1, 1, 10, 100, VoteType::Free)).unwrap();
        env.insert_vote(&vote(2, 1, 10, 100, VoteType::Paid)).unwrap();
        env.insert_vote(&vote(3, 1, 10, 100, VoteType::Paid)).unwrap();
        assert_eq!(
            env.votes_for_category(&CategoryId::from_u128(10))
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn delete_releases_free_slot_and_indexes() {
        let (_dir, env) = temp_env();
        env.insert_vote(&vote(1, 1, 10, 100, VoteType::Free)).unwrap();
        let removed = env.delete_vote(&VoteId::from_u128(1)).unwrap();
        assert_eq!(removed.vote_type, VoteType::Free);
        assert!(env.votes_for_user(&UserId::from_u128(1)).unwrap().is_empty());
        assert!(env
            .votes_for_nominee(&NomineeId::from_u128(100))
            .unwrap()
            .is_empty());
        env.insert_vote(&vote(2, 1, 10, 100, VoteType::Free)).unwrap();
        assert!(env
            .delete_vote(&VoteId::from_u128(1))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn set_vote_nominee_moves_nominee_index() {
        let (_dir, env) = temp_env();
        env.insert_vote(&vote(1, 1, 10, 100, VoteType::Paid)).unwrap();
        let updated = env
            .set_vote_nominee(&VoteId::from_u128(1), &NomineeId::from_u128(200), Timestamp::new(150))
            .unwrap();
        assert_eq!(updated.nominee_id, NomineeId::from_u128(200));
        assert_eq!(updated.created_at, Timestamp::new(100));
        assert_eq!(updated.updated_at, Timestamp::new(150));
        assert!(env
            .votes_for_nominee(&NomineeId::from_u128(100))
            .unwrap()
            .is_empty());
        assert_eq!(
            env.votes_for_nominee(&NomineeId::from_u128(200))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn votes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 16, 1 << 20).unwrap();
            env.insert_vote(&vote(1, 1, 10, 100, VoteType::Free)).unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 20).unwrap();
        assert_eq!(
            env.get_vote(&VoteId::from_u128(1)).unwrap().nominee_id,
            NomineeId::from_u128(100)
        );
    }
}
