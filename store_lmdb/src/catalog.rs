//! LMDB implementations of CategoryStore, NomineeStore and
//! NomineeCategoryStore.

use awards_store::category::{Category, CategoryStore};
use awards_store::nominee::{Nominee, NomineeStore};
use awards_store::nominee_category::NomineeCategoryStore;
use awards_store::StoreError;
use awards_types::{CategoryId, NomineeId};
use heed::types::Bytes;
use heed::Database;
use serde::de::DeserializeOwned;

use crate::environment::{composite_key, decode, encode, member_of};
use crate::{LmdbEnvironment, LmdbError};

impl LmdbEnvironment {
    fn get_record<T: DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
        key: &[u8; 16],
        what: &str,
    ) -> Result<T, LmdbError> {
        let rtxn = self.env().read_txn()?;
        let bytes = db
            .get(&rtxn, key)?
            .ok_or_else(|| LmdbError::NotFound(what.to_string()))?;
        decode(bytes)
    }

    fn put_record(
        &self,
        db: Database<Bytes, Bytes>,
        key: &[u8; 16],
        bytes: &[u8],
    ) -> Result<(), LmdbError> {
        let mut wtxn = self.env().write_txn()?;
        db.put(&mut wtxn, key, bytes)?;
        wtxn.commit()?;
        Ok(())
    }

    fn iter_records<T: DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
    ) -> Result<Vec<T>, LmdbError> {
        let rtxn = self.env().read_txn()?;
        let mut out = Vec::new();
        for entry in db.iter(&rtxn)? {
            let (_, val) = entry?;
            out.push(decode(val)?);
        }
        Ok(out)
    }

    fn index_members(
        &self,
        db: Database<Bytes, Bytes>,
        owner: &[u8; 16],
    ) -> Result<Vec<[u8; 16]>, LmdbError> {
        let rtxn = self.env().read_txn()?;
        let mut out = Vec::new();
        for entry in db.prefix_iter(&rtxn, owner)? {
            let (key, _) = entry?;
            out.push(member_of(key)?);
        }
        Ok(out)
    }
}

impl CategoryStore for LmdbEnvironment {
    fn put_category(&self, category: &Category) -> Result<(), StoreError> {
        let bytes = encode(category)?;
        Ok(self.put_record(self.categories_db, category.id.as_bytes(), &bytes)?)
    }

    fn get_category(&self, id: &CategoryId) -> Result<Category, StoreError> {
        Ok(self.get_record(self.categories_db, id.as_bytes(), &format!("category {}", id))?)
    }

    fn iter_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.iter_records(self.categories_db)?)
    }
}

impl NomineeStore for LmdbEnvironment {
    fn put_nominee(&self, nominee: &Nominee) -> Result<(), StoreError> {
        let bytes = encode(nominee)?;
        Ok(self.put_record(self.nominees_db, nominee.id.as_bytes(), &bytes)?)
    }

    fn get_nominee(&self, id: &NomineeId) -> Result<Nominee, StoreError> {
        Ok(self.get_record(self.nominees_db, id.as_bytes(), &format!("nominee {}", id))?)
    }

    fn iter_nominees(&self) -> Result<Vec<Nominee>, StoreError> {
        Ok(self.iter_records(self.nominees_db)?)
    }
}

impl NomineeCategoryStore for LmdbEnvironment {
    fn assign(&self, nominee: &NomineeId, category: &CategoryId) -> Result<(), StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;
        self.nominee_categories_db
            .put(
                &mut wtxn,
                &composite_key(nominee.as_bytes(), category.as_bytes()),
                &[],
            )
            .map_err(LmdbError::from)?;
        self.category_nominees_db
            .put(
                &mut wtxn,
                &composite_key(category.as_bytes(), nominee.as_bytes()),
                &[],
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn unassign(&self, nominee: &NomineeId, category: &CategoryId) -> Result<bool, StoreError> {
        let mut wtxn = self.env().write_txn().map_err(LmdbError::from)?;
        let existed = self
            .nominee_categories_db
            .delete(
                &mut wtxn,
                &composite_key(nominee.as_bytes(), category.as_bytes()),
            )
            .map_err(LmdbError::from)?;
        self.category_nominees_db
            .delete(
                &mut wtxn,
                &composite_key(category.as_bytes(), nominee.as_bytes()),
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(existed)
    }

    fn is_assigned(&self, nominee: &NomineeId, category: &CategoryId) -> Result<bool, StoreError> {
        let rtxn = self.env().read_txn().map_err(LmdbError::from)?;
        let found = self
            .nominee_categories_db
            .get(&rtxn, &composite_key(nominee.as_bytes(), category.as_bytes()))
            .map_err(LmdbError::from)?
            .is_some();
        Ok(found)
    }

    fn nominees_in_category(&self, category: &CategoryId) -> Result<Vec<NomineeId>, StoreError> {
        Ok(self
            .index_members(self.category_nominees_db, category.as_bytes())?
            .into_iter()
            .map(NomineeId::from_bytes)
            .collect())
    }

    fn categories_for_nominee(&self, nominee: &NomineeId) -> Result<Vec<CategoryId>, StoreError> {
        Ok(self
            .index_members(self.nominee_categories_db, nominee.as_bytes())?
            .into_iter()
            .map(CategoryId::from_bytes)
            .collect())
    }
}
