//! redb-backed catalog store.
//!
//! One table per record kind, keyed by id, values encoded with postcard.
//! A `usernames` table indexes users by name and a `meta` table holds the
//! id counters. Each mutation runs in a single write transaction, so a
//! furniture delete and its review cascade commit (or abort) together.

use super::{CatalogStore, NextIds, StoreCounts};
use crate::credentials::PasswordHash;
use crate::error::{CatalogError, Result};
use crate::form::{FurnitureDraft, ReviewDraft};
use crate::model::{Furniture, Material, Review, User};
use crate::snapshot::CatalogSnapshot;
use crate::{FurnitureId, MaterialId, ReviewId, UserId};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

type RecordTable = TableDefinition<'static, u64, &'static [u8]>;

const USERS: RecordTable = TableDefinition::new("users");
const MATERIALS: RecordTable = TableDefinition::new("materials");
const FURNITURE: RecordTable = TableDefinition::new("furniture");
const REVIEWS: RecordTable = TableDefinition::new("reviews");
const USERNAMES: TableDefinition<&str, u64> = TableDefinition::new("usernames");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_USER: &str = "next_user";
const NEXT_MATERIAL: &str = "next_material";
const NEXT_FURNITURE: &str = "next_furniture";
const NEXT_REVIEW: &str = "next_review";

/// Catalog persisted in a redb database file.
pub struct RedbCatalog {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCatalog")
            .field("path", &self.path)
            .finish()
    }
}

impl RedbCatalog {
    /// Open the database at `path`, creating it (and every table) if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path)?;

        // Read transactions fail on tables that were never created.
        let txn = db.begin_write()?;
        txn.open_table(USERS)?;
        txn.open_table(MATERIALS)?;
        txn.open_table(FURNITURE)?;
        txn.open_table(REVIEWS)?;
        txn.open_table(USERNAMES)?;
        txn.open_table(META)?;
        txn.commit()?;

        tracing::debug!(path = %path.display(), "opened redb catalog");
        Ok(Self { db, path })
    }

    fn read_one<T: DeserializeOwned>(&self, table: RecordTable, id: u64) -> Result<Option<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table)?;
        let value = match table.get(id)? {
            Some(guard) => Some(postcard::from_bytes(guard.value())?),
            None => None,
        };
        Ok(value)
    }

    fn read_where<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        keep: impl Fn(&T) -> bool,
    ) -> Result<Vec<T>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: T = postcard::from_bytes(value.value())?;
            if keep(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn read_all<T: DeserializeOwned>(&self, table: RecordTable) -> Result<Vec<T>> {
        self.read_where(table, |_| true)
    }
}

// =============================================================================
// WRITE HELPERS
// =============================================================================

/// Hand out the next id for `counter` and advance it.
fn next_id(txn: &WriteTransaction, counter: &str) -> Result<u64> {
    let mut meta = txn.open_table(META)?;
    let id = meta.get(counter)?.map(|guard| guard.value()).unwrap_or(1);
    meta.insert(counter, id.saturating_add(1))?;
    Ok(id)
}

/// Raise `counter` to at least `next`. Counters never go down.
fn raise_counter(txn: &WriteTransaction, counter: &str, next: u64) -> Result<()> {
    let mut meta = txn.open_table(META)?;
    let current = meta.get(counter)?.map(|guard| guard.value()).unwrap_or(1);
    meta.insert(counter, current.max(next))?;
    Ok(())
}

fn put<T: Serialize>(txn: &WriteTransaction, table: RecordTable, id: u64, record: &T) -> Result<()> {
    let bytes = postcard::to_allocvec(record)?;
    let mut table = txn.open_table(table)?;
    table.insert(id, bytes.as_slice())?;
    Ok(())
}

impl CatalogStore for RedbCatalog {
    fn insert_user(
        &mut self,
        username: &str,
        password_hash: PasswordHash,
        is_superuser: bool,
    ) -> Result<User> {
        let txn = self.db.begin_write()?;
        {
            let names = txn.open_table(USERNAMES)?;
            if names.get(username)?.is_some() {
                return Err(CatalogError::Duplicate(format!("username {username}")));
            }
        }
        let user = User {
            id: UserId(next_id(&txn, NEXT_USER)?),
            username: username.to_string(),
            password_hash,
            is_superuser,
        };
        put(&txn, USERS, user.id.0, &user)?;
        {
            let mut names = txn.open_table(USERNAMES)?;
            names.insert(username, user.id.0)?;
        }
        txn.commit()?;
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.read_one(USERS, id.0)
    }

    fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        let id = {
            let txn = self.db.begin_read()?;
            let names = txn.open_table(USERNAMES)?;
            let id = names.get(username)?.map(|guard| guard.value());
            id
        };
        match id {
            Some(id) => self.read_one(USERS, id),
            None => Ok(None),
        }
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.read_all(USERS)
    }

    fn insert_material(&mut self, name: &str) -> Result<Material> {
        let txn = self.db.begin_write()?;
        let material = Material {
            id: MaterialId(next_id(&txn, NEXT_MATERIAL)?),
            name: name.to_string(),
        };
        put(&txn, MATERIALS, material.id.0, &material)?;
        txn.commit()?;
        Ok(material)
    }

    fn get_material(&self, id: MaterialId) -> Result<Option<Material>> {
        self.read_one(MATERIALS, id.0)
    }

    fn list_materials(&self) -> Result<Vec<Material>> {
        self.read_all(MATERIALS)
    }

    fn insert_furniture(&mut self, owner: UserId, draft: FurnitureDraft) -> Result<Furniture> {
        let txn = self.db.begin_write()?;
        let id = FurnitureId(next_id(&txn, NEXT_FURNITURE)?);
        let furniture = draft.into_furniture(id, owner);
        put(&txn, FURNITURE, id.0, &furniture)?;
        txn.commit()?;
        Ok(furniture)
    }

    fn get_furniture(&self, id: FurnitureId) -> Result<Option<Furniture>> {
        self.read_one(FURNITURE, id.0)
    }

    fn update_furniture(&mut self, furniture: &Furniture) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let table = txn.open_table(FURNITURE)?;
            if table.get(furniture.id.0)?.is_none() {
                return Err(CatalogError::not_found("furniture", furniture.id.0));
            }
        }
        put(&txn, FURNITURE, furniture.id.0, furniture)?;
        txn.commit()?;
        Ok(())
    }

    fn remove_furniture(&mut self, id: FurnitureId) -> Result<Option<Furniture>> {
        let txn = self.db.begin_write()?;
        let removed: Option<Furniture> = {
            let mut table = txn.open_table(FURNITURE)?;
            let removed = match table.remove(id.0)? {
                Some(guard) => Some(postcard::from_bytes(guard.value())?),
                None => None,
            };
            removed
        };
        if removed.is_none() {
            return Ok(None);
        }

        {
            let mut reviews = txn.open_table(REVIEWS)?;
            let mut doomed = Vec::new();
            for entry in reviews.iter()? {
                let (key, value) = entry?;
                let review: Review = postcard::from_bytes(value.value())?;
                if review.furniture == id {
                    doomed.push(key.value());
                }
            }
            for key in doomed {
                reviews.remove(key)?;
            }
        }

        txn.commit()?;
        Ok(removed)
    }

    fn list_furniture(&self) -> Result<Vec<Furniture>> {
        self.read_all(FURNITURE)
    }

    fn list_furniture_by_owner(&self, owner: UserId) -> Result<Vec<Furniture>> {
        self.read_where(FURNITURE, |furniture: &Furniture| furniture.owner == owner)
    }

    fn insert_review(
        &mut self,
        furniture: FurnitureId,
        author: UserId,
        draft: ReviewDraft,
    ) -> Result<Review> {
        let txn = self.db.begin_write()?;
        let review = Review {
            id: ReviewId(next_id(&txn, NEXT_REVIEW)?),
            furniture,
            author,
            content: draft.content,
            score: draft.score,
        };
        put(&txn, REVIEWS, review.id.0, &review)?;
        txn.commit()?;
        Ok(review)
    }

    fn reviews_for(&self, furniture: FurnitureId) -> Result<Vec<Review>> {
        self.read_where(REVIEWS, |review: &Review| review.furniture == furniture)
    }

    fn list_reviews(&self) -> Result<Vec<Review>> {
        self.read_all(REVIEWS)
    }

    fn restore(&mut self, snapshot: &CatalogSnapshot) -> Result<()> {
        let txn = self.db.begin_write()?;
        for user in &snapshot.users {
            put(&txn, USERS, user.id.0, user)?;
            {
                let mut names = txn.open_table(USERNAMES)?;
                names.insert(user.username.as_str(), user.id.0)?;
            }
            raise_counter(&txn, NEXT_USER, user.id.0.saturating_add(1))?;
        }
        for material in &snapshot.materials {
            put(&txn, MATERIALS, material.id.0, material)?;
            raise_counter(&txn, NEXT_MATERIAL, material.id.0.saturating_add(1))?;
        }
        for furniture in &snapshot.furniture {
            put(&txn, FURNITURE, furniture.id.0, furniture)?;
            raise_counter(&txn, NEXT_FURNITURE, furniture.id.0.saturating_add(1))?;
        }
        for review in &snapshot.reviews {
            put(&txn, REVIEWS, review.id.0, review)?;
            raise_counter(&txn, NEXT_REVIEW, review.id.0.saturating_add(1))?;
        }
        let next = snapshot.next_ids;
        raise_counter(&txn, NEXT_USER, next.user)?;
        raise_counter(&txn, NEXT_MATERIAL, next.material)?;
        raise_counter(&txn, NEXT_FURNITURE, next.furniture)?;
        raise_counter(&txn, NEXT_REVIEW, next.review)?;
        txn.commit()?;
        Ok(())
    }

    fn counts(&self) -> Result<StoreCounts> {
        let txn = self.db.begin_read()?;
        Ok(StoreCounts {
            users: txn.open_table(USERS)?.len()?,
            materials: txn.open_table(MATERIALS)?.len()?,
            furniture: txn.open_table(FURNITURE)?.len()?,
            reviews: txn.open_table(REVIEWS)?.len()?,
        })
    }

    fn next_ids(&self) -> Result<NextIds> {
        let txn = self.db.begin_read()?;
        let meta = txn.open_table(META)?;
        let read = |counter: &str| -> Result<u64> {
            Ok(meta.get(counter)?.map(|guard| guard.value()).unwrap_or(1))
        };
        Ok(NextIds {
            user: read(NEXT_USER)?,
            material: read(NEXT_MATERIAL)?,
            furniture: read(NEXT_FURNITURE)?,
            review: read(NEXT_REVIEW)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Price;

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.redb");

        let chair = {
            let mut store = RedbCatalog::open(&path).unwrap();
            let owner = store
                .insert_user("alice", PasswordHash::derive("alice", "password1"), false)
                .unwrap();
            let draft = FurnitureDraft {
                kind: "Chair".into(),
                model: "Ekenäs".into(),
                description: "Rattan".into(),
                price: Price::from_cents(24900),
                image_url: Some("https://example.com/chair.png".into()),
                material: None,
            };
            store.insert_furniture(owner.id, draft).unwrap()
        };

        let mut store = RedbCatalog::open(&path).unwrap();
        assert_eq!(store.get_furniture(chair.id).unwrap(), Some(chair.clone()));
        let alice = store.user_by_name("alice").unwrap().unwrap();
        assert!(alice.password_hash.verify("alice", "password1"));

        // Counters persist too.
        let second = store
            .insert_user("bob", PasswordHash::derive("bob", "password1"), false)
            .unwrap();
        assert_eq!(second.id, UserId(2));
    }

    #[test]
    fn test_failed_insert_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RedbCatalog::open(dir.path().join("catalog.redb")).unwrap();
        let hash = PasswordHash::derive("alice", "password1");
        store.insert_user("alice", hash.clone(), false).unwrap();
        assert!(store.insert_user("alice", hash.clone(), false).is_err());

        assert_eq!(store.counts().unwrap().users, 1);
        // The aborted transaction did not consume an id.
        assert_eq!(store.insert_user("bob", hash, false).unwrap().id, UserId(2));
    }
}
