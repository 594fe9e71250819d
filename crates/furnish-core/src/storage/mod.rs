//! # Storage Module
//!
//! Persistence for catalog records.
//!
//! [`CatalogStore`] is the seam between the request operations and the
//! data. Two backends implement it:
//! - [`MemoryCatalog`]: `BTreeMap`-backed, for tests and throwaway servers
//! - [`RedbCatalog`]: redb embedded database (ACID transactions,
//!   copy-on-write B-trees, crash safety)
//!
//! Stores assign identifiers from per-entity counters starting at 1 and
//! never reuse them. Every listing is in ascending id order.

mod memory;
mod redb_catalog;

pub use memory::MemoryCatalog;
pub use redb_catalog::RedbCatalog;

use crate::credentials::PasswordHash;
use crate::error::Result;
use crate::form::{FurnitureDraft, ReviewDraft};
use crate::model::{Furniture, Material, Review, User};
use crate::snapshot::CatalogSnapshot;
use crate::{FurnitureId, MaterialId, UserId};
use serde::{Deserialize, Serialize};

/// Number of records of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub users: u64,
    pub materials: u64,
    pub furniture: u64,
    pub reviews: u64,
}

impl StoreCounts {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The id each counter hands out next.
///
/// Carried in snapshots so that ids freed by deletes stay retired after an
/// export/import cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextIds {
    pub user: u64,
    pub material: u64,
    pub furniture: u64,
    pub review: u64,
}

impl Default for NextIds {
    fn default() -> Self {
        Self {
            user: 1,
            material: 1,
            furniture: 1,
            review: 1,
        }
    }
}

// =============================================================================
// CATALOGSTORE TRAIT
// =============================================================================

/// Record storage for the catalog.
///
/// Stores enforce identity (id assignment) and username uniqueness.
/// Everything else (validation, permissions, referential checks) is the
/// caller's job.
pub trait CatalogStore: Send + Sync {
    /// Insert a user. Fails with `Duplicate` if the username is taken.
    fn insert_user(
        &mut self,
        username: &str,
        password_hash: PasswordHash,
        is_superuser: bool,
    ) -> Result<User>;

    fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Look up a user by exact username.
    fn user_by_name(&self, username: &str) -> Result<Option<User>>;

    fn list_users(&self) -> Result<Vec<User>>;

    fn insert_material(&mut self, name: &str) -> Result<Material>;

    fn get_material(&self, id: MaterialId) -> Result<Option<Material>>;

    fn list_materials(&self) -> Result<Vec<Material>>;

    /// Insert a new item owned by `owner`.
    fn insert_furniture(&mut self, owner: UserId, draft: FurnitureDraft) -> Result<Furniture>;

    fn get_furniture(&self, id: FurnitureId) -> Result<Option<Furniture>>;

    /// Overwrite an existing item. Fails with `NotFound` if it is gone.
    fn update_furniture(&mut self, furniture: &Furniture) -> Result<()>;

    /// Remove an item together with all of its reviews.
    ///
    /// Returns the removed item, or `None` if it did not exist.
    fn remove_furniture(&mut self, id: FurnitureId) -> Result<Option<Furniture>>;

    fn list_furniture(&self) -> Result<Vec<Furniture>>;

    fn list_furniture_by_owner(&self, owner: UserId) -> Result<Vec<Furniture>>;

    fn insert_review(
        &mut self,
        furniture: FurnitureId,
        author: UserId,
        draft: ReviewDraft,
    ) -> Result<Review>;

    /// Reviews of one item, oldest first.
    fn reviews_for(&self, furniture: FurnitureId) -> Result<Vec<Review>>;

    fn list_reviews(&self) -> Result<Vec<Review>>;

    /// Write every record of a snapshot verbatim, keeping its ids.
    ///
    /// Each counter ends at the larger of the snapshot's counter and the
    /// highest restored id plus one. The caller checks the snapshot and that
    /// the store is empty.
    fn restore(&mut self, snapshot: &CatalogSnapshot) -> Result<()>;

    fn counts(&self) -> Result<StoreCounts>;

    fn next_ids(&self) -> Result<NextIds>;
}
