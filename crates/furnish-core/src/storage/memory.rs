//! In-memory catalog store.

use super::{CatalogStore, NextIds, StoreCounts};
use crate::credentials::PasswordHash;
use crate::error::{CatalogError, Result};
use crate::form::{FurnitureDraft, ReviewDraft};
use crate::model::{Furniture, Material, Review, User};
use crate::snapshot::CatalogSnapshot;
use crate::{FurnitureId, MaterialId, ReviewId, UserId};
use std::collections::BTreeMap;

/// Catalog held entirely in `BTreeMap`s.
///
/// Nothing survives the process. Used by tests and by `serve --backend memory`.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    users: BTreeMap<UserId, User>,
    /// Reverse lookup: username -> UserId
    usernames: BTreeMap<String, UserId>,
    materials: BTreeMap<MaterialId, Material>,
    furniture: BTreeMap<FurnitureId, Furniture>,
    reviews: BTreeMap<ReviewId, Review>,
    next_user: u64,
    next_material: u64,
    next_furniture: u64,
    next_review: u64,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            usernames: BTreeMap::new(),
            materials: BTreeMap::new(),
            furniture: BTreeMap::new(),
            reviews: BTreeMap::new(),
            next_user: 1,
            next_material: 1,
            next_furniture: 1,
            next_review: 1,
        }
    }
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Hand out the current counter value and advance it.
fn take(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter = counter.saturating_add(1);
    id
}

impl CatalogStore for MemoryCatalog {
    fn insert_user(
        &mut self,
        username: &str,
        password_hash: PasswordHash,
        is_superuser: bool,
    ) -> Result<User> {
        if self.usernames.contains_key(username) {
            return Err(CatalogError::Duplicate(format!("username {username}")));
        }
        let user = User {
            id: UserId(take(&mut self.next_user)),
            username: username.to_string(),
            password_hash,
            is_superuser,
        };
        self.usernames.insert(user.username.clone(), user.id);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).cloned())
    }

    fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .usernames
            .get(username)
            .and_then(|id| self.users.get(id))
            .cloned())
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.users.values().cloned().collect())
    }

    fn insert_material(&mut self, name: &str) -> Result<Material> {
        let material = Material {
            id: MaterialId(take(&mut self.next_material)),
            name: name.to_string(),
        };
        self.materials.insert(material.id, material.clone());
        Ok(material)
    }

    fn get_material(&self, id: MaterialId) -> Result<Option<Material>> {
        Ok(self.materials.get(&id).cloned())
    }

    fn list_materials(&self) -> Result<Vec<Material>> {
        Ok(self.materials.values().cloned().collect())
    }

    fn insert_furniture(&mut self, owner: UserId, draft: FurnitureDraft) -> Result<Furniture> {
        let id = FurnitureId(take(&mut self.next_furniture));
        let furniture = draft.into_furniture(id, owner);
        self.furniture.insert(id, furniture.clone());
        Ok(furniture)
    }

    fn get_furniture(&self, id: FurnitureId) -> Result<Option<Furniture>> {
        Ok(self.furniture.get(&id).cloned())
    }

    fn update_furniture(&mut self, furniture: &Furniture) -> Result<()> {
        match self.furniture.get_mut(&furniture.id) {
            Some(slot) => {
                *slot = furniture.clone();
                Ok(())
            }
            None => Err(CatalogError::not_found("furniture", furniture.id.0)),
        }
    }

    fn remove_furniture(&mut self, id: FurnitureId) -> Result<Option<Furniture>> {
        let removed = self.furniture.remove(&id);
        if removed.is_some() {
            self.reviews.retain(|_, review| review.furniture != id);
        }
        Ok(removed)
    }

    fn list_furniture(&self) -> Result<Vec<Furniture>> {
        Ok(self.furniture.values().cloned().collect())
    }

    fn list_furniture_by_owner(&self, owner: UserId) -> Result<Vec<Furniture>> {
        Ok(self
            .furniture
            .values()
            .filter(|furniture| furniture.owner == owner)
            .cloned()
            .collect())
    }

    fn insert_review(
        &mut self,
        furniture: FurnitureId,
        author: UserId,
        draft: ReviewDraft,
    ) -> Result<Review> {
        let review = Review {
            id: ReviewId(take(&mut self.next_review)),
            furniture,
            author,
            content: draft.content,
            score: draft.score,
        };
        self.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    fn reviews_for(&self, furniture: FurnitureId) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .values()
            .filter(|review| review.furniture == furniture)
            .cloned()
            .collect())
    }

    fn list_reviews(&self) -> Result<Vec<Review>> {
        Ok(self.reviews.values().cloned().collect())
    }

    fn restore(&mut self, snapshot: &CatalogSnapshot) -> Result<()> {
        for user in &snapshot.users {
            self.usernames.insert(user.username.clone(), user.id);
            self.users.insert(user.id, user.clone());
            self.next_user = self.next_user.max(user.id.0.saturating_add(1));
        }
        for material in &snapshot.materials {
            self.materials.insert(material.id, material.clone());
            self.next_material = self.next_material.max(material.id.0.saturating_add(1));
        }
        for furniture in &snapshot.furniture {
            self.furniture.insert(furniture.id, furniture.clone());
            self.next_furniture = self.next_furniture.max(furniture.id.0.saturating_add(1));
        }
        for review in &snapshot.reviews {
            self.reviews.insert(review.id, review.clone());
            self.next_review = self.next_review.max(review.id.0.saturating_add(1));
        }
        let next = snapshot.next_ids;
        self.next_user = self.next_user.max(next.user);
        self.next_material = self.next_material.max(next.material);
        self.next_furniture = self.next_furniture.max(next.furniture);
        self.next_review = self.next_review.max(next.review);
        Ok(())
    }

    fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            users: self.users.len() as u64,
            materials: self.materials.len() as u64,
            furniture: self.furniture.len() as u64,
            reviews: self.reviews.len() as u64,
        })
    }

    fn next_ids(&self) -> Result<NextIds> {
        Ok(NextIds {
            user: self.next_user,
            material: self.next_material,
            furniture: self.next_furniture,
            review: self.next_review,
        })
    }
}
