//! # Catalog
//!
//! The request operations of the furniture catalog.
//!
//! Each public method corresponds to one page or form submission of the
//! web app. Methods take the acting [`User`] explicitly; login is the HTTP
//! layer's concern, permission is decided here.
//!
//! Lookup failures come before permission failures: asking to edit an item
//! that does not exist is `NotFound`, not `Forbidden`.

use crate::access::has_access_to_modify;
use crate::credentials::PasswordHash;
use crate::error::{CatalogError, Result};
use crate::form::{
    FormErrors, FurnitureDraft, FurnitureInput, MaterialInput, ReviewInput, UserInput,
};
use crate::model::{Furniture, Material, Review, User};
use crate::snapshot::CatalogSnapshot;
use crate::storage::{CatalogStore, MemoryCatalog, RedbCatalog, StoreCounts};
use crate::{FurnitureId, MaterialId, UserId};
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// VIEW TYPES
// =============================================================================

/// A furniture item with the names a listing shows next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FurnitureSummary {
    pub furniture: Furniture,
    pub owner: String,
    pub material: Option<String>,
}

/// A review with its author's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewView {
    pub review: Review,
    pub author: String,
}

/// Everything the detail page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FurnitureDetail {
    pub furniture: Furniture,
    pub owner: String,
    pub material: Option<String>,
    /// Reviews, oldest first.
    pub reviews: Vec<ReviewView>,
    /// Whether the viewer may edit or delete the item.
    pub can_modify: bool,
}

// =============================================================================
// CATALOG
// =============================================================================

/// The furniture catalog over a boxed [`CatalogStore`].
pub struct Catalog {
    store: Box<dyn CatalogStore>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

impl Catalog {
    /// Wrap an existing store.
    pub fn new(store: impl CatalogStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// An empty catalog that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryCatalog::new())
    }

    /// Open (or create) a redb-backed catalog.
    pub fn open_redb(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(RedbCatalog::open(path)?))
    }

    /// Read-only access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    fn furniture_or_404(&self, id: FurnitureId) -> Result<Furniture> {
        self.store
            .get_furniture(id)?
            .ok_or_else(|| CatalogError::not_found("furniture", id.0))
    }

    /// Fetch an item the user is allowed to modify.
    fn modifiable(&self, user: &User, id: FurnitureId) -> Result<Furniture> {
        let furniture = self.furniture_or_404(id)?;
        if !has_access_to_modify(user, &furniture) {
            tracing::warn!(
                user = %user.username,
                furniture = %id,
                "permission denied"
            );
            return Err(CatalogError::Forbidden);
        }
        Ok(furniture)
    }

    fn usernames(&self) -> Result<BTreeMap<UserId, String>> {
        Ok(self
            .store
            .list_users()?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect())
    }

    fn material_names(&self) -> Result<BTreeMap<MaterialId, String>> {
        Ok(self
            .store
            .list_materials()?
            .into_iter()
            .map(|material| (material.id, material.name))
            .collect())
    }

    fn summarize(&self, items: Vec<Furniture>) -> Result<Vec<FurnitureSummary>> {
        let users = self.usernames()?;
        let materials = self.material_names()?;
        Ok(items
            .into_iter()
            .map(|furniture| FurnitureSummary {
                owner: users.get(&furniture.owner).cloned().unwrap_or_default(),
                material: furniture
                    .material
                    .and_then(|id| materials.get(&id).cloned()),
                furniture,
            })
            .collect())
    }

    // =========================================================================
    // PAGES
    // =========================================================================

    /// Every item in the catalog.
    pub fn list_furniture(&self) -> Result<Vec<FurnitureSummary>> {
        let items = self.store.list_furniture()?;
        self.summarize(items)
    }

    /// Items listed by `user`. Empty when the user has listed nothing.
    pub fn list_user_furniture(&self, user: &User) -> Result<Vec<FurnitureSummary>> {
        let items = self.store.list_furniture_by_owner(user.id)?;
        self.summarize(items)
    }

    /// One item with its reviews, as seen by `viewer`.
    pub fn furniture_detail(&self, viewer: &User, id: FurnitureId) -> Result<FurnitureDetail> {
        let furniture = self.furniture_or_404(id)?;
        let users = self.usernames()?;

        let material = match furniture.material {
            Some(material) => self.store.get_material(material)?.map(|m| m.name),
            None => None,
        };
        let reviews = self
            .store
            .reviews_for(id)?
            .into_iter()
            .map(|review| ReviewView {
                author: users.get(&review.author).cloned().unwrap_or_default(),
                review,
            })
            .collect();

        let owner = self
            .store
            .get_user(furniture.owner)?
            .map(|user| user.username)
            .unwrap_or_default();

        Ok(FurnitureDetail {
            can_modify: has_access_to_modify(viewer, &furniture),
            owner,
            material,
            reviews,
            furniture,
        })
    }

    /// All materials, for the furniture form's choices.
    pub fn materials(&self) -> Result<Vec<Material>> {
        self.store.list_materials()
    }

    // =========================================================================
    // SUBMISSIONS
    // =========================================================================

    /// Leave a review on an item. Anyone logged in may review anything.
    pub fn add_review(
        &mut self,
        author: &User,
        id: FurnitureId,
        input: &ReviewInput,
    ) -> Result<Review> {
        self.furniture_or_404(id)?;
        let draft = input.validate().map_err(CatalogError::Invalid)?;
        let review = self.store.insert_review(id, author.id, draft)?;
        tracing::info!(
            review = %review.id,
            furniture = %id,
            author = %author.username,
            "review added"
        );
        Ok(review)
    }

    fn validate_furniture(&self, input: &FurnitureInput) -> Result<FurnitureDraft> {
        let known: Vec<MaterialId> = self
            .store
            .list_materials()?
            .into_iter()
            .map(|material| material.id)
            .collect();
        input
            .validate(|id| known.contains(&id))
            .map_err(CatalogError::Invalid)
    }

    /// List a new item owned by `owner`.
    pub fn create_furniture(&mut self, owner: &User, input: &FurnitureInput) -> Result<Furniture> {
        let draft = self.validate_furniture(input)?;
        let furniture = self.store.insert_furniture(owner.id, draft)?;
        tracing::info!(
            furniture = %furniture.id,
            owner = %owner.username,
            "furniture created"
        );
        Ok(furniture)
    }

    /// The item to pre-fill the edit form with, if `user` may edit it.
    pub fn edit_form(&self, user: &User, id: FurnitureId) -> Result<Furniture> {
        self.modifiable(user, id)
    }

    /// Apply an edit. The owner never changes, even when a superuser edits.
    pub fn edit_furniture(
        &mut self,
        user: &User,
        id: FurnitureId,
        input: &FurnitureInput,
    ) -> Result<Furniture> {
        let current = self.modifiable(user, id)?;
        let draft = self.validate_furniture(input)?;
        let updated = draft.into_furniture(current.id, current.owner);
        self.store.update_furniture(&updated)?;
        tracing::info!(furniture = %id, editor = %user.username, "furniture updated");
        Ok(updated)
    }

    /// The item to show on the delete confirmation page, if `user` may delete it.
    pub fn delete_form(&self, user: &User, id: FurnitureId) -> Result<Furniture> {
        self.modifiable(user, id)
    }

    /// Delete an item and its reviews.
    pub fn delete_furniture(&mut self, user: &User, id: FurnitureId) -> Result<Furniture> {
        self.modifiable(user, id)?;
        let removed = self
            .store
            .remove_furniture(id)?
            .ok_or_else(|| CatalogError::not_found("furniture", id.0))?;
        tracing::info!(furniture = %id, by = %user.username, "furniture deleted");
        Ok(removed)
    }

    /// Register a material. Names are unique ignoring ASCII case.
    pub fn create_material(&mut self, input: &MaterialInput) -> Result<Material> {
        let name = input.validate().map_err(CatalogError::Invalid)?;
        let taken = self
            .store
            .list_materials()?
            .iter()
            .any(|material| material.name.eq_ignore_ascii_case(&name));
        if taken {
            return Err(CatalogError::Invalid(FormErrors::single(
                "name",
                "Material with this name already exists.",
            )));
        }
        let material = self.store.insert_material(&name)?;
        tracing::info!(material = %material.id, name = %material.name, "material created");
        Ok(material)
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    /// Create a user account.
    pub fn register_user(&mut self, input: &UserInput, is_superuser: bool) -> Result<User> {
        let draft = input.validate().map_err(CatalogError::Invalid)?;
        let hash = PasswordHash::derive(&draft.username, &draft.password);
        let user = match self.store.insert_user(&draft.username, hash, is_superuser) {
            Err(CatalogError::Duplicate(_)) => {
                return Err(CatalogError::Invalid(FormErrors::single(
                    "username",
                    "A user with that username already exists.",
                )));
            }
            other => other?,
        };
        tracing::info!(user = %user.id, username = %user.username, is_superuser, "user registered");
        Ok(user)
    }

    /// Check a username/password pair.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        match self.store.user_by_name(username)? {
            Some(user) if user.password_hash.verify(&user.username, password) => Ok(user),
            Some(_) => Err(CatalogError::InvalidCredentials),
            None => {
                // Same work as a real check, so unknown names take as long.
                std::hint::black_box(PasswordHash::derive(username, password));
                Err(CatalogError::InvalidCredentials)
            }
        }
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Record counts.
    pub fn status(&self) -> Result<StoreCounts> {
        self.store.counts()
    }

    /// Capture the whole catalog.
    pub fn export(&self) -> Result<CatalogSnapshot> {
        CatalogSnapshot::capture(self.store.as_ref())
    }

    /// Load a snapshot into this catalog, which must be empty.
    pub fn import(&mut self, snapshot: &CatalogSnapshot) -> Result<()> {
        snapshot.check()?;
        if !self.store.counts()?.is_empty() {
            return Err(CatalogError::Snapshot(
                "refusing to import into a non-empty catalog".to_string(),
            ));
        }
        self.store.restore(snapshot)?;
        tracing::info!(
            users = snapshot.users.len(),
            furniture = snapshot.furniture.len(),
            reviews = snapshot.reviews.len(),
            "snapshot imported"
        );
        Ok(())
    }
}
