//! # Snapshot
//!
//! Whole-catalog export/import as JSON.
//!
//! A snapshot carries every record with its original id, plus the id
//! counters so that ids freed by deletes are not handed out again after an
//! import. Import checks the snapshot's internal consistency and re-runs
//! the form rules on every record before anything is written, so a bad or
//! hand-edited file never leaves a half-imported catalog behind.

use crate::error::{CatalogError, Result};
use crate::form::{FurnitureInput, MaterialInput, ReviewInput, validate_username};
use crate::model::{Furniture, Material, Review, User};
use crate::storage::{CatalogStore, NextIds};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Every record in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub version: u32,
    pub users: Vec<User>,
    pub materials: Vec<Material>,
    pub furniture: Vec<Furniture>,
    pub reviews: Vec<Review>,
    /// Counters at export time. Missing in hand-written files.
    #[serde(default)]
    pub next_ids: NextIds,
}

impl CatalogSnapshot {
    /// Read every record out of `store`.
    pub fn capture(store: &dyn CatalogStore) -> Result<Self> {
        Ok(Self {
            version: SNAPSHOT_VERSION,
            users: store.list_users()?,
            materials: store.list_materials()?,
            furniture: store.list_furniture()?,
            reviews: store.list_reviews()?,
            next_ids: store.next_ids()?,
        })
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CatalogError::Snapshot(e.to_string()))
    }

    /// Parse from JSON and check consistency.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| CatalogError::Snapshot(e.to_string()))?;
        snapshot.check()?;
        Ok(snapshot)
    }

    /// Check version, id and name uniqueness, references, and that every
    /// record would pass its form's validation unchanged.
    pub fn check(&self) -> Result<()> {
        let fail = |message: String| Err(CatalogError::Snapshot(message));

        if self.version != SNAPSHOT_VERSION {
            return fail(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            ));
        }

        let mut user_ids = BTreeSet::new();
        let mut usernames = BTreeSet::new();
        for user in &self.users {
            if !user_ids.insert(user.id) {
                return fail(format!("duplicate user id {}", user.id));
            }
            if !usernames.insert(user.username.as_str()) {
                return fail(format!("duplicate username {}", user.username));
            }
            match validate_username(&user.username) {
                Ok(name) if name == user.username => {}
                Ok(_) => return fail(format!("user {}: untrimmed username", user.id)),
                Err(errors) => return fail(format!("user {}: {errors}", user.id)),
            }
        }

        let mut material_ids = BTreeSet::new();
        let mut material_names = BTreeSet::new();
        for material in &self.materials {
            if !material_ids.insert(material.id) {
                return fail(format!("duplicate material id {}", material.id));
            }
            let input = MaterialInput {
                name: material.name.clone(),
            };
            match input.validate() {
                Ok(name) if name == material.name => {}
                Ok(_) => return fail(format!("material {}: untrimmed name", material.id)),
                Err(errors) => return fail(format!("material {}: {errors}", material.id)),
            }
            if !material_names.insert(material.name.to_ascii_lowercase()) {
                return fail(format!("duplicate material name {}", material.name));
            }
        }

        let mut furniture_ids = BTreeSet::new();
        for furniture in &self.furniture {
            if !furniture_ids.insert(furniture.id) {
                return fail(format!("duplicate furniture id {}", furniture.id));
            }
            if !user_ids.contains(&furniture.owner) {
                return fail(format!(
                    "furniture {} owned by unknown user {}",
                    furniture.id, furniture.owner
                ));
            }
            if let Some(material) = furniture.material {
                if !material_ids.contains(&material) {
                    return fail(format!(
                        "furniture {} references unknown material {material}",
                        furniture.id
                    ));
                }
            }
            let validated = FurnitureInput::from_furniture(furniture)
                .validate(|id| material_ids.contains(&id))
                .map(|draft| draft.into_furniture(furniture.id, furniture.owner));
            match validated {
                Ok(record) if record == *furniture => {}
                Ok(_) => return fail(format!("furniture {}: untrimmed text", furniture.id)),
                Err(errors) => return fail(format!("furniture {}: {errors}", furniture.id)),
            }
        }

        let mut review_ids = BTreeSet::new();
        for review in &self.reviews {
            if !review_ids.insert(review.id) {
                return fail(format!("duplicate review id {}", review.id));
            }
            if !furniture_ids.contains(&review.furniture) {
                return fail(format!(
                    "review {} on unknown furniture {}",
                    review.id, review.furniture
                ));
            }
            if !user_ids.contains(&review.author) {
                return fail(format!(
                    "review {} by unknown user {}",
                    review.id, review.author
                ));
            }
            let input = ReviewInput {
                content: review.content.clone(),
                score: review.score.value().to_string(),
            };
            match input.validate() {
                Ok(draft) if draft.content == review.content => {}
                Ok(_) => return fail(format!("review {}: untrimmed content", review.id)),
                Err(errors) => return fail(format!("review {}: {errors}", review.id)),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::credentials::PasswordHash;
    use crate::model::{Price, Score};
    use crate::{FurnitureId, MaterialId, ReviewId, UserId};

    fn sample() -> CatalogSnapshot {
        CatalogSnapshot {
            version: SNAPSHOT_VERSION,
            users: vec![User {
                id: UserId(1),
                username: "alice".into(),
                password_hash: PasswordHash::derive("alice", "password1"),
                is_superuser: false,
            }],
            materials: vec![Material {
                id: MaterialId(1),
                name: "Walnut".into(),
            }],
            furniture: vec![Furniture {
                id: FurnitureId(1),
                owner: UserId(1),
                kind: "Desk".into(),
                model: "Alex".into(),
                description: String::new(),
                price: Price::from_cents(12000),
                image_url: None,
                material: Some(MaterialId(1)),
            }],
            reviews: vec![Review {
                id: ReviewId(1),
                furniture: FurnitureId(1),
                author: UserId(1),
                content: "Roomy drawers".into(),
                score: Score::new(5).unwrap(),
            }],
            next_ids: NextIds {
                user: 2,
                material: 2,
                furniture: 4,
                review: 2,
            },
        }
    }

    #[test]
    fn test_json_round_trip_checks_out() {
        let snapshot = sample();
        let parsed = CatalogSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_rejects_dangling_material() {
        let mut snapshot = sample();
        snapshot.materials.clear();
        assert!(matches!(snapshot.check(), Err(CatalogError::Snapshot(_))));
    }

    #[test]
    fn test_rejects_review_on_missing_furniture() {
        let mut snapshot = sample();
        snapshot.reviews[0].furniture = FurnitureId(7);
        assert!(snapshot.check().is_err());
    }

    #[test]
    fn test_rejects_duplicate_username() {
        let mut snapshot = sample();
        let mut twin = snapshot.users[0].clone();
        twin.id = UserId(2);
        snapshot.users.push(twin);
        assert!(snapshot.check().is_err());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut snapshot = sample();
        snapshot.version = 99;
        assert!(snapshot.check().is_err());
    }

    #[test]
    fn test_rejects_records_that_break_form_rules() {
        let mut empty_kind = sample();
        empty_kind.furniture[0].kind = String::new();
        assert!(empty_kind.check().is_err());

        let mut bad_username = sample();
        bad_username.users[0].username = "al ice".into();
        assert!(bad_username.check().is_err());

        let mut padded = sample();
        padded.reviews[0].content = "  Roomy drawers".into();
        assert!(padded.check().is_err());
    }

    #[test]
    fn test_rejects_material_names_differing_only_in_case() {
        let mut snapshot = sample();
        snapshot.materials.push(Material {
            id: MaterialId(2),
            name: "walnut".into(),
        });
        assert!(snapshot.check().is_err());
    }

    #[test]
    fn test_counters_default_when_absent() {
        let mut value: serde_json::Value =
            serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("next_ids");

        let parsed = CatalogSnapshot::from_json(&value.to_string()).unwrap();
        assert_eq!(parsed.next_ids, NextIds::default());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(CatalogSnapshot::from_json("{\"version\": 1}").is_err());
        assert!(CatalogSnapshot::from_json("not json").is_err());
    }
}
