//! # Forms
//!
//! Raw, all-string inputs as they arrive from an HTML form, and their
//! validation into typed drafts.
//!
//! Validation collects every problem at once into [`FormErrors`] so a
//! re-rendered form can show each message next to its field. Surrounding
//! whitespace is trimmed before any check.

use crate::credentials::{MAX_PASSWORD_LEN, MIN_PASSWORD_LEN};
use crate::model::{Furniture, Price, Score};
use crate::{FurnitureId, MaterialId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum length of furniture kind and model.
pub const MAX_NAME_LEN: usize = 50;
/// Maximum length of a furniture description.
pub const MAX_DESCRIPTION_LEN: usize = 2000;
/// Maximum length of an image URL.
pub const MAX_URL_LEN: usize = 500;
/// Maximum length of review content.
pub const MAX_REVIEW_LEN: usize = 1000;
/// Maximum length of a username.
pub const MAX_USERNAME_LEN: usize = 150;

// =============================================================================
// FORM ERRORS
// =============================================================================

/// Validation messages keyed by field name.
///
/// Fields iterate in name order; messages keep the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record a message that belongs to the form as a whole.
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    /// Build an error set with a single field message.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// Messages for one field (empty when the field is valid).
    #[must_use]
    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    /// All field messages in field-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = self.non_field.clone();
        for (field, messages) in &self.fields {
            parts.extend(messages.iter().map(|message| format!("{field}: {message}")));
        }
        f.write_str(&parts.join("; "))
    }
}

// =============================================================================
// FIELD HELPERS
// =============================================================================

fn required_text(errors: &mut FormErrors, field: &str, raw: &str, max: usize) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, "This field is required.");
    } else {
        check_max_len(errors, field, value, max);
    }
    value.to_string()
}

fn check_max_len(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

// =============================================================================
// FURNITURE
// =============================================================================

/// Furniture form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FurnitureInput {
    pub kind: String,
    pub model: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    /// Material id, or empty for none.
    pub material: String,
}

/// A validated furniture form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FurnitureDraft {
    pub kind: String,
    pub model: String,
    pub description: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub material: Option<MaterialId>,
}

impl FurnitureInput {
    /// Initial values for editing an existing item.
    #[must_use]
    pub fn from_furniture(furniture: &Furniture) -> Self {
        Self {
            kind: furniture.kind.clone(),
            model: furniture.model.clone(),
            description: furniture.description.clone(),
            price: furniture.price.to_string(),
            image_url: furniture.image_url.clone().unwrap_or_default(),
            material: furniture
                .material
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate against the set of materials that currently exist.
    pub fn validate(
        &self,
        material_exists: impl Fn(MaterialId) -> bool,
    ) -> Result<FurnitureDraft, FormErrors> {
        let mut errors = FormErrors::new();

        let kind = required_text(&mut errors, "kind", &self.kind, MAX_NAME_LEN);
        let model = required_text(&mut errors, "model", &self.model, MAX_NAME_LEN);

        let description = self.description.trim().to_string();
        check_max_len(&mut errors, "description", &description, MAX_DESCRIPTION_LEN);

        let price = Price::parse(&self.price).unwrap_or_else(|message| {
            errors.add("price", message);
            Price::from_cents(0)
        });

        let image_url = match self.image_url.trim() {
            "" => None,
            url => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    errors.add("image_url", "Enter a valid URL.");
                }
                check_max_len(&mut errors, "image_url", url, MAX_URL_LEN);
                Some(url.to_string())
            }
        };

        let material = match self.material.trim() {
            "" => None,
            raw => match raw.parse::<u64>().map(MaterialId) {
                Ok(id) if material_exists(id) => Some(id),
                _ => {
                    errors.add(
                        "material",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
        };

        errors.finish(FurnitureDraft {
            kind,
            model,
            description,
            price,
            image_url,
            material,
        })
    }
}

impl FurnitureDraft {
    /// Turn the draft into a record with the given identity and owner.
    #[must_use]
    pub fn into_furniture(self, id: FurnitureId, owner: UserId) -> Furniture {
        Furniture {
            id,
            owner,
            kind: self.kind,
            model: self.model,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
            material: self.material,
        }
    }
}

// =============================================================================
// REVIEW
// =============================================================================

/// Review form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewInput {
    pub content: String,
    pub score: String,
}

/// A validated review form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub content: String,
    pub score: Score,
}

impl ReviewInput {
    pub fn validate(&self) -> Result<ReviewDraft, FormErrors> {
        let mut errors = FormErrors::new();
        let content = required_text(&mut errors, "content", &self.content, MAX_REVIEW_LEN);

        let score = self.score.trim().parse::<u8>().ok().and_then(Score::new);
        let Some(score) = score else {
            errors.add(
                "score",
                format!("Enter a whole number from {} to {}.", Score::MIN, Score::MAX),
            );
            return Err(errors);
        };

        errors.finish(ReviewDraft { content, score })
    }
}

// =============================================================================
// MATERIAL
// =============================================================================

/// Material form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialInput {
    pub name: String,
}

impl MaterialInput {
    /// Validate and return the trimmed name.
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let name = required_text(&mut errors, "name", &self.name, MAX_NAME_LEN);
        errors.finish(name)
    }
}

// =============================================================================
// USER
// =============================================================================

/// Registration input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInput {
    pub username: String,
    pub password: String,
}

/// A validated registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub username: String,
    pub password: String,
}

fn username_field(errors: &mut FormErrors, raw: &str) -> String {
    let username = required_text(errors, "username", raw, MAX_USERNAME_LEN);
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
    username
}

/// Check a username on its own, returning it trimmed.
pub fn validate_username(raw: &str) -> Result<String, FormErrors> {
    let mut errors = FormErrors::new();
    let username = username_field(&mut errors, raw);
    errors.finish(username)
}

impl UserInput {
    pub fn validate(&self) -> Result<UserDraft, FormErrors> {
        let mut errors = FormErrors::new();
        let username = username_field(&mut errors, &self.username);

        // Passwords are taken verbatim, never trimmed.
        let len = self.password.chars().count();
        if len < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."),
            );
        } else if len > MAX_PASSWORD_LEN {
            errors.add(
                "password",
                format!("This password is too long. It may contain at most {MAX_PASSWORD_LEN} characters."),
            );
        }

        errors.finish(UserDraft {
            username,
            password: self.password.clone(),
        })
    }
}
