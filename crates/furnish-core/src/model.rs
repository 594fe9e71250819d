//! # Model
//!
//! Catalog records and their value types.
//!
//! Prices are whole cents. There is no floating point anywhere in the
//! catalog, so a price always renders back exactly as it was entered.

use crate::credentials::PasswordHash;
use crate::{FurnitureId, MaterialId, ReviewId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// PRICE
// =============================================================================

/// A price in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Create a price from a number of cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The price in cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Parse a decimal amount such as `12`, `12.5` or `12.50`.
    ///
    /// At most two fraction digits are accepted. Signs, exponents and
    /// thousands separators are rejected.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("Enter a price.".to_string());
        }

        let (whole, fraction) = match raw.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (raw, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err("Enter a valid amount, like 149 or 149.99.".to_string());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err("Enter a valid amount, like 149 or 149.99.".to_string());
        }
        if fraction.len() > 2 {
            return Err("Use at most two digits after the decimal point.".to_string());
        }
        if raw.ends_with('.') {
            return Err("Enter a valid amount, like 149 or 149.99.".to_string());
        }

        let too_large = || "Price is too large.".to_string();
        let whole: u64 = whole.parse().map_err(|_| too_large())?;
        let fraction_cents = match fraction.len() {
            0 => 0,
            1 => u64::from(fraction.as_bytes()[0] - b'0') * 10,
            _ => {
                u64::from(fraction.as_bytes()[0] - b'0') * 10
                    + u64::from(fraction.as_bytes()[1] - b'0')
            }
        };

        whole
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction_cents))
            .map(Self)
            .ok_or_else(too_large)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// SCORE
// =============================================================================

/// A review score from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    /// Lowest allowed score.
    pub const MIN: u8 = 1;
    /// Highest allowed score.
    pub const MAX: u8 = 5;

    /// Create a score, returning `None` outside `1..=5`.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("score {value} out of range 1..=5"))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// A registered user.
///
/// Each user doubles as the public profile that owns furniture and
/// authors reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: PasswordHash,
    pub is_superuser: bool,
}

/// A material furniture can be made of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
}

/// A furniture item listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Furniture {
    pub id: FurnitureId,
    /// The user who listed the item.
    pub owner: UserId,
    /// What kind of furniture this is ("Chair", "Wardrobe").
    pub kind: String,
    pub model: String,
    pub description: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub material: Option<MaterialId>,
}

/// A review left on a furniture item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub furniture: FurnitureId,
    pub author: UserId,
    pub content: String,
    pub score: Score,
}
