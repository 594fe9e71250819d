//! # Furnish Core
//!
//! The catalog engine behind the Furnish furniture catalog.
//!
//! Everything a request can do lives here as a plain, synchronous method on
//! [`Catalog`]: listing furniture, showing an item with its reviews,
//! creating, editing and deleting items, leaving reviews, and registering
//! materials and users. The app crate only parses HTTP, renders HTML and
//! maps [`CatalogError`] to status codes.
//!
//! ## Layout
//!
//! | Module        | Responsibility                                        |
//! |---------------|-------------------------------------------------------|
//! | `model`       | Records plus the `Price` and `Score` value types      |
//! | `form`        | Raw string inputs, validation, `FormErrors`           |
//! | `access`      | Who may modify or delete an item                      |
//! | `credentials` | Password digests and verification                     |
//! | `storage`     | `CatalogStore` trait, memory and redb backends        |
//! | `catalog`     | The request operations                                |
//! | `snapshot`    | JSON export/import of a whole catalog                 |

pub mod access;
pub mod catalog;
pub mod credentials;
pub mod error;
pub mod form;
pub mod model;
pub mod snapshot;
pub mod storage;

pub use access::has_access_to_modify;
pub use catalog::{Catalog, FurnitureDetail, FurnitureSummary, ReviewView};
pub use credentials::PasswordHash;
pub use error::{CatalogError, Result};
pub use form::{FormErrors, FurnitureInput, MaterialInput, ReviewInput, UserInput};
pub use model::{Furniture, Material, Price, Review, Score, User};
pub use snapshot::{CatalogSnapshot, SNAPSHOT_VERSION};
pub use storage::{CatalogStore, MemoryCatalog, NextIds, RedbCatalog, StoreCounts};

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifies a registered user.
    UserId
);
id_type!(
    /// Identifies a material (oak, steel, ...).
    MaterialId
);
id_type!(
    /// Identifies a furniture item.
    FurnitureId
);
id_type!(
    /// Identifies a review.
    ReviewId
);
