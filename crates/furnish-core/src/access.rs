//! Modify/delete permission for furniture items.

use crate::model::{Furniture, User};

/// Whether `user` may edit or delete `furniture`.
///
/// Superusers may modify anything; everyone else only what they own.
#[must_use]
pub fn has_access_to_modify(user: &User, furniture: &Furniture) -> bool {
    user.is_superuser || user.id == furniture.owner
}
