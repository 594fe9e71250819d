//! HTTP Basic authentication against catalog users.
//!
//! [`CurrentUser`] guards login-required pages and rejects with 401.
//! [`OptionalUser`] is for public pages: it recognises a valid login and
//! otherwise carries on anonymously.

use super::AppState;
use super::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use furnish_core::User;

/// Decode `Authorization: Basic <base64(user:password)>`.
///
/// Returns `None` for a missing header or anything malformed.
pub fn basic_credentials(parts: &Parts) -> Option<(String, String)> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

async fn login(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some((username, password)) = basic_credentials(parts) else {
        return Ok(None);
    };
    match state.catalog.read().await.authenticate(&username, &password) {
        Ok(user) => Ok(Some(user)),
        Err(furnish_core::CatalogError::InvalidCredentials) => {
            tracing::warn!(%username, "failed login");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// The logged-in user. Rejects with 401 when there is none.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        login(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// The logged-in user, if any.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<User>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(login(parts, state).await?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_decodes_basic_credentials() {
        let header = format!("Basic {}", STANDARD.encode("alice:open sesame:1"));
        let parts = parts_with(Some(&header));
        assert_eq!(
            basic_credentials(&parts),
            Some(("alice".to_string(), "open sesame:1".to_string()))
        );
    }

    #[test]
    fn test_rejects_other_schemes_and_garbage() {
        assert_eq!(basic_credentials(&parts_with(None)), None);
        assert_eq!(basic_credentials(&parts_with(Some("Bearer abc"))), None);
        assert_eq!(basic_credentials(&parts_with(Some("Basic !!!"))), None);
        let no_colon = format!("Basic {}", STANDARD.encode("alice"));
        assert_eq!(basic_credentials(&parts_with(Some(&no_colon))), None);
    }
}
