//! Request handlers.
//!
//! Handlers only extract, call one [`Catalog`](furnish_core::Catalog)
//! operation, and render. Invalid form submissions re-render the form with
//! status 422 instead of failing the request.

use super::AppState;
use super::auth::{CurrentUser, OptionalUser};
use super::error::AppError;
use super::pages;
use axum::Json;
use axum::extract::{Form, FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Redirect, Response};
use furnish_core::{CatalogError, FurnitureId, FurnitureInput, MaterialInput, ReviewInput};
use serde::Serialize;

/// Where create/edit/delete send the browser afterwards.
const LIST_URL: &str = "/furniture/";

fn unprocessable(html: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
}

/// The `{id}` segment of a furniture URL.
///
/// Only plain decimal numbers that fit in a `u64` are ids; anything else
/// is a 404 page, same as an id nobody has.
#[derive(Debug, Clone, Copy)]
pub struct ItemId(pub FurnitureId);

impl ItemId {
    fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok().map(|id| Self(FurnitureId(id)))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ItemId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let missing = || {
            AppError::Catalog(CatalogError::NotFound {
                entity: "furniture",
                id: 0,
            })
        };
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| missing())?;
        Self::parse(&raw).ok_or_else(missing)
    }
}

// =============================================================================
// MISC
// =============================================================================

pub async fn index() -> Redirect {
    Redirect::to(LIST_URL)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn not_found() -> Response {
    AppError::Catalog(CatalogError::NotFound {
        entity: "page",
        id: 0,
    })
    .into_response()
}

// =============================================================================
// LISTINGS
// =============================================================================

/// Every item. Public.
pub async fn furniture_list(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Result<Html<String>, AppError> {
    let items = state.catalog.read().await.list_furniture()?;
    Ok(Html(pages::furniture_list(user.as_ref(), "Furniture", &items)))
}

/// The current user's items.
pub async fn user_furniture_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let items = state.catalog.read().await.list_user_furniture(&user)?;
    Ok(Html(pages::furniture_list(Some(&user), "My furniture", &items)))
}

// =============================================================================
// DETAIL + REVIEWS
// =============================================================================

pub async fn furniture_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ItemId(id): ItemId,
) -> Result<Html<String>, AppError> {
    let detail = state
        .catalog
        .read()
        .await
        .furniture_detail(&user, id)?;
    Ok(Html(pages::furniture_detail(
        &user,
        &detail,
        &ReviewInput::default(),
        None,
    )))
}

pub async fn post_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ItemId(id): ItemId,
    Form(input): Form<ReviewInput>,
) -> Result<Response, AppError> {
    let mut catalog = state.catalog.write().await;
    match catalog.add_review(&user, id, &input) {
        Ok(_) => Ok(Redirect::to(&format!("/furniture/details/{id}/")).into_response()),
        Err(CatalogError::Invalid(errors)) => {
            let detail = catalog.furniture_detail(&user, id)?;
            Ok(unprocessable(pages::furniture_detail(
                &user,
                &detail,
                &input,
                Some(&errors),
            )))
        }
        Err(err) => Err(err.into()),
    }
}

// =============================================================================
// CREATE / EDIT / DELETE
// =============================================================================

pub async fn create_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let materials = state.catalog.read().await.materials()?;
    Ok(Html(pages::furniture_form(
        &user,
        "Add furniture",
        "/furniture/create/",
        &FurnitureInput::default(),
        &materials,
        None,
    )))
}

pub async fn create_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(input): Form<FurnitureInput>,
) -> Result<Response, AppError> {
    let mut catalog = state.catalog.write().await;
    match catalog.create_furniture(&user, &input) {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(CatalogError::Invalid(errors)) => Ok(unprocessable(pages::furniture_form(
            &user,
            "Add furniture",
            "/furniture/create/",
            &input,
            &catalog.materials()?,
            Some(&errors),
        ))),
        Err(err) => Err(err.into()),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ItemId(id): ItemId,
) -> Result<Html<String>, AppError> {
    let catalog = state.catalog.read().await;
    let furniture = catalog.edit_form(&user, id)?;
    Ok(Html(pages::furniture_form(
        &user,
        "Edit furniture",
        &format!("/furniture/edit/{id}/"),
        &FurnitureInput::from_furniture(&furniture),
        &catalog.materials()?,
        None,
    )))
}

pub async fn edit_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ItemId(id): ItemId,
    Form(input): Form<FurnitureInput>,
) -> Result<Response, AppError> {
    let mut catalog = state.catalog.write().await;
    match catalog.edit_furniture(&user, id, &input) {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(CatalogError::Invalid(errors)) => Ok(unprocessable(pages::furniture_form(
            &user,
            "Edit furniture",
            &format!("/furniture/edit/{id}/"),
            &input,
            &catalog.materials()?,
            Some(&errors),
        ))),
        Err(err) => Err(err.into()),
    }
}

pub async fn delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ItemId(id): ItemId,
) -> Result<Html<String>, AppError> {
    let furniture = state
        .catalog
        .read()
        .await
        .delete_form(&user, id)?;
    Ok(Html(pages::furniture_delete(&user, &furniture)))
}

pub async fn delete_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ItemId(id): ItemId,
) -> Result<Redirect, AppError> {
    state
        .catalog
        .write()
        .await
        .delete_furniture(&user, id)?;
    Ok(Redirect::to(LIST_URL))
}

// =============================================================================
// MATERIALS
// =============================================================================

pub async fn material_form(CurrentUser(user): CurrentUser) -> Html<String> {
    Html(pages::material_form(&user, &MaterialInput::default(), None))
}

pub async fn material_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(input): Form<MaterialInput>,
) -> Result<Response, AppError> {
    match state.catalog.write().await.create_material(&input) {
        Ok(_) => Ok(Redirect::to(LIST_URL).into_response()),
        Err(CatalogError::Invalid(errors)) => Ok(unprocessable(pages::material_form(
            &user,
            &input,
            Some(&errors),
        ))),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_accepts_only_plain_decimal() {
        assert_eq!(ItemId::parse("42").map(|id| id.0), Some(FurnitureId(42)));
        assert_eq!(ItemId::parse("007").map(|id| id.0), Some(FurnitureId(7)));
        for raw in ["", "abc", "-1", "+1", "1.5", " 1", "99999999999999999999"] {
            assert!(ItemId::parse(raw).is_none(), "{raw:?}");
        }
    }
}
