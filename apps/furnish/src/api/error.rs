//! Mapping of failures to HTTP responses.

use super::pages;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use furnish_core::{CatalogError, User};

/// Realm announced in `WWW-Authenticate`.
pub const AUTH_REALM: &str = "Basic realm=\"furnish\", charset=\"UTF-8\"";

/// Errors a handler can return.
#[derive(Debug)]
pub enum AppError {
    /// A catalog operation failed.
    Catalog(CatalogError),
    /// The page needs a logged-in user and none (or a wrong one) was given.
    Unauthorized,
    /// The global request budget is spent.
    RateLimited,
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

fn page(status: StatusCode, body: String) -> Response {
    (status, Html(body)).into_response()
}

fn server_error() -> Response {
    page(
        StatusCode::INTERNAL_SERVER_ERROR,
        pages::error_page("Server error", "Something went wrong on our side."),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => {
                let mut response = page(StatusCode::UNAUTHORIZED, pages::login_required());
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(AUTH_REALM),
                );
                response
            }
            Self::RateLimited => page(
                StatusCode::TOO_MANY_REQUESTS,
                pages::error_page("Slow down", "Too many requests. Try again in a moment."),
            ),
            Self::Catalog(err) if err.is_internal() => {
                tracing::error!(error = %err, "request failed");
                server_error()
            }
            Self::Catalog(err) => match err {
                CatalogError::NotFound { .. } => StatusPage::NotFound.response(None),
                CatalogError::Forbidden => StatusPage::Forbidden.response(None),
                CatalogError::Invalid(errors) => page(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    pages::error_page("Invalid input", &errors.to_string()),
                ),
                CatalogError::Duplicate(what) => page(
                    StatusCode::CONFLICT,
                    pages::error_page("Already exists", &what),
                ),
                CatalogError::InvalidCredentials => AppError::Unauthorized.into_response(),
                CatalogError::Snapshot(message) => page(
                    StatusCode::BAD_REQUEST,
                    pages::error_page("Bad snapshot", &message),
                ),
                CatalogError::Storage(_) | CatalogError::Encoding(_) => server_error(),
            },
        }
    }
}

/// Status pages whose navigation depends on who is asking.
///
/// Their responses carry this marker as an extension so the router can
/// re-render them for a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPage {
    NotFound,
    Forbidden,
}

impl StatusPage {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    pub fn render(self, user: Option<&User>) -> String {
        match self {
            Self::NotFound => pages::not_found(user),
            Self::Forbidden => pages::permission_denied(user),
        }
    }

    pub fn response(self, user: Option<&User>) -> Response {
        let mut response = page(self.status(), self.render(user));
        response.extensions_mut().insert(self);
        response
    }
}
