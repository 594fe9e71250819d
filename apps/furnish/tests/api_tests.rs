//! Integration tests for the Furnish HTTP server.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use furnish::api::{AppState, create_router};
use furnish_core::{Catalog, FurnitureId, UserInput};
use tower::ServiceExt;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Response {
    fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

/// A catalog with alice and bob (regular users) and admin (superuser).
fn seeded_state() -> AppState {
    let mut catalog = Catalog::in_memory();
    for (name, superuser) in [("alice", false), ("bob", false), ("admin", true)] {
        let input = UserInput {
            username: name.to_string(),
            password: format!("{name}-password"),
        };
        catalog.register_user(&input, superuser).unwrap();
    }
    AppState::new(catalog)
}

fn app() -> (Router, AppState) {
    let state = seeded_state();
    (create_router(state.clone()), state)
}

fn basic(name: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{name}:{name}-password")))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body: bytes::Bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    Response {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

async fn get(app: &Router, uri: &str, user: Option<&str>) -> Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(name) = user {
        builder = builder.header(header::AUTHORIZATION, basic(name));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, user: Option<&str>, form: &str) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(name) = user {
        builder = builder.header(header::AUTHORIZATION, basic(name));
    }
    send(app, builder.body(Body::from(form.to_string())).unwrap()).await
}

const CHAIR_FORM: &str =
    "kind=Chair&model=Poang&description=Bentwood&price=79.90&image_url=&material=";

/// Create a chair as `owner` and return its id.
async fn create_chair(app: &Router, owner: &str) -> FurnitureId {
    let response = post(app, "/furniture/create/", Some(owner), CHAIR_FORM).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let listing = get(app, "/furniture/mine/", Some(owner)).await;
    let start = listing.body.rfind("/furniture/details/").unwrap() + "/furniture/details/".len();
    let end = start + listing.body[start..].find('/').unwrap();
    FurnitureId(listing.body[start..end].parse().unwrap())
}

// =============================================================================
// PUBLIC PAGES
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let response = get(&app, "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_root_redirects_to_listing() {
    let (app, _) = app();
    let response = get(&app, "/", None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/furniture/");
}

#[tokio::test]
async fn test_listing_is_public() {
    let (app, _) = app();
    create_chair(&app, "alice").await;

    let response = get(&app, "/furniture/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Chair Poang"));
    assert!(response.body.contains("79.90"));
    assert!(response.body.contains("by alice"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _) = app();
    let response = get(&app, "/nowhere", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[tokio::test]
async fn test_login_required_pages_challenge() {
    let (app, _) = app();
    for uri in ["/furniture/mine/", "/furniture/create/", "/furniture/details/1/"] {
        let response = get(&app, uri, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(response.headers.contains_key(header::WWW_AUTHENTICATE));
    }
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let (app, _) = app();
    let request = Request::builder()
        .uri("/furniture/mine/")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("alice:nope-nope")),
        )
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// CREATE / LIST OWN
// =============================================================================

#[tokio::test]
async fn test_create_assigns_owner_and_lists_under_mine() {
    let (app, state) = app();
    let id = create_chair(&app, "bob").await;

    let catalog = state.catalog.read().await;
    let furniture = catalog.store().get_furniture(id).unwrap().unwrap();
    let bob = catalog.store().user_by_name("bob").unwrap().unwrap();
    assert_eq!(furniture.owner, bob.id);
    drop(catalog);

    let alice_list = get(&app, "/furniture/mine/", Some("alice")).await;
    assert!(alice_list.body.contains("No furniture yet."));
}

#[tokio::test]
async fn test_invalid_create_rerenders_form() {
    let (app, state) = app();
    let response = post(
        &app,
        "/furniture/create/",
        Some("alice"),
        "kind=&model=X&price=abc&image_url=&material=",
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("This field is required."));
    assert!(response.body.contains("value=\"abc\""));
    assert_eq!(state.catalog.read().await.status().unwrap().furniture, 0);
}

#[tokio::test]
async fn test_user_content_is_escaped() {
    let (app, _) = app();
    let form = "kind=%3Cscript%3E&model=x&price=1&image_url=&material=";
    let response = post(&app, "/furniture/create/", Some("alice"), form).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let listing = get(&app, "/furniture/", None).await;
    assert!(listing.body.contains("&lt;script&gt;"));
    assert!(!listing.body.contains("<script>"));
}

// =============================================================================
// DETAIL + REVIEWS
// =============================================================================

#[tokio::test]
async fn test_detail_shows_modify_links_only_to_allowed_users() {
    let (app, _) = app();
    let id = create_chair(&app, "alice").await;
    let uri = format!("/furniture/details/{id}/");
    let edit_link = format!("/furniture/edit/{id}/");

    assert!(get(&app, &uri, Some("alice")).await.body.contains(&edit_link));
    assert!(!get(&app, &uri, Some("bob")).await.body.contains(&edit_link));
    assert!(get(&app, &uri, Some("admin")).await.body.contains(&edit_link));
}

#[tokio::test]
async fn test_detail_of_missing_item_is_404() {
    let (app, _) = app();
    let response = get(&app, "/furniture/details/99/", Some("alice")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_post_redirects_and_shows() {
    let (app, _) = app();
    let id = create_chair(&app, "alice").await;
    let uri = format!("/furniture/details/{id}/");

    let response = post(&app, &uri, Some("bob"), "content=Very+comfy&score=5").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), uri);

    let detail = get(&app, &uri, Some("alice")).await;
    assert!(detail.body.contains("Very comfy"));
    assert!(detail.body.contains("<strong>bob</strong>"));
}

#[tokio::test]
async fn test_invalid_review_is_422_and_not_stored() {
    let (app, state) = app();
    let id = create_chair(&app, "alice").await;
    let uri = format!("/furniture/details/{id}/");

    let response = post(&app, &uri, Some("bob"), "content=&score=9").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("errorlist"));
    assert_eq!(state.catalog.read().await.status().unwrap().reviews, 0);
}

// =============================================================================
// EDIT / DELETE PERMISSIONS
// =============================================================================

#[tokio::test]
async fn test_stranger_gets_permission_denied() {
    let (app, state) = app();
    let id = create_chair(&app, "alice").await;
    let before = state.catalog.read().await.store().get_furniture(id).unwrap();

    let edit_uri = format!("/furniture/edit/{id}/");
    let delete_uri = format!("/furniture/delete/{id}/");
    let hijack = "kind=Chair&model=Mine+now&price=1&image_url=&material=";

    assert_eq!(get(&app, &edit_uri, Some("bob")).await.status, StatusCode::FORBIDDEN);
    assert_eq!(
        post(&app, &edit_uri, Some("bob"), hijack).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(get(&app, &delete_uri, Some("bob")).await.status, StatusCode::FORBIDDEN);
    let denied = post(&app, &delete_uri, Some("bob"), "").await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert!(denied.body.contains("Permission denied"));

    let after = state.catalog.read().await.store().get_furniture(id).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_owner_edit_form_is_prefilled() {
    let (app, _) = app();
    let id = create_chair(&app, "alice").await;
    let response = get(&app, &format!("/furniture/edit/{id}/"), Some("alice")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("value=\"Poang\""));
    assert!(response.body.contains("value=\"79.90\""));
}

#[tokio::test]
async fn test_superuser_edit_keeps_owner() {
    let (app, state) = app();
    let id = create_chair(&app, "alice").await;

    let form = "kind=Chair&model=Poang+II&price=89&image_url=&material=";
    let response = post(&app, &format!("/furniture/edit/{id}/"), Some("admin"), form).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/furniture/");

    let catalog = state.catalog.read().await;
    let furniture = catalog.store().get_furniture(id).unwrap().unwrap();
    let alice = catalog.store().user_by_name("alice").unwrap().unwrap();
    assert_eq!(furniture.model, "Poang II");
    assert_eq!(furniture.owner, alice.id);
}

#[tokio::test]
async fn test_owner_delete_removes_item_and_reviews() {
    let (app, state) = app();
    let id = create_chair(&app, "alice").await;
    let detail_uri = format!("/furniture/details/{id}/");
    post(&app, &detail_uri, Some("bob"), "content=Wobbly&score=2").await;

    let confirm = get(&app, &format!("/furniture/delete/{id}/"), Some("alice")).await;
    assert_eq!(confirm.status, StatusCode::OK);
    assert!(confirm.body.contains("Are you sure"));

    let response = post(&app, &format!("/furniture/delete/{id}/"), Some("alice"), "").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let counts = state.catalog.read().await.status().unwrap();
    assert_eq!(counts.furniture, 0);
    assert_eq!(counts.reviews, 0);
    assert_eq!(
        get(&app, &detail_uri, Some("alice")).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_malformed_id_is_not_found_page() {
    let (app, _) = app();
    for uri in [
        "/furniture/edit/abc/",
        "/furniture/details/99999999999999999999/",
        "/furniture/delete/-1/",
    ] {
        let response = get(&app, uri, Some("alice")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
        assert!(response.body.contains("Not found"), "{uri}");
    }
}

#[tokio::test]
async fn test_status_pages_show_signed_in_user() {
    let (app, _) = app();
    let id = create_chair(&app, "alice").await;

    let denied = get(&app, &format!("/furniture/edit/{id}/"), Some("bob")).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert!(denied.body.contains("Signed in as bob"));

    let missing = get(&app, "/furniture/details/404/", Some("bob")).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.body.contains("Signed in as bob"));

    let anonymous = get(&app, "/nowhere", None).await;
    assert!(anonymous.body.contains("Sign in"));
}

#[tokio::test]
async fn test_superuser_delete_removes_someone_elses_item() {
    let (app, state) = app();
    let id = create_chair(&app, "alice").await;
    post(&app, &format!("/furniture/details/{id}/"), Some("bob"), "content=Solid&score=4").await;

    let confirm = get(&app, &format!("/furniture/delete/{id}/"), Some("admin")).await;
    assert_eq!(confirm.status, StatusCode::OK);

    let response = post(&app, &format!("/furniture/delete/{id}/"), Some("admin"), "").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/furniture/");

    let counts = state.catalog.read().await.status().unwrap();
    assert_eq!(counts.furniture, 0);
    assert_eq!(counts.reviews, 0);
}

#[tokio::test]
async fn test_review_on_missing_item_is_404() {
    let (app, state) = app();
    let response = post(
        &app,
        "/furniture/details/77/",
        Some("bob"),
        "content=Ghost&score=3",
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(state.catalog.read().await.status().unwrap().reviews, 0);
}

// =============================================================================
// MATERIALS
// =============================================================================

#[tokio::test]
async fn test_material_create_and_use() {
    let (app, _) = app();
    let response = post(&app, "/furniture/material/create/", Some("alice"), "name=Teak").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let form = get(&app, "/furniture/create/", Some("alice")).await;
    assert!(form.body.contains(">Teak</option>"));

    let duplicate = post(&app, "/furniture/material/create/", Some("bob"), "name=teak").await;
    assert_eq!(duplicate.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(duplicate.body.contains("already exists"));
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let app = create_router(seeded_state().with_rate_limit(1));
    assert_eq!(get(&app, "/health", None).await.status, StatusCode::OK);
    assert_eq!(
        get(&app, "/health", None).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
}
