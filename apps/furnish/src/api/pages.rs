//! Server-rendered HTML pages.
//!
//! Every value that came from a user passes through [`escape`] before it
//! reaches the markup.

use furnish_core::form::FormErrors;
use furnish_core::{
    Furniture, FurnitureDetail, FurnitureInput, FurnitureSummary, Material, MaterialInput,
    ReviewInput, Score, User,
};
use std::fmt::Write as _;

/// Escape text for use in element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, user: Option<&User>, body: &str) -> String {
    let account = match user {
        Some(user) => format!(
            "<span class=\"account\">Signed in as {}</span> <a href=\"/furniture/mine/\">My furniture</a> <a href=\"/furniture/create/\">Add furniture</a>",
            escape(&user.username)
        ),
        None => "<a href=\"/furniture/mine/\">Sign in</a>".to_string(),
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title} | Furnish</title>\n</head>\n<body>\n<nav><a href=\"/furniture/\">Furniture</a> {account}</nav>\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn field_errors(errors: Option<&FormErrors>, field: &str) -> String {
    let Some(errors) = errors else {
        return String::new();
    };
    let messages = errors.field(field);
    if messages.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul class=\"errorlist\">");
    for message in messages {
        let _ = write!(out, "<li>{}</li>", escape(message));
    }
    out.push_str("</ul>");
    out
}

fn non_field_errors(errors: Option<&FormErrors>) -> String {
    match errors {
        Some(errors) if !errors.non_field().is_empty() => {
            let mut out = String::from("<ul class=\"errorlist nonfield\">");
            for message in errors.non_field() {
                let _ = write!(out, "<li>{}</li>", escape(message));
            }
            out.push_str("</ul>");
            out
        }
        _ => String::new(),
    }
}

fn text_field(label: &str, name: &str, value: &str, errors: Option<&FormErrors>) -> String {
    format!(
        "<p><label for=\"id_{name}\">{label}</label>{errors}<input type=\"text\" id=\"id_{name}\" name=\"{name}\" value=\"{value}\"></p>\n",
        errors = field_errors(errors, name),
        value = escape(value),
    )
}

// =============================================================================
// FURNITURE PAGES
// =============================================================================

/// The catalog listing (all items, or one user's items).
pub fn furniture_list(user: Option<&User>, title: &str, items: &[FurnitureSummary]) -> String {
    let mut body = String::new();
    if items.is_empty() {
        body.push_str("<p class=\"empty\">No furniture yet.</p>");
    } else {
        body.push_str("<ul class=\"furniture\">\n");
        for item in items {
            let furniture = &item.furniture;
            let material = item
                .material
                .as_deref()
                .map(|name| format!(" ({})", escape(name)))
                .unwrap_or_default();
            let _ = writeln!(
                body,
                "<li><a href=\"/furniture/details/{id}/\">{kind} {model}</a>{material} <span class=\"price\">{price}</span> by {owner}</li>",
                id = furniture.id,
                kind = escape(&furniture.kind),
                model = escape(&furniture.model),
                price = furniture.price,
                owner = escape(&item.owner),
            );
        }
        body.push_str("</ul>");
    }
    layout(title, user, &body)
}

/// One item with its reviews and the review form.
pub fn furniture_detail(
    user: &User,
    detail: &FurnitureDetail,
    review: &ReviewInput,
    errors: Option<&FormErrors>,
) -> String {
    let furniture = &detail.furniture;
    let mut body = String::new();

    if let Some(url) = &furniture.image_url {
        let _ = writeln!(
            body,
            "<img src=\"{}\" alt=\"{}\">",
            escape(url),
            escape(&furniture.model)
        );
    }
    let _ = writeln!(
        body,
        "<dl>\n<dt>Model</dt><dd>{model}</dd>\n<dt>Price</dt><dd class=\"price\">{price}</dd>\n<dt>Material</dt><dd>{material}</dd>\n<dt>Listed by</dt><dd>{owner}</dd>\n</dl>",
        model = escape(&furniture.model),
        price = furniture.price,
        material = detail
            .material
            .as_deref()
            .map(escape)
            .unwrap_or_else(|| "-".to_string()),
        owner = escape(&detail.owner),
    );
    if !furniture.description.is_empty() {
        let _ = writeln!(body, "<p class=\"description\">{}</p>", escape(&furniture.description));
    }

    if detail.can_modify {
        let _ = writeln!(
            body,
            "<p class=\"actions\"><a href=\"/furniture/edit/{id}/\">Edit</a> <a href=\"/furniture/delete/{id}/\">Delete</a></p>",
            id = furniture.id
        );
    }

    body.push_str("<h2>Reviews</h2>\n");
    if detail.reviews.is_empty() {
        body.push_str("<p class=\"empty\">No reviews yet.</p>\n");
    } else {
        body.push_str("<ul class=\"reviews\">\n");
        for view in &detail.reviews {
            let _ = writeln!(
                body,
                "<li><strong>{author}</strong> <span class=\"score\">{score}</span><p>{content}</p></li>",
                author = escape(&view.author),
                score = view.review.score,
                content = escape(&view.review.content),
            );
        }
        body.push_str("</ul>\n");
    }

    let mut options = String::new();
    for value in Score::MIN..=Score::MAX {
        let selected = if review.score.trim() == value.to_string() {
            " selected"
        } else {
            ""
        };
        let _ = write!(options, "<option value=\"{value}\"{selected}>{value}</option>");
    }
    let _ = write!(
        body,
        "<h2>Leave a review</h2>\n<form method=\"post\" action=\"/furniture/details/{id}/\">\n{non_field}<p><label for=\"id_content\">Review</label>{content_errors}<textarea id=\"id_content\" name=\"content\">{content}</textarea></p>\n<p><label for=\"id_score\">Score</label>{score_errors}<select id=\"id_score\" name=\"score\">{options}</select></p>\n<button type=\"submit\">Post review</button>\n</form>",
        id = furniture.id,
        non_field = non_field_errors(errors),
        content_errors = field_errors(errors, "content"),
        content = escape(&review.content),
        score_errors = field_errors(errors, "score"),
    );

    let title = format!("{} {}", furniture.kind, furniture.model);
    layout(&title, Some(user), &body)
}

/// The create/edit form.
pub fn furniture_form(
    user: &User,
    heading: &str,
    action: &str,
    input: &FurnitureInput,
    materials: &[Material],
    errors: Option<&FormErrors>,
) -> String {
    let mut body = format!(
        "<form method=\"post\" action=\"{}\">\n{}",
        escape(action),
        non_field_errors(errors)
    );
    body.push_str(&text_field("Kind", "kind", &input.kind, errors));
    body.push_str(&text_field("Model", "model", &input.model, errors));
    let _ = writeln!(
        body,
        "<p><label for=\"id_description\">Description</label>{}<textarea id=\"id_description\" name=\"description\">{}</textarea></p>",
        field_errors(errors, "description"),
        escape(&input.description)
    );
    body.push_str(&text_field("Price", "price", &input.price, errors));
    body.push_str(&text_field("Image URL", "image_url", &input.image_url, errors));

    let mut options = String::from("<option value=\"\">---------</option>");
    for material in materials {
        let value = material.id.to_string();
        let selected = if input.material.trim() == value {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            options,
            "<option value=\"{value}\"{selected}>{}</option>",
            escape(&material.name)
        );
    }
    let _ = writeln!(
        body,
        "<p><label for=\"id_material\">Material</label>{}<select id=\"id_material\" name=\"material\">{options}</select> <a href=\"/furniture/material/create/\">New material</a></p>",
        field_errors(errors, "material")
    );
    body.push_str("<button type=\"submit\">Save</button>\n</form>");

    layout(heading, Some(user), &body)
}

/// Delete confirmation.
pub fn furniture_delete(user: &User, furniture: &Furniture) -> String {
    let body = format!(
        "<p>Are you sure you want to delete \"{kind} {model}\"? Its reviews will be deleted too.</p>\n<form method=\"post\" action=\"/furniture/delete/{id}/\">\n<button type=\"submit\">Yes, delete</button> <a href=\"/furniture/details/{id}/\">Cancel</a>\n</form>",
        kind = escape(&furniture.kind),
        model = escape(&furniture.model),
        id = furniture.id,
    );
    layout("Delete furniture", Some(user), &body)
}

// =============================================================================
// MATERIAL PAGES
// =============================================================================

pub fn material_form(user: &User, input: &MaterialInput, errors: Option<&FormErrors>) -> String {
    let body = format!(
        "<form method=\"post\" action=\"/furniture/material/create/\">\n{}{}<button type=\"submit\">Save</button>\n</form>",
        non_field_errors(errors),
        text_field("Name", "name", &input.name, errors),
    );
    layout("New material", Some(user), &body)
}

// =============================================================================
// STATUS PAGES
// =============================================================================

pub fn permission_denied(user: Option<&User>) -> String {
    layout(
        "Permission denied",
        user,
        "<p>Only the owner of this item (or an administrator) may change it.</p>",
    )
}

pub fn not_found(user: Option<&User>) -> String {
    layout("Not found", user, "<p>There is nothing here.</p>")
}

pub fn login_required() -> String {
    layout(
        "Sign in required",
        None,
        "<p>Sign in with your username and password to see this page.</p>",
    )
}

pub fn error_page(title: &str, message: &str) -> String {
    layout(title, None, &format!("<p>{}</p>", escape(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>alert(\"x\" & 'y')</script>"),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#x27;y&#x27;)&lt;/script&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_field_errors_render_only_for_named_field() {
        let errors = FormErrors::single("price", "Enter a price.");
        assert!(field_errors(Some(&errors), "price").contains("Enter a price."));
        assert!(field_errors(Some(&errors), "kind").is_empty());
        assert!(field_errors(None, "price").is_empty());
    }

    #[test]
    fn test_status_pages_name_the_signed_in_user() {
        let user = User {
            id: furnish_core::UserId(1),
            username: "alice".into(),
            password_hash: furnish_core::PasswordHash::derive("alice", "alice-password"),
            is_superuser: false,
        };
        let html = permission_denied(Some(&user));
        assert!(html.contains("Signed in as alice"));
        assert!(!html.contains("Sign in</a>"));
        assert!(not_found(None).contains("Sign in</a>"));
    }

    #[test]
    fn test_empty_listing() {
        let html = furniture_list(None, "All furniture", &[]);
        assert!(html.contains("No furniture yet."));
        assert!(html.contains("Sign in"));
    }
}
