//! Article catalog handlers
//!
//! The controller surface for the knowledge base: listing/search, detail
//! view with Markdown rendering, and the capability-gated write paths.
//! Handlers produce plain view data; the templating layer owns the HTML.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{authorize, Action, Caller};
use crate::db::models::{Article, Category};
use crate::db::{ArticleFilter, ArticlePage};
use crate::errors::{AppError, FieldError, Result};
use crate::{metrics, render, AppState};

/// Query parameters accepted by the listing.
///
/// `page` is deserialized as a raw string so malformed values are clamped
/// to page 1 instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
}

/// Form fields for create/update. Missing fields default to empty strings
/// so validation can report them instead of the deserializer rejecting.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ArticleInput {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "The title is required and may not be greater than 255 characters."
    ))]
    pub title: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "The content field is required."))]
    pub content: String,
}

/// Validated form input, category resolved to the fixed enum
#[derive(Debug)]
struct ValidArticle {
    title: String,
    category: Category,
    content: String,
}

#[derive(Debug, Serialize)]
pub struct ArticleSummary {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Article> for ArticleSummary {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            category: article.category,
            created_at: article.created_at.to_rfc3339(),
            updated_at: article.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<ArticleSummary>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    /// Links preserve the active `q`/`category` filters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_url: Option<String>,
}

impl ListResponse {
    fn from_page(page: ArticlePage, q: Option<&str>, category: Option<&str>) -> Result<Self> {
        let prev_page_url = (page.page > 1)
            .then(|| page_url(page.page - 1, q, category))
            .transpose()?;
        let next_page_url = (page.page < page.total_pages)
            .then(|| page_url(page.page + 1, q, category))
            .transpose()?;

        Ok(Self {
            items: page.items.into_iter().map(Into::into).collect(),
            page: page.page,
            per_page: page.per_page,
            total_items: page.total_items,
            total_pages: page.total_pages,
            prev_page_url,
            next_page_url,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    /// Source Markdown, shown on the edit form
    pub content: String,
    /// Pre-rendered markup, injected unescaped by the templating layer
    pub content_html: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Data backing the create/edit forms
#[derive(Debug, Serialize)]
pub struct ArticleFormResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// The fixed category choices, in display order
    pub categories: Vec<&'static str>,
    pub values: ArticleInput,
}

/// Outcome of a successful mutation: a human-readable status message and
/// where the templating layer should send the caller next
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub id: Uuid,
    pub status: String,
    pub redirect: String,
}

/// The hub root lands on the article index
pub async fn root_redirect() -> Redirect {
    Redirect::to("/articles")
}

/// GET /articles - list, search, and filter (paginated)
#[instrument(skip(state))]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let page = parse_page(params.page.as_deref());
    let q = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let category = match params.category.as_deref().filter(|s| !s.is_empty()) {
        None => None,
        Some(raw) => match raw.parse::<Category>() {
            Ok(category) => Some(category),
            // Values outside the fixed enum match nothing rather than erroring
            Err(_) => {
                metrics::record_list_query(true);
                return Ok(Json(ListResponse::from_page(
                    ArticlePage::empty(page),
                    q.as_deref(),
                    None,
                )?));
            }
        },
    };

    metrics::record_list_query(q.is_some() || category.is_some());

    let filter = ArticleFilter {
        q: q.clone(),
        category,
    };
    let articles = state.repo.list_articles(&filter, page).await?;

    Ok(Json(ListResponse::from_page(
        articles,
        q.as_deref(),
        category.map(|c| c.as_str()),
    )?))
}

/// GET /articles/{id} - detail view with rendered content
#[instrument(skip(state))]
pub async fn show_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleDetail>> {
    let article = state
        .repo
        .find_article_by_id(id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound { id: id.to_string() })?;

    // Re-rendered on every view; no cache of converter output
    let content_html = render::render_markdown(&article.content);
    metrics::record_article_view();

    Ok(Json(ArticleDetail {
        id: article.id,
        title: article.title,
        category: article.category,
        content: article.content,
        content_html,
        created_at: article.created_at.to_rfc3339(),
        updated_at: article.updated_at.to_rfc3339(),
    }))
}

/// GET /articles/new - data for the create form
#[instrument]
pub async fn new_article(caller: Caller) -> Result<Json<ArticleFormResponse>> {
    authorize(&caller, Action::ManageArticles)?;

    Ok(Json(ArticleFormResponse {
        id: None,
        categories: category_choices(),
        values: ArticleInput::default(),
    }))
}

/// POST /articles - create
#[instrument(skip(state, input))]
pub async fn create_article(
    State(state): State<AppState>,
    caller: Caller,
    Form(input): Form<ArticleInput>,
) -> Result<(StatusCode, Json<MutationResponse>)> {
    authorize(&caller, Action::ManageArticles)?;
    let valid = validate_input(&input)?;

    let article = state
        .repo
        .create_article(valid.title, valid.category, valid.content)
        .await?;

    tracing::info!(
        article_id = %article.id,
        category = %article.category,
        "Article created"
    );
    metrics::record_article_write("created");

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            id: article.id,
            status: "Article created".to_string(),
            redirect: "/articles".to_string(),
        }),
    ))
}

/// GET /articles/{id}/edit - data for the edit form
#[instrument(skip(state))]
pub async fn edit_article(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleFormResponse>> {
    authorize(&caller, Action::ManageArticles)?;

    let article = state
        .repo
        .find_article_by_id(id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound { id: id.to_string() })?;

    Ok(Json(ArticleFormResponse {
        id: Some(article.id),
        categories: category_choices(),
        values: ArticleInput {
            title: article.title,
            category: article.category.as_str().to_string(),
            content: article.content,
        },
    }))
}

/// PUT /articles/{id} - update
#[instrument(skip(state, input))]
pub async fn update_article(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Form(input): Form<ArticleInput>,
) -> Result<Json<MutationResponse>> {
    authorize(&caller, Action::ManageArticles)?;
    let valid = validate_input(&input)?;

    let article = state
        .repo
        .update_article(id, valid.title, valid.category, valid.content)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound { id: id.to_string() })?;

    tracing::info!(article_id = %article.id, "Article updated");
    metrics::record_article_write("updated");

    Ok(Json(MutationResponse {
        id: article.id,
        status: "Article updated".to_string(),
        redirect: format!("/articles/{}", article.id),
    }))
}

/// DELETE /articles/{id} - hard delete
#[instrument(skip(state))]
pub async fn delete_article(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<MutationResponse>> {
    authorize(&caller, Action::ManageArticles)?;

    if !state.repo.delete_article(id).await? {
        return Err(AppError::ArticleNotFound { id: id.to_string() });
    }

    tracing::info!(article_id = %id, "Article deleted");
    metrics::record_article_write("deleted");

    Ok(Json(MutationResponse {
        id,
        status: "Article deleted".to_string(),
        redirect: "/articles".to_string(),
    }))
}

fn category_choices() -> Vec<&'static str> {
    Category::ALL.iter().map(|c| c.as_str()).collect()
}

/// Clamp the raw `page` parameter to a 1-based page number, ignoring
/// malformed input
fn parse_page(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&p| p >= 1)
        .unwrap_or(1)
}

#[derive(Serialize)]
struct PageQuery<'a> {
    page: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
}

/// Build a listing URL preserving the active filters
fn page_url(page: u64, q: Option<&str>, category: Option<&str>) -> Result<String> {
    let query =
        serde_urlencoded::to_string(PageQuery { page, q, category }).map_err(|e| {
            AppError::Internal {
                message: format!("Failed to build page link: {}", e),
            }
        })?;
    Ok(format!("/articles?{}", query))
}

/// Validate form input, collecting every field failure so the form can
/// show them all at once with the submitted values preserved.
fn validate_input(input: &ArticleInput) -> Result<ValidArticle> {
    let mut errors = Vec::new();

    if let Err(validation) = input.validate() {
        for (field, field_errors) in validation.field_errors() {
            for err in field_errors {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("The {} field is invalid.", field));
                errors.push(FieldError::new(field.to_string(), message));
            }
        }
    }

    let category = match input.category.parse::<Category>() {
        Ok(category) => Some(category),
        Err(_) => {
            errors.push(FieldError::new(
                "category",
                "The category must be one of: Hardware, Software, Network, Accounts.",
            ));
            None
        }
    };

    match (errors.is_empty(), category) {
        (true, Some(category)) => Ok(ValidArticle {
            title: input.title.clone(),
            category,
            content: input.content.clone(),
        }),
        _ => {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(AppError::Validation {
                errors,
                values: serde_json::to_value(input)?,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PER_PAGE;

    fn input(title: &str, category: &str, content: &str) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            category: category.to_string(),
            content: content.to_string(),
        }
    }

    fn field_errors(err: AppError) -> Vec<FieldError> {
        match err {
            AppError::Validation { errors, .. } => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_input_passes() {
        let valid = validate_input(&input(
            "Resetting Your Password",
            "Accounts",
            "## Reset\n1. Go to page",
        ))
        .unwrap();
        assert_eq!(valid.title, "Resetting Your Password");
        assert_eq!(valid.category, Category::Accounts);
    }

    #[test]
    fn test_missing_title_is_rejected() {
        let errors = field_errors(validate_input(&input("", "Hardware", "body")).unwrap_err());
        assert!(errors.iter().any(|e| e.field == "title"));
    }

    #[test]
    fn test_overlong_title_is_rejected() {
        let long_title = "t".repeat(256);
        let errors =
            field_errors(validate_input(&input(&long_title, "Hardware", "body")).unwrap_err());
        assert!(errors.iter().any(|e| e.field == "title"));

        let max_title = "t".repeat(255);
        assert!(validate_input(&input(&max_title, "Hardware", "body")).is_ok());
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let errors = field_errors(validate_input(&input("Title", "Printers", "body")).unwrap_err());
        assert!(errors
            .iter()
            .any(|e| e.field == "category" && e.message.contains("Hardware")));
    }

    #[test]
    fn test_missing_content_is_rejected() {
        let errors = field_errors(validate_input(&input("Title", "Network", "")).unwrap_err());
        assert!(errors.iter().any(|e| e.field == "content"));
    }

    #[test]
    fn test_all_failures_reported_with_values_echoed() {
        let err = validate_input(&input("", "Printers", "")).unwrap_err();
        match err {
            AppError::Validation { errors, values } => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["category", "content", "title"]);
                assert_eq!(values["category"], "Printers");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_page_clamps_malformed_input() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("2")), 2);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-3")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some(" 4 ")), 4);
    }

    #[test]
    fn test_page_url_preserves_filters() {
        let url = page_url(2, Some("wifi setup"), Some("Network")).unwrap();
        assert_eq!(url, "/articles?page=2&q=wifi+setup&category=Network");

        let bare = page_url(1, None, None).unwrap();
        assert_eq!(bare, "/articles?page=1");
    }

    #[test]
    fn test_list_links_follow_page_position() {
        let first = ListResponse::from_page(
            ArticlePage {
                items: Vec::new(),
                page: 1,
                per_page: PER_PAGE,
                total_items: 15,
                total_pages: 2,
            },
            Some("wifi"),
            None,
        )
        .unwrap();
        assert_eq!(first.prev_page_url, None);
        assert_eq!(first.next_page_url.as_deref(), Some("/articles?page=2&q=wifi"));

        let last = ListResponse::from_page(
            ArticlePage {
                items: Vec::new(),
                page: 2,
                per_page: PER_PAGE,
                total_items: 15,
                total_pages: 2,
            },
            Some("wifi"),
            None,
        )
        .unwrap();
        assert_eq!(last.prev_page_url.as_deref(), Some("/articles?page=1&q=wifi"));
        assert_eq!(last.next_page_url, None);
    }

    #[test]
    fn test_category_choices_order() {
        assert_eq!(
            category_choices(),
            vec!["Hardware", "Software", "Network", "Accounts"]
        );
    }
}
