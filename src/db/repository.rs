//! Repository pattern for database operations
//!
//! Sole writer of article storage state. Handlers hold no article data
//! across requests; everything flows through here per request.

use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::time::Duration;
use uuid::Uuid;

use super::models::{Article, ArticleActiveModel, ArticleColumn, ArticleEntity, Category};
use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};

/// Fixed page size for article listings
pub const PER_PAGE: u64 = 10;

/// Sample knowledge base content, inserted by [`Repository::seed_sample_articles`]
const SAMPLE_ARTICLES: &[(&str, Category, &str)] = &[
    (
        "Resetting Your Password",
        Category::Accounts,
        "## Resetting Your Password\n\n1. Go to the password reset page.\n2. Enter your company email.\n3. Check your inbox for the reset link.\n\nIf you still cannot log in, contact IT support.",
    ),
    (
        "Wi-Fi Troubleshooting Guide",
        Category::Network,
        "## Wi-Fi Troubleshooting\n\n- Ensure airplane mode is off.\n- Toggle Wi-Fi off/on.\n- Forget and reconnect to `CorpNet`.\n- Reboot your device.\n\nIf issues persist, open a ticket with IT.",
    ),
];

/// Listing filters; both may combine (AND)
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Case-insensitive substring match against title OR content
    pub q: Option<String>,
    /// Exact category match
    pub category: Option<Category>,
}

/// One page of a listing, newest-first
#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub items: Vec<Article>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl ArticlePage {
    /// An empty page, used when a filter can never match
    pub fn empty(page: u64) -> Self {
        Self {
            items: Vec::new(),
            page,
            per_page: PER_PAGE,
            total_items: 0,
            total_pages: 0,
        }
    }
}

/// Repository for article data access
#[derive(Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    /// Connect to the database and build a repository over the pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut options = ConnectOptions::new(&config.url);
        options
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(true);

        let db = Database::connect(options)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        Ok(Self { db })
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.db
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }

    /// Fetch one page of articles matching `filter`, newest-first.
    ///
    /// `page` is 1-based; pages past the end return an empty item list with
    /// the totals intact.
    pub async fn list_articles(&self, filter: &ArticleFilter, page: u64) -> Result<ArticlePage> {
        let page = page.max(1);

        let paginator = ArticleEntity::find()
            .filter(filter_condition(filter))
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .paginate(&self.db, PER_PAGE);

        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok(ArticlePage {
            items,
            page,
            per_page: PER_PAGE,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    /// Find an article by id
    pub async fn find_article_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Insert a new article with a fresh id and server-assigned timestamps
    pub async fn create_article(
        &self,
        title: String,
        category: Category,
        content: String,
    ) -> Result<Article> {
        let now = chrono::Utc::now();

        let article = ArticleActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title),
            category: Set(category),
            content: Set(content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        article.insert(&self.db).await.map_err(Into::into)
    }

    /// Update an article's title, category, and content, refreshing
    /// `updated_at`. Returns `None` if the id does not exist. The id and
    /// `created_at` never change.
    pub async fn update_article(
        &self,
        id: Uuid,
        title: String,
        category: Category,
        content: String,
    ) -> Result<Option<Article>> {
        let Some(existing) = self.find_article_by_id(id).await? else {
            return Ok(None);
        };

        let mut article: ArticleActiveModel = existing.into();
        article.title = Set(title);
        article.category = Set(category);
        article.content = Set(content);
        article.updated_at = Set(chrono::Utc::now().into());

        article.update(&self.db).await.map(Some).map_err(Into::into)
    }

    /// Hard-delete an article. Returns whether a row was removed.
    pub async fn delete_article(&self, id: Uuid) -> Result<bool> {
        let result = ArticleEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Insert the sample articles, skipping any whose title already exists
    pub async fn seed_sample_articles(&self) -> Result<()> {
        for (title, category, content) in SAMPLE_ARTICLES {
            let exists = ArticleEntity::find()
                .filter(ArticleColumn::Title.eq(*title))
                .one(&self.db)
                .await?
                .is_some();

            if !exists {
                self.create_article(title.to_string(), *category, content.to_string())
                    .await?;
                tracing::info!(title, "Seeded sample article");
            }
        }
        Ok(())
    }
}

/// Build the WHERE clause for a listing
fn filter_condition(filter: &ArticleFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(q) = filter.q.as_deref() {
        if !q.trim().is_empty() {
            let pattern = format!("%{}%", escape_like(q));
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(ArticleColumn::Title).ilike(pattern.clone()))
                    .add(Expr::col(ArticleColumn::Content).ilike(pattern)),
            );
        }
    }

    if let Some(category) = filter.category {
        condition = condition.add(ArticleColumn::Category.eq(category));
    }

    condition
}

/// Escape LIKE wildcards so the needle matches as a literal substring
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn listing_sql(filter: &ArticleFilter) -> String {
        ArticleEntity::find()
            .filter(filter_condition(filter))
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("wifi"), "wifi");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_search_matches_title_or_content_case_insensitively() {
        let filter = ArticleFilter {
            q: Some("wifi".to_string()),
            category: None,
        };
        let sql = listing_sql(&filter);
        assert!(sql.contains(r#""title" ILIKE '%wifi%'"#));
        assert!(sql.contains(r#""content" ILIKE '%wifi%'"#));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_category_filter_is_exact_match() {
        let filter = ArticleFilter {
            q: None,
            category: Some(Category::Network),
        };
        let sql = listing_sql(&filter);
        assert!(sql.contains(r#""category" = 'Network'"#));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let filter = ArticleFilter {
            q: Some("vpn".to_string()),
            category: Some(Category::Network),
        };
        let sql = listing_sql(&filter);
        assert!(sql.contains("ILIKE"));
        assert!(sql.contains(r#""category" = 'Network'"#));
        assert!(sql.contains(" AND "));
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let filter = ArticleFilter {
            q: Some("   ".to_string()),
            category: None,
        };
        let sql = listing_sql(&filter);
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn test_listing_orders_newest_first() {
        let sql = listing_sql(&ArticleFilter::default());
        assert!(sql.contains(r#"ORDER BY "articles"."created_at" DESC, "articles"."id" DESC"#));
    }

    #[test]
    fn test_empty_page_shape() {
        let page = ArticlePage::empty(3);
        assert_eq!(page.page, 3);
        assert_eq!(page.per_page, PER_PAGE);
        assert_eq!(page.total_items, 0);
        assert!(page.items.is_empty());
    }
}
