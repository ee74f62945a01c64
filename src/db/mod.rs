//! Database layer
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management

pub mod models;
mod repository;

pub use repository::{ArticleFilter, ArticlePage, Repository, PER_PAGE};
