//! SeaORM entity models

pub mod article;

pub use article::{
    ActiveModel as ArticleActiveModel, Category, Column as ArticleColumn, Entity as ArticleEntity,
    Model as Article,
};
