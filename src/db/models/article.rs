//! Article entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub title: String,

    pub category: Category,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// The fixed article category set. Stored as a string column; values
/// outside this enum never reach the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum Category {
    #[sea_orm(string_value = "Hardware")]
    Hardware,
    #[sea_orm(string_value = "Software")]
    Software,
    #[sea_orm(string_value = "Network")]
    Network,
    #[sea_orm(string_value = "Accounts")]
    Accounts,
}

impl Category {
    /// All categories, in form display order
    pub const ALL: [Category; 4] = [
        Category::Hardware,
        Category::Software,
        Category::Network,
        Category::Accounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hardware => "Hardware",
            Category::Software => "Software",
            Category::Network => "Network",
            Category::Accounts => "Accounts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for category strings outside the fixed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hardware" => Ok(Category::Hardware),
            "Software" => Ok(Category::Software),
            "Network" => Ok(Category::Network),
            "Accounts" => Ok(Category::Accounts),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}
