//! Category and category-rule membership models.

use rulekeeper_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::rule::Rule;

/// A row from the `categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a category. `sort_order` defaults to the category count.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateCategory {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

/// DTO for updating a category. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategory {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

/// A row from the `category_rules` join table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryRule {
    pub id: DbId,
    pub category_id: DbId,
    pub rule_id: DbId,
    pub sort_order: i32,
    pub created_at: Timestamp,
}

/// A category membership joined with the rule it points at.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryRuleEntry {
    pub category_rule_id: DbId,
    pub category_id: DbId,
    pub sort_order: i32,
    #[sqlx(flatten)]
    pub rule: Rule,
}

/// A category enriched with its rules in order.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithRules {
    #[serde(flatten)]
    pub category: Category,
    pub rules: Vec<CategoryRuleEntry>,
}
