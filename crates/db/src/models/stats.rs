//! Read-only usage statistics.

use rulekeeper_core::rule::Priority;
use rulekeeper_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Row counts of every table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GlobalStats {
    pub rules: i64,
    pub categories: i64,
    pub presets: i64,
    pub templates: i64,
    pub category_rules: i64,
    pub preset_items: i64,
    pub template_categories: i64,
    pub snapshots: i64,
}

/// How often a rule is referenced.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RuleUsage {
    pub id: DbId,
    pub name: String,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub used_in_categories: i64,
    pub used_in_snapshots: i64,
    pub total_usage: i64,
    pub created_at: Timestamp,
}

/// How often a category is referenced.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryUsage {
    pub id: DbId,
    pub name: String,
    pub rules_count: i64,
    pub used_in_presets: i64,
    pub used_in_templates: i64,
    pub used_in_snapshots: i64,
    pub total_usage: i64,
    pub created_at: Timestamp,
}
