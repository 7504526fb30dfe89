//! Rule model and DTOs.

use rulekeeper_core::rule::{Priority, RuleContent};
use rulekeeper_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Rule {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub allowed: bool,
    pub description_detail: String,
    pub example_bad: Option<String>,
    pub example_good: Option<String>,
    pub violation_action: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Rule {
    /// The eight content fields a snapshot freezes.
    pub fn content(&self) -> RuleContent {
        RuleContent {
            title: self.title.clone(),
            priority: self.priority,
            allowed: self.allowed,
            description_detail: self.description_detail.clone(),
            example_bad: self.example_bad.clone(),
            example_good: self.example_good.clone(),
            violation_action: self.violation_action.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// DTO for creating a rule, and for replacing one on update.
///
/// Updates are full replacements so optional fields can be cleared.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RuleInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub priority: Priority,
    pub allowed: bool,
    #[validate(length(min = 1))]
    pub description_detail: String,
    pub example_bad: Option<String>,
    pub example_good: Option<String>,
    pub violation_action: Option<String>,
    pub notes: Option<String>,
}

impl RuleInput {
    /// Input that recreates `rule` under a new name.
    pub fn copy_of(rule: &Rule, name: String) -> Self {
        Self {
            name,
            description: rule.description.clone(),
            title: rule.title.clone(),
            priority: rule.priority,
            allowed: rule.allowed,
            description_detail: rule.description_detail.clone(),
            example_bad: rule.example_bad.clone(),
            example_good: rule.example_good.clone(),
            violation_action: rule.violation_action.clone(),
            notes: rule.notes.clone(),
        }
    }
}
