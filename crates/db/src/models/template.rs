//! Template model, its category membership, and the loaded template tree.

use rulekeeper_core::markdown::{Document, Section};
use rulekeeper_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::category::CategoryWithRules;

/// A row from the `templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Template {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub has_snapshots: bool,
    pub last_generated_at: Option<Timestamp>,
    /// Number of this template's snapshots with `is_outdated = true`.
    pub outdated_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a template.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateTemplate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// DTO for updating a template. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateTemplate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// A template with aggregate counts, as returned by the list endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub template: Template,
    pub category_count: i64,
    pub rule_count: i64,
}

/// A row from the `template_categories` join table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemplateCategory {
    pub id: DbId,
    pub template_id: DbId,
    pub category_id: DbId,
    pub sort_order: i32,
    pub from_preset_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A template membership row joined with its preset's name.
#[derive(Debug, Clone, FromRow)]
pub struct TemplateCategoryRow {
    #[sqlx(flatten)]
    pub membership: TemplateCategory,
    pub preset_name: Option<String>,
}

/// One category of a template with its rules and provenance.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateCategoryDetail {
    #[serde(flatten)]
    pub membership: TemplateCategory,
    pub preset_name: Option<String>,
    pub category: CategoryWithRules,
}

/// A template with its full category -> rule tree, both levels in order.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateTree {
    #[serde(flatten)]
    pub template: Template,
    pub categories: Vec<TemplateCategoryDetail>,
}

impl TemplateTree {
    /// Build the renderable document from the live rule content.
    pub fn document(&self) -> Document<'_> {
        Document {
            name: &self.template.name,
            description: self.template.description.as_deref(),
            sections: self
                .categories
                .iter()
                .map(|detail| Section {
                    name: &detail.category.category.name,
                    description: detail.category.category.description.as_deref(),
                    rules: detail
                        .category
                        .rules
                        .iter()
                        .map(|entry| entry.rule.content())
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Outcome of applying a preset to a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresetFanoutResult {
    pub added: usize,
    pub skipped: usize,
}

/// A template tree as it stands right after snapshot generation.
#[derive(Debug, Clone)]
pub struct GeneratedTemplate {
    pub tree: TemplateTree,
    /// Snapshots created by this generation; 0 on a repeat run.
    pub created: u64,
}
