//! Category preset models and DTOs.

use rulekeeper_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::category::CategoryWithRules;
use crate::models::rule::Rule;

/// A row from the `category_presets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryPreset {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a preset.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreatePreset {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// DTO for updating a preset. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdatePreset {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// A row from the `category_preset_items` join table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryPresetItem {
    pub id: DbId,
    pub preset_id: DbId,
    pub category_id: DbId,
    pub sort_order: i32,
    pub created_at: Timestamp,
}

/// A preset item with its category and that category's rules.
#[derive(Debug, Clone, Serialize)]
pub struct PresetItemWithCategory {
    pub id: DbId,
    pub sort_order: i32,
    pub category: CategoryWithRules,
}

/// A preset enriched with its categories in order.
#[derive(Debug, Clone, Serialize)]
pub struct PresetWithItems {
    #[serde(flatten)]
    pub preset: CategoryPreset,
    pub items: Vec<PresetItemWithCategory>,
}

/// A rule as listed in a preset preview, tagged with its category.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewRule {
    #[serde(flatten)]
    pub rule: Rule,
    pub category_name: String,
}

/// Response of the preset preview: every rule the preset would bring in.
#[derive(Debug, Clone, Serialize)]
pub struct PresetPreview {
    pub preset: PresetWithItems,
    pub total_rules: usize,
    pub all_rules: Vec<PreviewRule>,
}

impl PresetPreview {
    /// Flatten a loaded preset into its preview.
    pub fn from_preset(preset: PresetWithItems) -> Self {
        let all_rules: Vec<PreviewRule> = preset
            .items
            .iter()
            .flat_map(|item| {
                item.category.rules.iter().map(|entry| PreviewRule {
                    rule: entry.rule.clone(),
                    category_name: item.category.category.name.clone(),
                })
            })
            .collect();
        Self {
            total_rules: all_rules.len(),
            all_rules,
            preset,
        }
    }
}
