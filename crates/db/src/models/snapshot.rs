//! Rule snapshot model and the outdated-listing read model.

use rulekeeper_core::rule::RuleContent;
use rulekeeper_core::snapshot::SnapshotFlags;
use rulekeeper_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::rule::Rule;

/// A row from the `rule_snapshots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RuleSnapshot {
    pub id: DbId,
    pub base_rule_id: DbId,
    pub template_id: DbId,
    pub category_id: DbId,
    pub snapshot_content: Json<RuleContent>,
    pub is_outdated: bool,
    pub is_custom: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RuleSnapshot {
    pub fn flags(&self) -> SnapshotFlags {
        SnapshotFlags {
            is_outdated: self.is_outdated,
            is_custom: self.is_custom,
        }
    }
}

/// Row shape of the outdated-listing query: a snapshot joined with its
/// base rule and category name.
#[derive(Debug, Clone, FromRow)]
pub struct OutdatedSnapshotRow {
    pub snapshot_id: DbId,
    pub snapshot_content: Json<RuleContent>,
    pub is_custom: bool,
    pub category_name: String,
    #[sqlx(flatten)]
    pub rule: Rule,
}

/// An outdated snapshot side by side with the live rule content.
#[derive(Debug, Clone, Serialize)]
pub struct OutdatedSnapshot {
    pub snapshot_id: DbId,
    pub rule_id: DbId,
    pub rule_name: String,
    pub category_name: String,
    pub is_custom: bool,
    pub snapshot_content: RuleContent,
    pub current_content: RuleContent,
    /// Content fields that differ between the two versions.
    pub changed_fields: Vec<&'static str>,
}

impl From<OutdatedSnapshotRow> for OutdatedSnapshot {
    fn from(row: OutdatedSnapshotRow) -> Self {
        let current_content = row.rule.content();
        Self {
            snapshot_id: row.snapshot_id,
            rule_id: row.rule.id,
            changed_fields: row.snapshot_content.0.changed_fields(&current_content),
            current_content,
            rule_name: row.rule.name,
            category_name: row.category_name,
            is_custom: row.is_custom,
            snapshot_content: row.snapshot_content.0,
        }
    }
}
