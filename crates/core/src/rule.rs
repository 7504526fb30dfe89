//! Rule priority and the frozen-able rule content record.
//!
//! [`RuleContent`] is the exact set of eight fields that a template snapshot
//! freezes. Staleness detection compares two `RuleContent` values with `==`,
//! so adding a field here changes what counts as drift.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::CoreError;

/* --------------------------------------------------------------------------
   Priority
   -------------------------------------------------------------------------- */

/// Severity of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    Warning,
    Info,
}

/// All valid priority strings, in display order.
pub const VALID_PRIORITIES: &[&str] = &["critical", "warning", "info"];

impl Priority {
    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Marker used in front of a rule title in rendered documents.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Critical => "\u{1F534}",
            Self::Warning => "\u{1F7E1}",
            Self::Info => "\u{1F535}",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Self::Critical),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(CoreError::Validation(format!(
                "Invalid priority '{other}'. Must be one of: {}",
                VALID_PRIORITIES.join(", ")
            ))),
        }
    }
}

/// Used by sqlx `#[sqlx(try_from = "String")]` when decoding `TEXT` columns.
impl TryFrom<String> for Priority {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/* --------------------------------------------------------------------------
   Content
   -------------------------------------------------------------------------- */

/// The eight content fields of a rule.
///
/// This is what a snapshot freezes and what `customize` replaces wholesale.
/// Name and description are catalogue metadata and deliberately excluded.
/// Every key must be present when deserializing; nullable fields take an
/// explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RuleContent {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    pub priority: Priority,
    pub allowed: bool,
    #[validate(length(min = 1, message = "description_detail must not be empty"))]
    pub description_detail: String,
    #[serde(deserialize_with = "nullable")]
    pub example_bad: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub example_good: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub violation_action: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub notes: Option<String>,
}

/// Plain `Option` decoding. Routing a field through `deserialize_with`
/// makes serde report a missing key instead of defaulting it to `None`.
fn nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

impl RuleContent {
    /// Names of the fields whose values differ between `self` and `other`.
    ///
    /// Empty when the two are equal.
    pub fn changed_fields(&self, other: &RuleContent) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.title != other.title {
            changed.push("title");
        }
        if self.priority != other.priority {
            changed.push("priority");
        }
        if self.allowed != other.allowed {
            changed.push("allowed");
        }
        if self.description_detail != other.description_detail {
            changed.push("description_detail");
        }
        if self.example_bad != other.example_bad {
            changed.push("example_bad");
        }
        if self.example_good != other.example_good {
            changed.push("example_good");
        }
        if self.violation_action != other.violation_action {
            changed.push("violation_action");
        }
        if self.notes != other.notes {
            changed.push("notes");
        }
        changed
    }
}
