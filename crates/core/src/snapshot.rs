//! Snapshot staleness state machine.
//!
//! A snapshot carries two flags, `is_outdated` and `is_custom`. The
//! transitions are:
//!
//! | Event                     | Guard                                   | Effect                         |
//! |---------------------------|-----------------------------------------|--------------------------------|
//! | master rule edited        | content differs, not outdated, not custom | `is_outdated = true`, count +1 |
//! | resolve `update`          | none                                    | content = master, both flags false |
//! | resolve `keep`            | none                                    | `is_outdated = false`          |
//! | resolve `customize`       | custom content supplied                 | content = custom, `is_custom = true`, `is_outdated = false` |
//!
//! Every resolution decrements the template's outdated count by one if and
//! only if the snapshot was outdated *before* the resolution. The database
//! layer applies these decisions inside a single transaction.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::rule::RuleContent;

/* --------------------------------------------------------------------------
   Actions
   -------------------------------------------------------------------------- */

/// How the user resolves an outdated snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotAction {
    /// Take the master rule's current content.
    Update,
    /// Acknowledge the drift and keep the frozen content.
    Keep,
    /// Replace the content with user-supplied text.
    Customize,
}

/// All valid action strings.
pub const VALID_ACTIONS: &[&str] = &["update", "keep", "customize"];

impl SnapshotAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Keep => "keep",
            Self::Customize => "customize",
        }
    }
}

impl std::fmt::Display for SnapshotAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update" => Ok(Self::Update),
            "keep" => Ok(Self::Keep),
            "customize" => Ok(Self::Customize),
            other => Err(CoreError::InvalidAction(format!(
                "Invalid action '{other}'. Must be one of: {}",
                VALID_ACTIONS.join(", ")
            ))),
        }
    }
}

/* --------------------------------------------------------------------------
   Flags and transitions
   -------------------------------------------------------------------------- */

/// The two mutable flags of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotFlags {
    pub is_outdated: bool,
    pub is_custom: bool,
}

/// Whether a master rule edit should flip this snapshot to outdated.
///
/// Edge-triggered: an already outdated snapshot is never flipped again, and
/// custom snapshots are immune regardless of drift.
pub fn should_mark_outdated(
    flags: SnapshotFlags,
    frozen: &RuleContent,
    current: &RuleContent,
) -> bool {
    !flags.is_outdated && !flags.is_custom && frozen != current
}

/// The outcome of resolving a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// New content to store, or `None` to keep the frozen content.
    pub content: Option<RuleContent>,
    pub flags: SnapshotFlags,
    /// Change to apply to the owning template's outdated count (0 or -1).
    pub outdated_delta: i32,
}

/// Compute the resolution of a snapshot from its prior flags.
///
/// `master` is the base rule's current content; it is only read for
/// [`SnapshotAction::Update`]. `custom` is required for
/// [`SnapshotAction::Customize`].
pub fn resolve(
    action: SnapshotAction,
    prior: SnapshotFlags,
    master: &RuleContent,
    custom: Option<RuleContent>,
) -> Result<Resolution, CoreError> {
    let (content, is_custom) = match action {
        SnapshotAction::Update => (Some(master.clone()), false),
        SnapshotAction::Keep => (None, prior.is_custom),
        SnapshotAction::Customize => {
            let custom = custom.ok_or_else(|| {
                CoreError::Validation(
                    "custom_content is required for the customize action".to_string(),
                )
            })?;
            (Some(custom), true)
        }
    };

    Ok(Resolution {
        content,
        flags: SnapshotFlags {
            is_outdated: false,
            is_custom,
        },
        outdated_delta: if prior.is_outdated { -1 } else { 0 },
    })
}
