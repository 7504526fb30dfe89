//! Ordering arithmetic for membership lists.
//!
//! Three policies coexist:
//!
//! - **Append** (preset items, template categories): new members get
//!   `max + 1`; removals never renumber, so sequences may be sparse.
//! - **Dense reindex** (category rules): the caller supplies the complete
//!   ordered membership and every row gets its index.
//! - **Adjacent swap** (template categories): a member trades places with
//!   the row whose order is exactly one above or below.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Order for a new member appended after the current maximum.
pub fn next_append_order(current_max: Option<i32>) -> i32 {
    current_max.map_or(0, |max| max + 1)
}

/* --------------------------------------------------------------------------
   Adjacent swap
   -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderDirection {
    Up,
    Down,
}

impl ReorderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    /// The order value of the sibling to swap with.
    ///
    /// Only the exact neighbour value is considered. If the sequence has a
    /// gap at this position the caller reports a boundary.
    pub fn neighbour_order(&self, current: i32) -> i32 {
        match self {
            Self::Up => current - 1,
            Self::Down => current + 1,
        }
    }

    /// Error reported when no neighbour exists in this direction.
    pub fn boundary_error(&self) -> CoreError {
        let edge = match self {
            Self::Up => "first",
            Self::Down => "last",
        };
        CoreError::Boundary(format!("Category is already at the {edge} position"))
    }
}

impl std::fmt::Display for ReorderDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
   Dense reindex
   -------------------------------------------------------------------------- */

/// Check that `requested` is a permutation of `existing`.
///
/// A dense reindex overwrites every order by position, so a partial list
/// would leave the omitted rows colliding with the reassigned ones.
pub fn validate_full_membership(requested: &[DbId], existing: &[DbId]) -> Result<(), CoreError> {
    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            return Err(CoreError::Validation(format!(
                "category_rule_ids contains {id} more than once"
            )));
        }
    }

    let existing: HashSet<DbId> = existing.iter().copied().collect();
    if let Some(foreign) = requested.iter().find(|id| !existing.contains(id)) {
        return Err(CoreError::Validation(format!(
            "category_rule_ids contains {foreign}, which does not belong to this category"
        )));
    }
    if seen.len() != existing.len() {
        return Err(CoreError::Validation(format!(
            "category_rule_ids must list all {} rules of the category, got {}",
            existing.len(),
            seen.len()
        )));
    }
    Ok(())
}

/// Pair each id with its 0-based position.
pub fn dense_orders(ids: &[DbId]) -> Vec<(DbId, i32)> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i32))
        .collect()
}

/* --------------------------------------------------------------------------
   Preset fan-out
   -------------------------------------------------------------------------- */

/// A planned insertion of a preset's categories into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutPlan {
    /// `(category_id, order)` pairs to insert, in preset order.
    pub inserts: Vec<(DbId, i32)>,
    /// Candidates dropped because the template already holds the category.
    pub skipped: usize,
}

/// Plan the fan-out of `preset_categories` (in preset order) into a template.
///
/// Orders are assigned to every candidate before filtering, so a skipped
/// candidate leaves a gap. Returns [`CoreError::EmptyResult`] when every
/// candidate is already present.
pub fn plan_preset_fanout(
    template_max_order: Option<i32>,
    preset_categories: &[DbId],
    existing: &HashSet<DbId>,
) -> Result<FanoutPlan, CoreError> {
    let start = next_append_order(template_max_order);
    let inserts: Vec<(DbId, i32)> = preset_categories
        .iter()
        .enumerate()
        .map(|(index, category_id)| (*category_id, start + index as i32))
        .filter(|(category_id, _)| !existing.contains(category_id))
        .collect();

    if inserts.is_empty() {
        return Err(CoreError::EmptyResult(
            "All categories of this preset are already in the template".to_string(),
        ));
    }

    Ok(FanoutPlan {
        skipped: preset_categories.len() - inserts.len(),
        inserts,
    })
}
