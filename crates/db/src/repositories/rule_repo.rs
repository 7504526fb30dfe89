//! Repository for the `rules` table.

use rulekeeper_core::error::CoreError;
use rulekeeper_core::naming::copy_name;
use rulekeeper_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::rule::{Rule, RuleInput};
use crate::repositories::SnapshotRepo;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, name, description, title, priority, allowed, \
    description_detail, example_bad, example_good, violation_action, notes, \
    created_at, updated_at";

/// Rule columns qualified with the `r` alias, for joins.
pub(crate) const JOINED_COLUMNS: &str = "r.id, r.name, r.description, r.title, r.priority, \
    r.allowed, r.description_detail, r.example_bad, r.example_good, r.violation_action, \
    r.notes, r.created_at, r.updated_at";

/// Provides CRUD operations for master rules.
pub struct RuleRepo;

impl RuleRepo {
    /// Insert a new rule, returning the created row.
    pub async fn create(pool: &PgPool, input: &RuleInput) -> Result<Rule, sqlx::Error> {
        let query = format!(
            "INSERT INTO rules
                (name, description, title, priority, allowed, description_detail,
                 example_bad, example_good, violation_action, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Rule>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.title)
            .bind(input.priority.as_str())
            .bind(input.allowed)
            .bind(&input.description_detail)
            .bind(&input.example_bad)
            .bind(&input.example_good)
            .bind(&input.violation_action)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// Find a rule by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Rule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rules WHERE id = $1");
        sqlx::query_as::<_, Rule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all rules, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Rule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rules ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Rule>(&query).fetch_all(pool).await
    }

    /// Replace every field of a rule and re-evaluate the snapshots frozen
    /// from it, in one transaction.
    ///
    /// Returns the updated rule and the number of snapshots newly marked
    /// outdated, or `None` if the rule does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &RuleInput,
    ) -> DbResult<Option<(Rule, u64)>> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE rules SET
                name = $2,
                description = $3,
                title = $4,
                priority = $5,
                allowed = $6,
                description_detail = $7,
                example_bad = $8,
                example_good = $9,
                violation_action = $10,
                notes = $11
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let rule = sqlx::query_as::<_, Rule>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.title)
            .bind(input.priority.as_str())
            .bind(input.allowed)
            .bind(&input.description_detail)
            .bind(&input.example_bad)
            .bind(&input.example_good)
            .bind(&input.violation_action)
            .bind(&input.notes)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(rule) = rule else {
            return Ok(None);
        };

        let marked = SnapshotRepo::mark_outdated_for_rule(&mut tx, &rule).await?;

        tx.commit().await?;
        Ok(Some((rule, marked)))
    }

    /// Delete a rule. Category memberships cascade.
    ///
    /// Refused with [`CoreError::Conflict`] while any snapshot was frozen
    /// from the rule. Returns `false` if the rule does not exist.
    pub async fn delete(pool: &PgPool, id: DbId) -> DbResult<bool> {
        let mut tx = pool.begin().await?;

        let snapshots = SnapshotRepo::count_for_rule(&mut tx, id).await?;
        if snapshots > 0 {
            return Err(CoreError::Conflict(format!(
                "Rule {id} is frozen in {snapshots} template snapshot(s) and cannot be deleted"
            ))
            .into());
        }

        let result = sqlx::query("DELETE FROM rules WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Duplicate a rule under the name `"<name> (copy)"`.
    ///
    /// Returns `None` if the source rule does not exist.
    pub async fn copy(pool: &PgPool, id: DbId) -> Result<Option<Rule>, sqlx::Error> {
        let Some(source) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let input = RuleInput::copy_of(&source, copy_name(&source.name));
        Self::create(pool, &input).await.map(Some)
    }
}
