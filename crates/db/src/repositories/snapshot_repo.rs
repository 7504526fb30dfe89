//! Repository for the `rule_snapshots` table: the staleness tracker.
//!
//! Every method that touches `is_outdated` also adjusts
//! `templates.outdated_count` in the same transaction, so the count always
//! equals the number of the template's outdated snapshots once the
//! transaction commits.

use std::collections::BTreeMap;

use rulekeeper_core::error::CoreError;
use rulekeeper_core::rule::RuleContent;
use rulekeeper_core::snapshot::{self, SnapshotAction};
use rulekeeper_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::error::DbResult;
use crate::models::rule::Rule;
use crate::models::snapshot::{OutdatedSnapshot, OutdatedSnapshotRow, RuleSnapshot};
use crate::models::template::{GeneratedTemplate, Template};
use crate::repositories::{rule_repo, template_repo, TemplateRepo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, base_rule_id, template_id, category_id, snapshot_content, \
    is_outdated, is_custom, created_at, updated_at";

/// Creates, flags and resolves rule snapshots.
pub struct SnapshotRepo;

impl SnapshotRepo {
    // ── Reads ────────────────────────────────────────────────────────

    /// Find a snapshot by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RuleSnapshot>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rule_snapshots WHERE id = $1");
        sqlx::query_as::<_, RuleSnapshot>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every snapshot of a template, oldest first.
    pub async fn list_for_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<RuleSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rule_snapshots
             WHERE template_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, RuleSnapshot>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }

    /// List a template's outdated snapshots next to the live rule content,
    /// ordered by snapshot creation.
    pub async fn list_outdated(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<OutdatedSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT s.id AS snapshot_id, s.snapshot_content, s.is_custom,
                    c.name AS category_name, {}
             FROM rule_snapshots s
             JOIN rules r ON r.id = s.base_rule_id
             JOIN categories c ON c.id = s.category_id
             WHERE s.template_id = $1 AND s.is_outdated
             ORDER BY s.created_at, s.id",
            rule_repo::JOINED_COLUMNS
        );
        let rows = sqlx::query_as::<_, OutdatedSnapshotRow>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(OutdatedSnapshot::from).collect())
    }

    /// Number of snapshots frozen from a rule.
    pub async fn count_for_rule(conn: &mut PgConnection, rule_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM rule_snapshots WHERE base_rule_id = $1")
                .bind(rule_id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(row.0)
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Freeze every (category, rule) pair of a template that has no snapshot
    /// yet, then stamp the template as generated.
    ///
    /// The template row is locked for the duration, so concurrent
    /// generations of the same template serialize. Idempotent: a repeat run
    /// creates nothing and only refreshes `last_generated_at`.
    ///
    /// Returns `None` if the template does not exist.
    pub async fn ensure_for_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> DbResult<Option<GeneratedTemplate>> {
        let mut tx = pool.begin().await?;

        let Some(template) = TemplateRepo::lock(&mut tx, template_id).await? else {
            return Ok(None);
        };
        let mut tree = TemplateRepo::load_tree(&mut tx, template).await?;

        let mut created = 0;
        for detail in &tree.categories {
            for entry in &detail.category.rules {
                let result = sqlx::query(
                    "INSERT INTO rule_snapshots
                        (base_rule_id, template_id, category_id, snapshot_content)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT ON CONSTRAINT uq_rule_snapshots_template_category_rule
                     DO NOTHING",
                )
                .bind(entry.rule.id)
                .bind(template_id)
                .bind(detail.membership.category_id)
                .bind(Json(entry.rule.content()))
                .execute(&mut *tx)
                .await?;
                created += result.rows_affected();
            }
        }

        let query = format!(
            "UPDATE templates SET has_snapshots = true, last_generated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            template_repo::COLUMNS
        );
        tree.template = sqlx::query_as::<_, Template>(&query)
            .bind(template_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(GeneratedTemplate { tree, created }))
    }

    // ── Staleness detection ──────────────────────────────────────────

    /// Flag the snapshots of `rule` whose frozen content no longer matches
    /// it, within the caller's transaction.
    ///
    /// Already outdated and custom snapshots are left alone, so repeated
    /// edits never count a snapshot twice. Returns the number newly flagged.
    pub async fn mark_outdated_for_rule(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        rule: &Rule,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rule_snapshots
             WHERE base_rule_id = $1
             ORDER BY id
             FOR UPDATE"
        );
        let snapshots = sqlx::query_as::<_, RuleSnapshot>(&query)
            .bind(rule.id)
            .fetch_all(&mut **tx)
            .await?;

        let current = rule.content();
        let flagged: Vec<&RuleSnapshot> = snapshots
            .iter()
            .filter(|snap| {
                snapshot::should_mark_outdated(snap.flags(), &snap.snapshot_content.0, &current)
            })
            .collect();
        if flagged.is_empty() {
            return Ok(0);
        }

        let snapshot_ids: Vec<DbId> = flagged.iter().map(|snap| snap.id).collect();
        let mut per_template: BTreeMap<DbId, i32> = BTreeMap::new();
        for snap in &flagged {
            *per_template.entry(snap.template_id).or_default() += 1;
        }
        let template_ids: Vec<DbId> = per_template.keys().copied().collect();

        sqlx::query("UPDATE rule_snapshots SET is_outdated = true WHERE id = ANY($1)")
            .bind(&snapshot_ids)
            .execute(&mut **tx)
            .await?;

        // Template rows are always locked in ascending id order.
        sqlx::query("SELECT id FROM templates WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&template_ids)
            .execute(&mut **tx)
            .await?;
        for (template_id, added) in &per_template {
            sqlx::query("UPDATE templates SET outdated_count = outdated_count + $2 WHERE id = $1")
                .bind(template_id)
                .bind(added)
                .execute(&mut **tx)
                .await?;
        }

        Ok(snapshot_ids.len() as u64)
    }

    /// Recompute `outdated_count` from scratch for the given templates.
    ///
    /// Used after a cascade removed snapshots behind the counter's back.
    pub async fn recount_outdated(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        if template_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE templates t SET outdated_count = (
                SELECT COUNT(*)::int FROM rule_snapshots s
                WHERE s.template_id = t.id AND s.is_outdated
             )
             WHERE t.id = ANY($1)",
        )
        .bind(template_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ── Resolution ───────────────────────────────────────────────────

    /// Resolve a snapshot with `update`, `keep` or `customize`.
    ///
    /// The snapshot row is locked before its prior state is read. If it was
    /// outdated, the owning template's count drops by one.
    pub async fn resolve(
        pool: &PgPool,
        id: DbId,
        action: SnapshotAction,
        custom_content: Option<RuleContent>,
    ) -> DbResult<RuleSnapshot> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM rule_snapshots WHERE id = $1 FOR UPDATE");
        let prior = sqlx::query_as::<_, RuleSnapshot>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "RuleSnapshot",
                id,
            })?;

        let query = format!("SELECT {} FROM rules WHERE id = $1", rule_repo::COLUMNS);
        let master = sqlx::query_as::<_, Rule>(&query)
            .bind(prior.base_rule_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Rule",
                id: prior.base_rule_id,
            })?;

        let resolution =
            snapshot::resolve(action, prior.flags(), &master.content(), custom_content)?;

        let query = format!(
            "UPDATE rule_snapshots SET
                snapshot_content = COALESCE($2, snapshot_content),
                is_outdated = $3,
                is_custom = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, RuleSnapshot>(&query)
            .bind(id)
            .bind(resolution.content.map(Json))
            .bind(resolution.flags.is_outdated)
            .bind(resolution.flags.is_custom)
            .fetch_one(&mut *tx)
            .await?;

        if resolution.outdated_delta != 0 {
            sqlx::query("UPDATE templates SET outdated_count = outdated_count + $2 WHERE id = $1")
                .bind(prior.template_id)
                .bind(resolution.outdated_delta)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(updated)
    }
}
