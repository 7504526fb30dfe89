//! Repository for the `categories` and `category_rules` tables.

use std::collections::HashMap;

use rulekeeper_core::error::CoreError;
use rulekeeper_core::naming::copy_name;
use rulekeeper_core::ordering;
use rulekeeper_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::DbResult;
use crate::models::category::{
    Category, CategoryRule, CategoryRuleEntry, CategoryWithRules, CreateCategory, UpdateCategory,
};
use crate::repositories::{rule_repo, SnapshotRepo};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, sort_order, created_at, updated_at";

/// Column list for the `category_rules` join table.
const MEMBER_COLUMNS: &str = "id, category_id, rule_id, sort_order, created_at";

/// Provides CRUD and rule-membership operations for categories.
pub struct CategoryRepo;

impl CategoryRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert a new category. Without an explicit `sort_order` the category
    /// goes after the existing ones.
    pub async fn create(pool: &PgPool, input: &CreateCategory) -> Result<Category, sqlx::Error> {
        let query = format!(
            "INSERT INTO categories (name, description, sort_order)
             VALUES ($1, $2, COALESCE($3, (SELECT COUNT(*)::int FROM categories)))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    /// Find a category by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a category together with its ordered rules.
    pub async fn find_with_rules(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CategoryWithRules>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let mut found = Self::load_with_rules(&mut conn, &[id]).await?;
        Ok(found.pop())
    }

    /// List all categories by `sort_order`, each with its ordered rules.
    pub async fn list_with_rules(pool: &PgPool) -> Result<Vec<CategoryWithRules>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let ids: Vec<DbId> =
            sqlx::query_scalar("SELECT id FROM categories ORDER BY sort_order, id")
                .fetch_all(&mut *conn)
                .await?;
        Self::load_with_rules(&mut conn, &ids).await
    }

    /// Update a category. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCategory,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!(
            "UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                sort_order = COALESCE($4, sort_order)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.sort_order)
            .fetch_optional(pool)
            .await
    }

    /// Delete a category. Memberships and snapshots cascade; the outdated
    /// counts of the templates that lost snapshots are recomputed in the
    /// same transaction.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let affected: Vec<DbId> = sqlx::query_scalar(
            "SELECT DISTINCT template_id FROM rule_snapshots WHERE category_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        SnapshotRepo::recount_outdated(&mut tx, &affected).await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Duplicate a category and its rule list under `"<name> (copy)"`.
    ///
    /// The copy goes after the existing categories; its rules keep their
    /// relative order with dense positions.
    pub async fn copy(pool: &PgPool, id: DbId) -> Result<Option<CategoryWithRules>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        let Some(source) = sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO categories (name, description, sort_order)
             VALUES ($1, $2, (SELECT COUNT(*)::int FROM categories))
             RETURNING {COLUMNS}"
        );
        let copy = sqlx::query_as::<_, Category>(&query)
            .bind(copy_name(&source.name))
            .bind(&source.description)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO category_rules (category_id, rule_id, sort_order)
             SELECT $2, rule_id, (ROW_NUMBER() OVER (ORDER BY sort_order, id) - 1)::int
             FROM category_rules
             WHERE category_id = $1",
        )
        .bind(id)
        .bind(copy.id)
        .execute(&mut *tx)
        .await?;

        let mut loaded = Self::load_with_rules(&mut tx, &[copy.id]).await?;
        tx.commit().await?;
        Ok(loaded.pop())
    }

    // ── Rule membership ──────────────────────────────────────────────

    /// List a category's rules in order.
    pub async fn list_rules(
        pool: &PgPool,
        category_id: DbId,
    ) -> Result<Vec<CategoryRuleEntry>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::entries_for(&mut conn, &[category_id]).await
    }

    /// Append a rule to a category at position `count`.
    pub async fn add_rule(pool: &PgPool, category_id: DbId, rule_id: DbId) -> DbResult<CategoryRule> {
        let mut tx = pool.begin().await?;

        Self::lock(&mut tx, category_id).await?;

        let rule_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM rules WHERE id = $1)")
            .bind(rule_id)
            .fetch_one(&mut *tx)
            .await?;
        if !rule_exists {
            return Err(CoreError::NotFound {
                entity: "Rule",
                id: rule_id,
            }
            .into());
        }

        let member_ids = Self::member_ids(&mut tx, category_id).await?;
        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM category_rules WHERE category_id = $1 AND rule_id = $2)",
        )
        .bind(category_id)
        .bind(rule_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(CoreError::Duplicate(format!(
                "Rule {rule_id} is already in category {category_id}"
            ))
            .into());
        }

        let query = format!(
            "INSERT INTO category_rules (category_id, rule_id, sort_order)
             VALUES ($1, $2, $3)
             RETURNING {MEMBER_COLUMNS}"
        );
        let member = sqlx::query_as::<_, CategoryRule>(&query)
            .bind(category_id)
            .bind(rule_id)
            .bind(member_ids.len() as i32)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Remove a membership row by its own ID and close the gap it leaves.
    pub async fn remove_rule(pool: &PgPool, category_rule_id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let category_id: Option<DbId> = sqlx::query_scalar(
            "DELETE FROM category_rules WHERE id = $1 RETURNING category_id",
        )
        .bind(category_rule_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(category_id) = category_id else {
            return Ok(false);
        };

        let remaining = Self::member_ids(&mut tx, category_id).await?;
        Self::write_dense_orders(&mut tx, &remaining).await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Reorder a category's rules. `category_rule_ids` must list every
    /// membership row of the category exactly once; each gets its index.
    pub async fn set_rule_order(
        pool: &PgPool,
        category_id: DbId,
        category_rule_ids: &[DbId],
    ) -> DbResult<Vec<CategoryRuleEntry>> {
        let mut tx = pool.begin().await?;

        Self::lock(&mut tx, category_id).await?;
        let existing = Self::member_ids(&mut tx, category_id).await?;
        ordering::validate_full_membership(category_rule_ids, &existing)?;

        Self::write_dense_orders(&mut tx, category_rule_ids).await?;
        let entries = Self::entries_for(&mut tx, &[category_id]).await?;

        tx.commit().await?;
        Ok(entries)
    }

    // ── Loading helpers ──────────────────────────────────────────────

    /// Load categories with their rules, preserving the order of `ids`.
    /// Unknown IDs are skipped.
    pub async fn load_with_rules(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<CategoryWithRules>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = ANY($1)");
        let categories = sqlx::query_as::<_, Category>(&query)
            .bind(ids)
            .fetch_all(&mut *conn)
            .await?;

        let mut rules_by_category: HashMap<DbId, Vec<CategoryRuleEntry>> = HashMap::new();
        for entry in Self::entries_for(conn, ids).await? {
            rules_by_category
                .entry(entry.category_id)
                .or_default()
                .push(entry);
        }

        let mut by_id: HashMap<DbId, Category> =
            categories.into_iter().map(|c| (c.id, c)).collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|category| CategoryWithRules {
                rules: rules_by_category.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }

    /// Membership rows joined with their rules, ordered within each category.
    async fn entries_for(
        conn: &mut PgConnection,
        category_ids: &[DbId],
    ) -> Result<Vec<CategoryRuleEntry>, sqlx::Error> {
        let query = format!(
            "SELECT cr.id AS category_rule_id, cr.category_id, cr.sort_order, {}
             FROM category_rules cr
             JOIN rules r ON r.id = cr.rule_id
             WHERE cr.category_id = ANY($1)
             ORDER BY cr.category_id, cr.sort_order, cr.id",
            rule_repo::JOINED_COLUMNS
        );
        sqlx::query_as::<_, CategoryRuleEntry>(&query)
            .bind(category_ids)
            .fetch_all(&mut *conn)
            .await
    }

    /// Lock a category row, failing with `NotFound` if it does not exist.
    async fn lock(conn: &mut PgConnection, id: DbId) -> DbResult<Category> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1 FOR UPDATE");
        let category = sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Category",
                id,
            })?;
        Ok(category)
    }

    /// Membership row IDs of a category in their current order.
    async fn member_ids(conn: &mut PgConnection, category_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM category_rules WHERE category_id = $1 ORDER BY sort_order, id",
        )
        .bind(category_id)
        .fetch_all(&mut *conn)
        .await
    }

    async fn write_dense_orders(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        for (id, sort_order) in ordering::dense_orders(ids) {
            sqlx::query("UPDATE category_rules SET sort_order = $2 WHERE id = $1")
                .bind(id)
                .bind(sort_order)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}
