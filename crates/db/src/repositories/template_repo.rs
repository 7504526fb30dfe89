//! Repository for the `templates` and `template_categories` tables.

use std::collections::{HashMap, HashSet};

use rulekeeper_core::error::CoreError;
use rulekeeper_core::naming::copy_name;
use rulekeeper_core::ordering::{self, ReorderDirection};
use rulekeeper_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::DbResult;
use crate::models::template::{
    CreateTemplate, PresetFanoutResult, Template, TemplateCategory, TemplateCategoryDetail,
    TemplateCategoryRow, TemplateSummary, TemplateTree, UpdateTemplate,
};
use crate::repositories::CategoryRepo;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, name, description, has_snapshots, last_generated_at, \
    outdated_count, created_at, updated_at";

/// Column list for the `template_categories` join table.
const MEMBER_COLUMNS: &str = "id, template_id, category_id, sort_order, from_preset_id, created_at";

/// Provides CRUD, composition and ordering operations for templates.
pub struct TemplateRepo;

impl TemplateRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert a new template with no categories and no snapshots.
    pub async fn create(pool: &PgPool, input: &CreateTemplate) -> Result<Template, sqlx::Error> {
        let query = format!(
            "INSERT INTO templates (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a template by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all templates, newest first, with category and rule counts.
    pub async fn list_summaries(pool: &PgPool) -> Result<Vec<TemplateSummary>, sqlx::Error> {
        sqlx::query_as::<_, TemplateSummary>(
            "SELECT t.id, t.name, t.description, t.has_snapshots, t.last_generated_at,
                    t.outdated_count, t.created_at, t.updated_at,
                    (SELECT COUNT(*) FROM template_categories tc
                     WHERE tc.template_id = t.id) AS category_count,
                    (SELECT COUNT(*) FROM template_categories tc
                     JOIN category_rules cr ON cr.category_id = tc.category_id
                     WHERE tc.template_id = t.id) AS rule_count
             FROM templates t
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Update a template. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<Template>, sqlx::Error> {
        let query = format!(
            "UPDATE templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Delete a template. Memberships and snapshots cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Duplicate a template's name, description and category list.
    ///
    /// Memberships keep their order and preset provenance. Snapshot state
    /// is not copied: the copy starts ungenerated.
    pub async fn copy(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        let Some(source) = sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO templates (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        let copy = sqlx::query_as::<_, Template>(&query)
            .bind(copy_name(&source.name))
            .bind(&source.description)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO template_categories (template_id, category_id, sort_order, from_preset_id)
             SELECT $2, category_id, sort_order, from_preset_id
             FROM template_categories
             WHERE template_id = $1",
        )
        .bind(id)
        .bind(copy.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(copy))
    }

    // ── Tree loading ─────────────────────────────────────────────────

    /// Load a template with its full category -> rule tree.
    pub async fn find_tree(pool: &PgPool, id: DbId) -> Result<Option<TemplateTree>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        let Some(template) = sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };
        Self::load_tree(&mut conn, template).await.map(Some)
    }

    /// Assemble the tree under an already loaded template.
    pub async fn load_tree(
        conn: &mut PgConnection,
        template: Template,
    ) -> Result<TemplateTree, sqlx::Error> {
        let rows = sqlx::query_as::<_, TemplateCategoryRow>(
            "SELECT tc.id, tc.template_id, tc.category_id, tc.sort_order, tc.from_preset_id,
                    tc.created_at, p.name AS preset_name
             FROM template_categories tc
             LEFT JOIN category_presets p ON p.id = tc.from_preset_id
             WHERE tc.template_id = $1
             ORDER BY tc.sort_order, tc.id",
        )
        .bind(template.id)
        .fetch_all(&mut *conn)
        .await?;

        let category_ids: Vec<DbId> = rows.iter().map(|r| r.membership.category_id).collect();
        let mut categories: HashMap<DbId, _> = CategoryRepo::load_with_rules(conn, &category_ids)
            .await?
            .into_iter()
            .map(|c| (c.category.id, c))
            .collect();

        let categories = rows
            .into_iter()
            .filter_map(|row| {
                let category = categories.remove(&row.membership.category_id)?;
                Some(TemplateCategoryDetail {
                    membership: row.membership,
                    preset_name: row.preset_name,
                    category,
                })
            })
            .collect();

        Ok(TemplateTree {
            template,
            categories,
        })
    }

    /// Lock a template row for the rest of the caller's transaction.
    pub async fn lock(conn: &mut PgConnection, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    // ── Category membership ──────────────────────────────────────────

    /// List a template's membership rows in order.
    pub async fn list_memberships(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<TemplateCategory>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM template_categories
             WHERE template_id = $1
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, TemplateCategory>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }

    /// Append a category to a template at `max + 1`, with no preset provenance.
    pub async fn add_category(
        pool: &PgPool,
        template_id: DbId,
        category_id: DbId,
    ) -> DbResult<TemplateCategory> {
        let mut tx = pool.begin().await?;

        Self::lock_existing(&mut tx, template_id).await?;

        let category_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(category_id)
                .fetch_one(&mut *tx)
                .await?;
        if !category_exists {
            return Err(CoreError::NotFound {
                entity: "Category",
                id: category_id,
            }
            .into());
        }

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM template_categories
                           WHERE template_id = $1 AND category_id = $2)",
        )
        .bind(template_id)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(CoreError::Duplicate(format!(
                "Category {category_id} is already in template {template_id}"
            ))
            .into());
        }

        let max_order = Self::max_order(&mut tx, template_id).await?;
        let query = format!(
            "INSERT INTO template_categories (template_id, category_id, sort_order)
             VALUES ($1, $2, $3)
             RETURNING {MEMBER_COLUMNS}"
        );
        let member = sqlx::query_as::<_, TemplateCategory>(&query)
            .bind(template_id)
            .bind(category_id)
            .bind(ordering::next_append_order(max_order))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(member)
    }

    /// Remove a category from a template. Other members keep their orders
    /// and the category's snapshots in this template are retained.
    pub async fn remove_category(
        pool: &PgPool,
        template_id: DbId,
        category_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM template_categories WHERE template_id = $1 AND category_id = $2",
        )
        .bind(template_id)
        .bind(category_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Swap a category with its neighbour at exactly `order - 1` (up) or
    /// `order + 1` (down).
    ///
    /// A gap in the sequence reads as a boundary. Returns the template's
    /// memberships in their new order.
    pub async fn swap_adjacent(
        pool: &PgPool,
        template_id: DbId,
        category_id: DbId,
        direction: ReorderDirection,
    ) -> DbResult<Vec<TemplateCategory>> {
        let mut tx = pool.begin().await?;

        Self::lock_existing(&mut tx, template_id).await?;

        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM template_categories
             WHERE template_id = $1
             ORDER BY sort_order, id
             FOR UPDATE"
        );
        let members = sqlx::query_as::<_, TemplateCategory>(&query)
            .bind(template_id)
            .fetch_all(&mut *tx)
            .await?;

        let current = members
            .iter()
            .find(|m| m.category_id == category_id)
            .ok_or(CoreError::NotFound {
                entity: "TemplateCategory",
                id: category_id,
            })?;
        let target_order = direction.neighbour_order(current.sort_order);
        let neighbour = members
            .iter()
            .find(|m| m.sort_order == target_order)
            .ok_or_else(|| direction.boundary_error())?;

        for (id, sort_order) in [
            (current.id, neighbour.sort_order),
            (neighbour.id, current.sort_order),
        ] {
            sqlx::query("UPDATE template_categories SET sort_order = $2 WHERE id = $1")
                .bind(id)
                .bind(sort_order)
                .execute(&mut *tx)
                .await?;
        }

        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM template_categories
             WHERE template_id = $1
             ORDER BY sort_order, id"
        );
        let reordered = sqlx::query_as::<_, TemplateCategory>(&query)
            .bind(template_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(reordered)
    }

    /// Append every category of a preset that the template does not hold
    /// yet, tagged with the preset as provenance.
    ///
    /// Fails with [`CoreError::EmptyResult`] when there is nothing new.
    pub async fn apply_preset(
        pool: &PgPool,
        template_id: DbId,
        preset_id: DbId,
    ) -> DbResult<PresetFanoutResult> {
        let mut tx = pool.begin().await?;

        Self::lock_existing(&mut tx, template_id).await?;

        let preset_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM category_presets WHERE id = $1)")
                .bind(preset_id)
                .fetch_one(&mut *tx)
                .await?;
        if !preset_exists {
            return Err(CoreError::NotFound {
                entity: "CategoryPreset",
                id: preset_id,
            }
            .into());
        }

        let preset_categories: Vec<DbId> = sqlx::query_scalar(
            "SELECT category_id FROM category_preset_items
             WHERE preset_id = $1
             ORDER BY sort_order, id",
        )
        .bind(preset_id)
        .fetch_all(&mut *tx)
        .await?;

        let existing: HashSet<DbId> = sqlx::query_scalar::<_, DbId>(
            "SELECT category_id FROM template_categories WHERE template_id = $1",
        )
        .bind(template_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        let max_order = Self::max_order(&mut tx, template_id).await?;
        let plan = ordering::plan_preset_fanout(max_order, &preset_categories, &existing)?;

        for (category_id, sort_order) in &plan.inserts {
            sqlx::query(
                "INSERT INTO template_categories
                    (template_id, category_id, sort_order, from_preset_id)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(template_id)
            .bind(category_id)
            .bind(sort_order)
            .bind(preset_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(PresetFanoutResult {
            added: plan.inserts.len(),
            skipped: plan.skipped,
        })
    }

    // ── Internal helpers ─────────────────────────────────────────────

    async fn lock_existing(conn: &mut PgConnection, id: DbId) -> DbResult<Template> {
        let template = Self::lock(conn, id).await?.ok_or(CoreError::NotFound {
            entity: "Template",
            id,
        })?;
        Ok(template)
    }

    async fn max_order(conn: &mut PgConnection, template_id: DbId) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT MAX(sort_order) FROM template_categories WHERE template_id = $1")
            .bind(template_id)
            .fetch_one(&mut *conn)
            .await
    }
}
