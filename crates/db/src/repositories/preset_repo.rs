//! Repository for the `category_presets` and `category_preset_items` tables.

use std::collections::HashMap;

use rulekeeper_core::error::CoreError;
use rulekeeper_core::naming::copy_name;
use rulekeeper_core::ordering;
use rulekeeper_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::DbResult;
use crate::models::preset::{
    CategoryPreset, CategoryPresetItem, CreatePreset, PresetItemWithCategory, PresetPreview,
    PresetWithItems, UpdatePreset,
};
use crate::repositories::CategoryRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Column list for the `category_preset_items` join table.
const ITEM_COLUMNS: &str = "id, preset_id, category_id, sort_order, created_at";

/// Provides CRUD and category-membership operations for presets.
pub struct PresetRepo;

impl PresetRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert a new, empty preset.
    pub async fn create(pool: &PgPool, input: &CreatePreset) -> Result<CategoryPreset, sqlx::Error> {
        let query = format!(
            "INSERT INTO category_presets (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CategoryPreset>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a preset by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<CategoryPreset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM category_presets WHERE id = $1");
        sqlx::query_as::<_, CategoryPreset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a preset with its ordered categories and their rules.
    pub async fn find_with_items(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PresetWithItems>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let query = format!("SELECT {COLUMNS} FROM category_presets WHERE id = $1");
        let Some(preset) = sqlx::query_as::<_, CategoryPreset>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };
        Self::load_items(&mut conn, preset).await.map(Some)
    }

    /// List all presets, newest first, each with its ordered categories.
    pub async fn list_with_items(pool: &PgPool) -> Result<Vec<PresetWithItems>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM category_presets ORDER BY created_at DESC, id DESC"
        );
        let presets = sqlx::query_as::<_, CategoryPreset>(&query)
            .fetch_all(&mut *conn)
            .await?;

        let mut loaded = Vec::with_capacity(presets.len());
        for preset in presets {
            loaded.push(Self::load_items(&mut conn, preset).await?);
        }
        Ok(loaded)
    }

    /// Update a preset. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePreset,
    ) -> Result<Option<CategoryPreset>, sqlx::Error> {
        let query = format!(
            "UPDATE category_presets SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CategoryPreset>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Delete a preset. Its items cascade; templates keep the categories it
    /// contributed but lose the provenance link.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM category_presets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Duplicate a preset under `"<name> (copy)"`, keeping item orders.
    pub async fn copy(pool: &PgPool, id: DbId) -> Result<Option<PresetWithItems>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM category_presets WHERE id = $1");
        let Some(source) = sqlx::query_as::<_, CategoryPreset>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO category_presets (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        let copy = sqlx::query_as::<_, CategoryPreset>(&query)
            .bind(copy_name(&source.name))
            .bind(&source.description)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO category_preset_items (preset_id, category_id, sort_order)
             SELECT $2, category_id, sort_order
             FROM category_preset_items
             WHERE preset_id = $1",
        )
        .bind(id)
        .bind(copy.id)
        .execute(&mut *tx)
        .await?;

        let loaded = Self::load_items(&mut tx, copy).await?;
        tx.commit().await?;
        Ok(Some(loaded))
    }

    /// Every rule a preset would bring into a template, tagged with its
    /// category name.
    pub async fn preview(pool: &PgPool, id: DbId) -> Result<Option<PresetPreview>, sqlx::Error> {
        Ok(Self::find_with_items(pool, id)
            .await?
            .map(PresetPreview::from_preset))
    }

    // ── Category membership ──────────────────────────────────────────

    /// Append a category to a preset at `max + 1`.
    pub async fn add_category(
        pool: &PgPool,
        preset_id: DbId,
        category_id: DbId,
    ) -> DbResult<CategoryPresetItem> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM category_presets WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, CategoryPreset>(&query)
            .bind(preset_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "CategoryPreset",
                id: preset_id,
            })?;

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
            "SELECT EXISTS(SELECT 1 FROM category_preset_items
                           WHERE preset_id = $1 AND category_id = $2)",
        )
        .bind(preset_id)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(CoreError::Duplicate(format!(
                "Category {category_id} is already in preset {preset_id}"
            ))
            .into());
        }

        let max_order: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(sort_order) FROM category_preset_items WHERE preset_id = $1",
        )
        .bind(preset_id)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO category_preset_items (preset_id, category_id, sort_order)
             VALUES ($1, $2, $3)
             RETURNING {ITEM_COLUMNS}"
        );
        let item = sqlx::query_as::<_, CategoryPresetItem>(&query)
            .bind(preset_id)
            .bind(category_id)
            .bind(ordering::next_append_order(max_order))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Remove a category from a preset. Remaining items keep their orders.
    pub async fn remove_category(
        pool: &PgPool,
        preset_id: DbId,
        category_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM category_preset_items WHERE preset_id = $1 AND category_id = $2",
        )
        .bind(preset_id)
        .bind(category_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Internal helpers ─────────────────────────────────────────────

    async fn load_items(
        conn: &mut PgConnection,
        preset: CategoryPreset,
    ) -> Result<PresetWithItems, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM category_preset_items
             WHERE preset_id = $1
             ORDER BY sort_order, id"
        );
        let items = sqlx::query_as::<_, CategoryPresetItem>(&query)
            .bind(preset.id)
            .fetch_all(&mut *conn)
            .await?;

        let category_ids: Vec<DbId> = items.iter().map(|i| i.category_id).collect();
        let mut categories: HashMap<DbId, _> = CategoryRepo::load_with_rules(conn, &category_ids)
            .await?
            .into_iter()
            .map(|c| (c.category.id, c))
            .collect();

        let items = items
            .into_iter()
            .filter_map(|item| {
                Some(PresetItemWithCategory {
                    id: item.id,
                    sort_order: item.sort_order,
                    category: categories.remove(&item.category_id)?,
                })
            })
            .collect();

        Ok(PresetWithItems { preset, items })
    }
}
