//! Read-only usage statistics.

use sqlx::PgPool;

use crate::models::stats::{CategoryUsage, GlobalStats, RuleUsage};

/// Aggregate counts across the rule library.
pub struct StatsRepo;

impl StatsRepo {
    /// Row counts of every table.
    pub async fn global(pool: &PgPool) -> Result<GlobalStats, sqlx::Error> {
        sqlx::query_as::<_, GlobalStats>(
            "SELECT
                (SELECT COUNT(*) FROM rules) AS rules,
                (SELECT COUNT(*) FROM categories) AS categories,
                (SELECT COUNT(*) FROM category_presets) AS presets,
                (SELECT COUNT(*) FROM templates) AS templates,
                (SELECT COUNT(*) FROM category_rules) AS category_rules,
                (SELECT COUNT(*) FROM category_preset_items) AS preset_items,
                (SELECT COUNT(*) FROM template_categories) AS template_categories,
                (SELECT COUNT(*) FROM rule_snapshots) AS snapshots",
        )
        .fetch_one(pool)
        .await
    }

    /// Per-rule usage, most used first.
    pub async fn rule_usage(pool: &PgPool) -> Result<Vec<RuleUsage>, sqlx::Error> {
        sqlx::query_as::<_, RuleUsage>(
            "SELECT id, name, title, priority, created_at,
                    used_in_categories, used_in_snapshots,
                    used_in_categories + used_in_snapshots AS total_usage
             FROM (
                SELECT r.id, r.name, r.title, r.priority, r.created_at,
                       (SELECT COUNT(*) FROM category_rules cr
                        WHERE cr.rule_id = r.id) AS used_in_categories,
                       (SELECT COUNT(*) FROM rule_snapshots s
                        WHERE s.base_rule_id = r.id) AS used_in_snapshots
                FROM rules r
             ) counts
             ORDER BY total_usage DESC, id",
        )
        .fetch_all(pool)
        .await
    }

    /// Per-category usage, most used first.
    pub async fn category_usage(pool: &PgPool) -> Result<Vec<CategoryUsage>, sqlx::Error> {
        sqlx::query_as::<_, CategoryUsage>(
            "SELECT id, name, created_at, rules_count,
                    used_in_presets, used_in_templates, used_in_snapshots,
                    used_in_presets + used_in_templates + used_in_snapshots AS total_usage
             FROM (
                SELECT c.id, c.name, c.created_at,
                       (SELECT COUNT(*) FROM category_rules cr
                        WHERE cr.category_id = c.id) AS rules_count,
                       (SELECT COUNT(*) FROM category_preset_items pi
                        WHERE pi.category_id = c.id) AS used_in_presets,
                       (SELECT COUNT(*) FROM template_categories tc
                        WHERE tc.category_id = c.id) AS used_in_templates,
                       (SELECT COUNT(*) FROM rule_snapshots s
                        WHERE s.category_id = c.id) AS used_in_snapshots
                FROM categories c
             ) counts
             ORDER BY total_usage DESC, id",
        )
        .fetch_all(pool)
        .await
    }
}
