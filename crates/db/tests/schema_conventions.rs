use sqlx::PgPool;

/// All `id` columns must be bigint.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_pks_are_bigint(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, data_type
         FROM information_schema.columns
         WHERE column_name = 'id'
           AND table_schema = 'public'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, data_type) in &rows {
        assert_eq!(data_type, "bigint", "Table {table}.id should be bigint");
    }
}

/// Every table (except _sqlx_migrations) must have created_at and updated_at as timestamptz.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_tables_have_timestamps(pool: PgPool) {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name
         FROM information_schema.tables
         WHERE table_schema = 'public'
           AND table_type = 'BASE TABLE'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (table,) in &tables {
        for col in ["created_at", "updated_at"] {
            let result: Option<(String,)> = sqlx::query_as(&format!(
                "SELECT data_type
                 FROM information_schema.columns
                 WHERE table_schema = 'public'
                   AND table_name = '{table}'
                   AND column_name = '{col}'"
            ))
            .fetch_optional(&pool)
            .await
            .unwrap();

            let (data_type,) =
                result.unwrap_or_else(|| panic!("Table {table} is missing column {col}"));
            assert_eq!(
                data_type, "timestamp with time zone",
                "Table {table}.{col} should be timestamptz, got {data_type}"
            );
        }
    }
}

/// Every table with an updated_at column must keep it current via trigger.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_tables_have_updated_at_trigger(pool: PgPool) {
    let missing: Vec<(String,)> = sqlx::query_as(
        "SELECT c.table_name
         FROM information_schema.columns c
         WHERE c.table_schema = 'public'
           AND c.column_name = 'updated_at'
           AND NOT EXISTS (
               SELECT 1 FROM information_schema.triggers t
               WHERE t.event_object_schema = 'public'
                 AND t.event_object_table = c.table_name
                 AND t.action_statement LIKE '%trigger_set_updated_at%'
           )
         ORDER BY c.table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(missing.is_empty(), "Tables without updated_at trigger: {missing:?}");
}

/// No character varying columns should exist; TEXT is preferred.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_no_varchar_columns(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, column_name
         FROM information_schema.columns
         WHERE table_schema = 'public'
           AND data_type = 'character varying'
           AND table_name != '_sqlx_migrations'
         ORDER BY table_name, column_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(
        rows.is_empty(),
        "Found VARCHAR columns (should use TEXT): {:?}",
        rows
    );
}

/// Every foreign key column must lead some index.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_all_fks_have_indexes(pool: PgPool) {
    let fk_columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT
             tc.table_name,
             kcu.column_name
         FROM information_schema.table_constraints tc
         JOIN information_schema.key_column_usage kcu
             ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
         WHERE tc.constraint_type = 'FOREIGN KEY'
           AND tc.table_schema = 'public'
         ORDER BY tc.table_name, kcu.column_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (table, column) in &fk_columns {
        let has_index: (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS (
                SELECT 1
                FROM pg_indexes
                WHERE schemaname = 'public'
                  AND tablename = '{table}'
                  AND indexdef LIKE '%({column}%'
            )"
        ))
        .fetch_one(&pool)
        .await
        .unwrap();

        assert!(has_index.0, "FK column {table}.{column} has no index");
    }
}

/// Unique constraints must follow the `uq_` naming so the API can map
/// violations to 409.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unique_constraints_are_prefixed(pool: PgPool) {
    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT constraint_name
         FROM information_schema.table_constraints
         WHERE constraint_schema = 'public'
           AND constraint_type = 'UNIQUE'
         ORDER BY constraint_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(names.len(), 4);
    for (name,) in &names {
        assert!(name.starts_with("uq_"), "Unique constraint {name} should start with uq_");
    }
}

/// Rules referenced by snapshots must not be silently deleted.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_snapshot_rule_fk_restricts(pool: PgPool) {
    let (delete_rule,): (String,) = sqlx::query_as(
        "SELECT rc.delete_rule
         FROM information_schema.referential_constraints rc
         JOIN information_schema.key_column_usage kcu
             ON rc.constraint_name = kcu.constraint_name
             AND rc.constraint_schema = kcu.table_schema
         WHERE rc.constraint_schema = 'public'
           AND kcu.table_name = 'rule_snapshots'
           AND kcu.column_name = 'base_rule_id'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(delete_rule, "RESTRICT");
}
