//! Integration tests for snapshot generation, staleness detection and
//! resolution.
//!
//! Every test checks the outdated counter against the actual number of
//! outdated snapshot rows after the operation under test.

use assert_matches::assert_matches;
use rulekeeper_core::error::CoreError;
use rulekeeper_core::rule::{Priority, RuleContent};
use rulekeeper_core::snapshot::SnapshotAction;
use rulekeeper_core::types::DbId;
use rulekeeper_db::models::category::CreateCategory;
use rulekeeper_db::models::rule::{Rule, RuleInput};
use rulekeeper_db::models::template::CreateTemplate;
use rulekeeper_db::repositories::{CategoryRepo, RuleRepo, SnapshotRepo, TemplateRepo};
use rulekeeper_db::DbError;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn rule_input(name: &str, title: &str) -> RuleInput {
    RuleInput {
        name: name.to_string(),
        description: None,
        title: title.to_string(),
        priority: Priority::Warning,
        allowed: false,
        description_detail: "Bindings that never change should be const".to_string(),
        example_bad: Some("let x = 1;".to_string()),
        example_good: Some("const X: i32 = 1;".to_string()),
        violation_action: None,
        notes: None,
    }
}

fn retitled(rule: &Rule, title: &str) -> RuleInput {
    let mut input = RuleInput::copy_of(rule, rule.name.clone());
    input.title = title.to_string();
    input
}

/// A generated template holding one category with one rule.
struct Fixture {
    rule: Rule,
    category_id: DbId,
    template_id: DbId,
}

async fn generated_fixture(pool: &PgPool) -> Fixture {
    let rule = RuleRepo::create(pool, &rule_input("const-rule", "Use const"))
        .await
        .unwrap();
    let category = CategoryRepo::create(
        pool,
        &CreateCategory {
            name: "Style".to_string(),
            description: None,
            sort_order: None,
        },
    )
    .await
    .unwrap();
    CategoryRepo::add_rule(pool, category.id, rule.id).await.unwrap();

    let template_id = new_template(pool, "T1").await;
    TemplateRepo::add_category(pool, template_id, category.id)
        .await
        .unwrap();
    SnapshotRepo::ensure_for_template(pool, template_id)
        .await
        .unwrap()
        .unwrap();

    Fixture {
        rule,
        category_id: category.id,
        template_id,
    }
}

async fn new_template(pool: &PgPool, name: &str) -> DbId {
    TemplateRepo::create(
        pool,
        &CreateTemplate {
            name: name.to_string(),
            description: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn outdated_count(pool: &PgPool, template_id: DbId) -> i32 {
    TemplateRepo::find_by_id(pool, template_id)
        .await
        .unwrap()
        .unwrap()
        .outdated_count
}

/// The denormalized counter must equal the number of outdated rows.
async fn assert_count_consistent(pool: &PgPool, template_id: DbId) {
    let actual: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM rule_snapshots WHERE template_id = $1 AND is_outdated",
    )
    .bind(template_id)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(
        i64::from(outdated_count(pool, template_id).await),
        actual,
        "outdated_count drifted for template {template_id}"
    );
}

async fn only_snapshot(pool: &PgPool, template_id: DbId) -> rulekeeper_db::models::snapshot::RuleSnapshot {
    let mut snapshots = SnapshotRepo::list_for_template(pool, template_id)
        .await
        .unwrap();
    assert_eq!(snapshots.len(), 1);
    snapshots.remove(0)
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn generate_freezes_current_content(pool: PgPool) {
    let f = generated_fixture(&pool).await;

    let snap = only_snapshot(&pool, f.template_id).await;
    assert_eq!(snap.base_rule_id, f.rule.id);
    assert_eq!(snap.category_id, f.category_id);
    assert_eq!(snap.snapshot_content.0, f.rule.content());
    assert!(!snap.is_outdated);
    assert!(!snap.is_custom);

    let template = TemplateRepo::find_by_id(&pool, f.template_id)
        .await
        .unwrap()
        .unwrap();
    assert!(template.has_snapshots);
    assert!(template.last_generated_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn generate_is_idempotent(pool: PgPool) {
    let f = generated_fixture(&pool).await;

    let again = SnapshotRepo::ensure_for_template(&pool, f.template_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.tree.categories.len(), 1);
    assert_eq!(
        SnapshotRepo::list_for_template(&pool, f.template_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn generate_picks_up_newly_added_rules(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    let second = RuleRepo::create(&pool, &rule_input("iter-rule", "Prefer iterators"))
        .await
        .unwrap();
    CategoryRepo::add_rule(&pool, f.category_id, second.id)
        .await
        .unwrap();

    let generated = SnapshotRepo::ensure_for_template(&pool, f.template_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(generated.created, 1);
    assert_eq!(generated.tree.categories[0].category.rules.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn generate_unknown_template_is_none(pool: PgPool) {
    let result = SnapshotRepo::ensure_for_template(&pool, 9999).await.unwrap();
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// Staleness detection
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn editing_rule_marks_snapshot_outdated(pool: PgPool) {
    let f = generated_fixture(&pool).await;

    let (updated, marked) = RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Always use const");
    assert_eq!(marked, 1);

    let snap = only_snapshot(&pool, f.template_id).await;
    assert!(snap.is_outdated);
    assert_eq!(snap.snapshot_content.0.title, "Use const");
    assert_eq!(outdated_count(&pool, f.template_id).await, 1);
    assert_count_consistent(&pool, f.template_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_edits_do_not_double_count(pool: PgPool) {
    let f = generated_fixture(&pool).await;

    RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap();
    let (_, marked) = RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Really use const"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(marked, 0);
    assert_eq!(outdated_count(&pool, f.template_id).await, 1);
    assert_count_consistent(&pool, f.template_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unchanged_content_does_not_mark(pool: PgPool) {
    let f = generated_fixture(&pool).await;

    // Catalogue metadata is not part of the frozen content.
    let mut input = RuleInput::copy_of(&f.rule, "renamed".to_string());
    input.description = Some("new description".to_string());
    let (_, marked) = RuleRepo::update(&pool, f.rule.id, &input)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(marked, 0);
    assert_eq!(outdated_count(&pool, f.template_id).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn edit_marks_snapshots_in_every_template(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    let t2 = new_template(&pool, "T2").await;
    TemplateRepo::add_category(&pool, t2, f.category_id)
        .await
        .unwrap();
    SnapshotRepo::ensure_for_template(&pool, t2).await.unwrap();

    let (_, marked) = RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(marked, 2);
    for template_id in [f.template_id, t2] {
        assert_eq!(outdated_count(&pool, template_id).await, 1);
        assert_count_consistent(&pool, template_id).await;
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_unknown_rule_is_none(pool: PgPool) {
    let result = RuleRepo::update(&pool, 9999, &rule_input("x", "y"))
        .await
        .unwrap();
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolve_update_takes_latest_content(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap();
    let snap = only_snapshot(&pool, f.template_id).await;

    let resolved = SnapshotRepo::resolve(&pool, snap.id, SnapshotAction::Update, None)
        .await
        .unwrap();

    assert_eq!(resolved.snapshot_content.0.title, "Always use const");
    assert!(!resolved.is_outdated);
    assert!(!resolved.is_custom);
    assert_eq!(outdated_count(&pool, f.template_id).await, 0);
    assert_count_consistent(&pool, f.template_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolve_keep_preserves_frozen_content(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap();
    let snap = only_snapshot(&pool, f.template_id).await;

    let resolved = SnapshotRepo::resolve(&pool, snap.id, SnapshotAction::Keep, None)
        .await
        .unwrap();

    assert_eq!(resolved.snapshot_content.0.title, "Use const");
    assert!(!resolved.is_outdated);
    assert_eq!(outdated_count(&pool, f.template_id).await, 0);
    assert_count_consistent(&pool, f.template_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn kept_snapshot_is_flagged_again_by_next_edit(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap();
    let snap = only_snapshot(&pool, f.template_id).await;
    SnapshotRepo::resolve(&pool, snap.id, SnapshotAction::Keep, None)
        .await
        .unwrap();

    let (_, marked) = RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Use const always"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(marked, 1);
    assert_eq!(outdated_count(&pool, f.template_id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolve_customize_makes_snapshot_immune(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap();
    let snap = only_snapshot(&pool, f.template_id).await;

    let custom = RuleContent {
        title: "Custom title".to_string(),
        ..snap.snapshot_content.0.clone()
    };
    let resolved = SnapshotRepo::resolve(&pool, snap.id, SnapshotAction::Customize, Some(custom))
        .await
        .unwrap();
    assert_eq!(resolved.snapshot_content.0.title, "Custom title");
    assert!(resolved.is_custom);
    assert!(!resolved.is_outdated);
    assert_eq!(outdated_count(&pool, f.template_id).await, 0);

    let (_, marked) = RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Yet another title"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marked, 0);
    let snap = only_snapshot(&pool, f.template_id).await;
    assert!(!snap.is_outdated);
    assert_eq!(outdated_count(&pool, f.template_id).await, 0);
    assert_count_consistent(&pool, f.template_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolving_fresh_snapshot_does_not_decrement(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    let snap = only_snapshot(&pool, f.template_id).await;

    SnapshotRepo::resolve(&pool, snap.id, SnapshotAction::Keep, None)
        .await
        .unwrap();
    SnapshotRepo::resolve(&pool, snap.id, SnapshotAction::Update, None)
        .await
        .unwrap();

    assert_eq!(outdated_count(&pool, f.template_id).await, 0);
    assert_count_consistent(&pool, f.template_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn customize_without_content_changes_nothing(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap();
    let snap = only_snapshot(&pool, f.template_id).await;

    let result = SnapshotRepo::resolve(&pool, snap.id, SnapshotAction::Customize, None).await;
    assert_matches!(result, Err(DbError::Core(CoreError::Validation(_))));

    let snap = only_snapshot(&pool, f.template_id).await;
    assert!(snap.is_outdated);
    assert_eq!(outdated_count(&pool, f.template_id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolve_unknown_snapshot_is_not_found(pool: PgPool) {
    let result = SnapshotRepo::resolve(&pool, 9999, SnapshotAction::Keep, None).await;
    assert_matches!(
        result,
        Err(DbError::Core(CoreError::NotFound {
            entity: "RuleSnapshot",
            id: 9999
        }))
    );
}

// ---------------------------------------------------------------------------
// Outdated listing and cascades
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn outdated_listing_shows_both_versions(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    assert!(SnapshotRepo::list_outdated(&pool, f.template_id)
        .await
        .unwrap()
        .is_empty());

    RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap();

    let outdated = SnapshotRepo::list_outdated(&pool, f.template_id)
        .await
        .unwrap();
    assert_eq!(outdated.len(), 1);
    assert_eq!(outdated[0].rule_id, f.rule.id);
    assert_eq!(outdated[0].rule_name, "const-rule");
    assert_eq!(outdated[0].category_name, "Style");
    assert_eq!(outdated[0].snapshot_content.title, "Use const");
    assert_eq!(outdated[0].current_content.title, "Always use const");
    assert_eq!(outdated[0].changed_fields, vec!["title"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_category_recounts_outdated(pool: PgPool) {
    let f = generated_fixture(&pool).await;
    RuleRepo::update(&pool, f.rule.id, &retitled(&f.rule, "Always use const"))
        .await
        .unwrap();
    assert_eq!(outdated_count(&pool, f.template_id).await, 1);

    assert!(CategoryRepo::delete(&pool, f.category_id).await.unwrap());

    assert_eq!(outdated_count(&pool, f.template_id).await, 0);
    assert_count_consistent(&pool, f.template_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn removing_template_category_keeps_snapshots(pool: PgPool) {
    let f = generated_fixture(&pool).await;

    assert!(TemplateRepo::remove_category(&pool, f.template_id, f.category_id)
        .await
        .unwrap());

    only_snapshot(&pool, f.template_id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rule_with_snapshots_cannot_be_deleted(pool: PgPool) {
    let f = generated_fixture(&pool).await;

    let result = RuleRepo::delete(&pool, f.rule.id).await;
    assert_matches!(result, Err(DbError::Core(CoreError::Conflict(_))));
    assert!(RuleRepo::find_by_id(&pool, f.rule.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_template_removes_its_snapshots(pool: PgPool) {
    let f = generated_fixture(&pool).await;

    assert!(TemplateRepo::delete(&pool, f.template_id).await.unwrap());

    assert!(SnapshotRepo::list_for_template(&pool, f.template_id)
        .await
        .unwrap()
        .is_empty());
    assert!(RuleRepo::delete(&pool, f.rule.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn generate_skips_pairs_that_already_have_a_snapshot(pool: PgPool) {
    let rule = RuleRepo::create(&pool, &rule_input("const-rule", "Use const"))
        .await
        .unwrap();
    let category = new_category(&pool, "Style").await;
    CategoryRepo::add_rule(&pool, category, rule.id).await.unwrap();
    let template_id = new_template(&pool, "T1").await;
    TemplateRepo::add_category(&pool, template_id, category)
        .await
        .unwrap();

    let mut frozen = rule.content();
    frozen.title = "Frozen earlier".to_string();
    sqlx::query(
        "INSERT INTO rule_snapshots (base_rule_id, template_id, category_id, snapshot_content)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(rule.id)
    .bind(template_id)
    .bind(category)
    .bind(sqlx::types::Json(&frozen))
    .execute(&pool)
    .await
    .unwrap();

    let generated = SnapshotRepo::ensure_for_template(&pool, template_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(generated.created, 0);
    assert!(generated.tree.template.has_snapshots);

    let snapshot = only_snapshot(&pool, template_id).await;
    assert_eq!(snapshot.snapshot_content.0.title, "Frozen earlier");
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

async fn new_category(pool: &PgPool, name: &str) -> DbId {
    CategoryRepo::create(
        pool,
        &CreateCategory {
            name: name.to_string(),
            description: None,
            sort_order: None,
        },
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_edits_sharing_templates_do_not_deadlock(pool: PgPool) {
    let first = RuleRepo::create(&pool, &rule_input("first", "First"))
        .await
        .unwrap();
    let second = RuleRepo::create(&pool, &rule_input("second", "Second"))
        .await
        .unwrap();
    let c1 = new_category(&pool, "C1").await;
    let c2 = new_category(&pool, "C2").await;
    CategoryRepo::add_rule(&pool, c1, first.id).await.unwrap();
    CategoryRepo::add_rule(&pool, c2, second.id).await.unwrap();

    let t1 = new_template(&pool, "T1").await;
    let t2 = new_template(&pool, "T2").await;

    // Snapshot ids end up as: first@T2, first@T1, second@T1, second@T2,
    // so the two rules reach the shared templates in opposite orders.
    TemplateRepo::add_category(&pool, t2, c1).await.unwrap();
    SnapshotRepo::ensure_for_template(&pool, t2).await.unwrap();
    TemplateRepo::add_category(&pool, t1, c1).await.unwrap();
    TemplateRepo::add_category(&pool, t1, c2).await.unwrap();
    SnapshotRepo::ensure_for_template(&pool, t1).await.unwrap();
    TemplateRepo::add_category(&pool, t2, c2).await.unwrap();
    SnapshotRepo::ensure_for_template(&pool, t2).await.unwrap();

    for round in 0..25 {
        sqlx::query("UPDATE rule_snapshots SET is_outdated = false")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE templates SET outdated_count = 0")
            .execute(&pool)
            .await
            .unwrap();

        let first_edit = retitled(&first, &format!("First v{round}"));
        let second_edit = retitled(&second, &format!("Second v{round}"));
        let (a, b) = tokio::join!(
            RuleRepo::update(&pool, first.id, &first_edit),
            RuleRepo::update(&pool, second.id, &second_edit),
        );

        let (_, marked_a) = a.expect("first edit failed").unwrap();
        let (_, marked_b) = b.expect("second edit failed").unwrap();
        assert_eq!((marked_a, marked_b), (2, 2), "round {round}");
        assert_eq!(outdated_count(&pool, t1).await, 2);
        assert_eq!(outdated_count(&pool, t2).await, 2);
        assert_count_consistent(&pool, t1).await;
        assert_count_consistent(&pool, t2).await;
    }
}
