//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Multi-step operations open their
//! own transaction; helpers that must join a caller's transaction take
//! `&mut sqlx::Transaction` or `&mut PgConnection` instead.

pub mod category_repo;
pub mod preset_repo;
pub mod rule_repo;
pub mod snapshot_repo;
pub mod stats_repo;
pub mod template_repo;

pub use category_repo::CategoryRepo;
pub use preset_repo::PresetRepo;
pub use rule_repo::RuleRepo;
pub use snapshot_repo::SnapshotRepo;
pub use stats_repo::StatsRepo;
pub use template_repo::TemplateRepo;
