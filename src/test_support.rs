//! Shared fixtures for unit tests / 测试辅助

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

use crate::content::Languages;
use crate::db;

/// In-memory database with the content schema.
///
/// A single connection that never expires, since every new in-memory
/// connection would open an empty database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// Write a file below `base`, creating parent directories
pub fn write_file(base: &Path, relative: &str, content: &str) {
    let path = base.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn languages() -> Languages {
    Languages::new(vec!["en".to_string(), "de".to_string()], "en")
}
