//! Content loading - files on disk into the content database / 内容加载
//!
//! Each content type has one loader. A loader's [`ContentLoader::load`] runs in a
//! single transaction: either every entity of that type is written, or none is.

pub mod chapters;
pub mod glossary;
pub mod interactives;
pub mod markdown;
pub mod resolver;
pub mod thumbnail;
pub mod translations;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;

pub use chapters::{Chapter, ChapterSection, ChaptersLoader};
pub use glossary::{GlossaryTerm, GlossaryTermsLoader};
pub use interactives::{Interactive, InteractivesLoader};
pub use resolver::TranslationResolver;
pub use translations::{Languages, Translations};

use crate::error::Result;

/// Outcome of one loader run / 加载结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub created: usize,
    pub updated: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated
    }

    /// Count one entity and return the verb for its log line
    pub(crate) fn record(&mut self, created: bool) -> &'static str {
        if created {
            self.created += 1;
            "Created"
        } else {
            self.updated += 1;
            "Updated"
        }
    }
}

#[async_trait]
pub trait ContentLoader: Send + Sync {
    /// Plural name used in log lines, e.g. "glossary terms"
    fn name(&self) -> &'static str;

    /// Write every entity of this type through an open transaction.
    async fn load_into(&self, conn: &mut SqliteConnection) -> Result<LoadSummary>;

    /// Load all entities of this type atomically / 原子加载
    async fn load(&self, pool: &SqlitePool) -> Result<LoadSummary> {
        let mut tx = pool.begin().await?;

        match self.load_into(&mut *tx).await {
            Ok(summary) => {
                tx.commit().await?;
                tracing::info!("{} {} loaded!", summary.total(), self.name());
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Rollback of {} failed: {}", self.name(), rollback_err);
                }
                tracing::error!("Loading {} aborted: {}", self.name(), e);
                Err(e)
            }
        }
    }
}

/// Run every loader, chapters first / 运行全部加载器
///
/// Loaders are independent: a failure stops the run, but types already loaded stay committed.
pub async fn load_all(
    pool: &SqlitePool,
    content_dir: &Path,
    languages: &Languages,
) -> Result<Vec<(&'static str, LoadSummary)>> {
    let loaders: Vec<Box<dyn ContentLoader>> = vec![
        Box::new(ChaptersLoader::new(content_dir, languages.clone())),
        Box::new(InteractivesLoader::new(content_dir, languages.clone())),
        Box::new(GlossaryTermsLoader::new(content_dir, languages.clone())),
    ];

    let mut results = Vec::with_capacity(loaders.len());
    for loader in &loaders {
        let summary = loader.load(pool).await?;
        results.push((loader.name(), summary));
    }
    Ok(results)
}

/// Timestamp for created_at / updated_at columns
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Append an optional registry filter and an ordering clause to a SELECT.
pub(crate) fn filtered_query(select: &str, filter: Option<&str>, order_by: &str) -> String {
    let mut sql = select.to_string();
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(order_by);
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{languages, memory_pool, write_file};

    #[test]
    fn test_filtered_query() {
        assert_eq!(
            filtered_query("SELECT id FROM interactives", Some("is_interactive = 1"), "slug"),
            "SELECT id FROM interactives WHERE is_interactive = 1 ORDER BY slug"
        );
        assert_eq!(filtered_query("SELECT id FROM chapters", None, "number"), "SELECT id FROM chapters ORDER BY number");
    }

    #[tokio::test]
    async fn test_load_all_runs_every_loader() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(root, "chapters/structure/chapters.yaml", "algorithms:\n  chapter-number: 1\n");
        write_file(root, "chapters/en/algorithms/algorithms.md", "# Algorithms\n\nIntro.\n");
        write_file(root, "interactives/structure/interactives.yaml", "sorting:\n  languages:\n    en: sorting.html\n");
        write_file(root, "interactives/en/interactives.yaml", "sorting:\n  name: Sorting\n");
        write_file(root, "glossary/en/bit.md", "# Bit\n\nBinary digit.\n");

        let pool = memory_pool().await;
        let results = load_all(&pool, root, &languages()).await.unwrap();

        let names: Vec<_> = results.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["chapters", "interactives", "glossary terms"]);
        assert!(results.iter().all(|(_, summary)| summary.created == 1));
    }
}
