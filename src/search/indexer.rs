//! 索引重建 - 清空后按注册表顺序重新索引
//!
//! Flow / 流程：
//! 1. 清空 search_items（不在事务中）
//! 2. 按注册表顺序：每个实例 × 每种语言 写入一行，order 计数器全局递增
//! 3. 写入 last_updated
//!
//! 任一步失败即中止，已清空的索引不会恢复。

use serde::Serialize;
use sqlx::SqlitePool;

use super::db_index::{NewSearchItem, SearchIndex};
use super::preview::PreviewRenderer;
use super::schema::{SearchClass, SEARCH_CLASSES};
use super::vector::SearchVector;
use super::{Indexable, ObjectType};
use crate::content::{Chapter, ChapterSection, GlossaryTerm, Interactive, Languages};
use crate::error::Result;

/// 重建结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    /// Rows removed by the wipe
    pub removed: u64,
    pub instances: usize,
    pub rows: usize,
}

pub struct SearchIndexer {
    pool: SqlitePool,
    index: SearchIndex,
    languages: Languages,
    renderer: PreviewRenderer,
    registry: &'static [SearchClass],
}

impl SearchIndexer {
    pub fn new(pool: SqlitePool, languages: Languages, renderer: PreviewRenderer) -> Self {
        Self {
            index: SearchIndex::new(pool.clone()),
            pool,
            languages,
            renderer,
            registry: SEARCH_CLASSES,
        }
    }

    /// Replace the model registry / 替换模型注册表
    pub fn with_registry(mut self, registry: &'static [SearchClass]) -> Self {
        self.registry = registry;
        self
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Wipe the index and re-index every registered model / 全量重建
    pub async fn rebuild(&self) -> Result<RebuildSummary> {
        let removed = self.index.clear().await?;
        tracing::info!("Search index cleared ({} rows removed)", removed);

        let mut summary = RebuildSummary {
            removed,
            ..Default::default()
        };
        let mut order: i64 = 0;

        for class in self.registry {
            let instances = self.fetch_instances(class).await?;
            tracing::debug!("Indexing {} {} instances", instances.len(), class.object_type);

            for instance in &instances {
                for language in self.languages.codes() {
                    order += 1;
                    let vector: SearchVector = instance
                        .index_contents(language)
                        .into_iter()
                        .map(|(weight, text)| SearchVector::new(&text, weight))
                        .collect();
                    let preview = self
                        .renderer
                        .render(instance.object_type(), &instance.preview_context(language))?;

                    let item = NewSearchItem {
                        object_type: instance.object_type(),
                        object_id: instance.object_id(),
                        language,
                        boost: class.boost,
                        result_preview: &preview,
                        order,
                    };
                    self.index.insert(&item, &vector).await?;
                    summary.rows += 1;
                }
                summary.instances += 1;
                tracing::info!(
                    "Indexed {} for languages {}.",
                    instance,
                    self.languages.codes().join(", ")
                );
            }
        }

        self.index.set_last_updated().await?;
        tracing::info!(
            "Search index rebuilt: {} instances, {} rows",
            summary.instances,
            summary.rows
        );
        Ok(summary)
    }

    async fn fetch_instances(&self, class: &SearchClass) -> Result<Vec<Box<dyn Indexable>>> {
        let pool = &self.pool;
        let languages = &self.languages;
        let filter = class.filter;

        Ok(match class.object_type {
            ObjectType::Chapter => boxed(Chapter::fetch_all(pool, languages, filter).await?),
            ObjectType::ChapterSection => boxed(ChapterSection::fetch_all(pool, languages, filter).await?),
            ObjectType::Interactive => boxed(Interactive::fetch_all(pool, languages, filter).await?),
            ObjectType::GlossaryTerm => boxed(GlossaryTerm::fetch_all(pool, languages, filter).await?),
        })
    }
}

fn boxed<T: Indexable + 'static>(items: Vec<T>) -> Vec<Box<dyn Indexable>> {
    items
        .into_iter()
        .map(|item| Box::new(item) as Box<dyn Indexable>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{load_all, ContentLoader, GlossaryTermsLoader};
    use crate::test_support::{languages, memory_pool, write_file};
    use std::path::Path;

    fn write_content(root: &Path) {
        write_file(
            root,
            "chapters/structure/chapters.yaml",
            "algorithms:\n  chapter-number: 1\n  sections:\n    - sorting\n",
        );
        write_file(root, "chapters/en/algorithms/algorithms.md", "# Algorithms\n\nStep by step.\n");
        write_file(root, "chapters/en/algorithms/sections/sorting.md", "# Sorting\n\nPut cards in order.\n");
        write_file(
            root,
            "interactives/structure/interactives.yaml",
            "sorting-boxes:\n  languages:\n    en: sorting-boxes.html\nbinary-viewer:\n  is_interactive: false\n",
        );
        write_file(
            root,
            "interactives/en/interactives.yaml",
            "sorting-boxes:\n  name: Sorting Boxes\nbinary-viewer:\n  name: Binary Viewer\n",
        );
        write_file(root, "glossary/en/algorithm.md", "# Algorithm\n\nA step by step process.\n");
        write_file(root, "glossary/de/algorithm.md", "# Algorithmus\n\nEin Verfahren.\n");
        write_file(root, "glossary/en/bit.md", "# Bit\n\nA <strong>binary</strong> digit.\n");
    }

    async fn loaded_pool(root: &Path) -> SqlitePool {
        let pool = memory_pool().await;
        SearchIndex::new(pool.clone()).init().await.unwrap();
        load_all(&pool, root, &languages()).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_rebuild_indexes_every_instance_per_language() {
        let dir = tempfile::tempdir().unwrap();
        write_content(dir.path());
        let pool = loaded_pool(dir.path()).await;

        let indexer = SearchIndexer::new(pool, languages(), PreviewRenderer::embedded());
        let summary = indexer.rebuild().await.unwrap();

        // chapter, section, one interactive (filtered), two glossary terms; two languages each
        assert_eq!(summary.instances, 5);
        assert_eq!(summary.rows, 10);

        let items = indexer.index().items().await.unwrap();
        assert_eq!(items.len(), 10);
        let orders: Vec<i64> = items.iter().map(|i| i.order).collect();
        assert_eq!(orders, (1..=10).collect::<Vec<_>>());

        let sequence: Vec<(&str, &str)> = items
            .iter()
            .map(|i| (i.object_type.as_str(), i.language.as_str()))
            .collect();
        assert_eq!(
            sequence,
            vec![
                ("chapter", "en"),
                ("chapter", "de"),
                ("chapter_section", "en"),
                ("chapter_section", "de"),
                ("interactive", "en"),
                ("interactive", "de"),
                ("glossary_term", "en"),
                ("glossary_term", "de"),
                ("glossary_term", "en"),
                ("glossary_term", "de"),
            ]
        );
        assert!(items.iter().all(|i| !i.result_preview.contains("Binary Viewer")));
        assert!(items[0].search_vector.contains("'algorithms':1A"));
        assert_eq!(items[4].boost, 1.3);
    }

    #[tokio::test]
    async fn test_rebuild_renders_language_previews() {
        let dir = tempfile::tempdir().unwrap();
        write_content(dir.path());
        let pool = loaded_pool(dir.path()).await;

        let indexer = SearchIndexer::new(pool, languages(), PreviewRenderer::embedded());
        indexer.rebuild().await.unwrap();

        let hits = indexer.index().search("algorithmus", "de", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object_type, "glossary_term");
        assert!(hits[0].result_preview.contains("<h5>Algorithmus</h5>"));

        let hits = indexer.index().search("binary", "en", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].result_preview.contains("<strong>binary</strong>"));

        let hits = indexer.index().search("sorting", "de", 10).await.unwrap();
        assert!(hits.iter().any(|h| h.result_preview.contains("/de/interactives/sorting-boxes/")));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_content(dir.path());
        let pool = loaded_pool(dir.path()).await;

        let indexer = SearchIndexer::new(pool, languages(), PreviewRenderer::embedded());
        indexer.rebuild().await.unwrap();
        let second = indexer.rebuild().await.unwrap();

        assert_eq!(second.removed, 10);
        assert_eq!(indexer.index().get_stats().await.item_count, 10);
        assert!(indexer.index().get_last_updated().await.is_some());
    }

    #[tokio::test]
    async fn test_missing_template_aborts_with_index_wiped() {
        let dir = tempfile::tempdir().unwrap();
        write_content(dir.path());
        let pool = loaded_pool(dir.path()).await;

        // seed the index with a successful run first
        let indexer = SearchIndexer::new(pool.clone(), languages(), PreviewRenderer::embedded());
        indexer.rebuild().await.unwrap();

        // glossary terms only, with a template directory lacking glossary_term.html
        static GLOSSARY_ONLY: &[SearchClass] = &[SearchClass {
            object_type: ObjectType::GlossaryTerm,
            filter: None,
            boost: 1.0,
        }];
        let templates = tempfile::tempdir().unwrap();
        write_file(templates.path(), "chapter.html", "<p>{{ name }}</p>");
        let broken = SearchIndexer::new(pool, languages(), PreviewRenderer::from_dir(templates.path()))
            .with_registry(GLOSSARY_ONLY);

        assert!(broken.rebuild().await.is_err());
        assert_eq!(broken.index().get_stats().await.item_count, 0);
    }

    #[tokio::test]
    async fn test_rebuild_with_empty_content_types() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "glossary/en/bit.md", "# Bit\n\nBinary digit.\n");
        let pool = memory_pool().await;
        SearchIndex::new(pool.clone()).init().await.unwrap();
        GlossaryTermsLoader::new(dir.path(), languages()).load(&pool).await.unwrap();

        let indexer = SearchIndexer::new(pool, languages(), PreviewRenderer::embedded());
        let summary = indexer.rebuild().await.unwrap();
        assert_eq!(summary.instances, 1);
        assert_eq!(summary.rows, 2);
    }
}
