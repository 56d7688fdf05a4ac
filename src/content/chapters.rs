//! Chapters and chapter sections / 章节
//!
//! Sources:
//! - `chapters/structure/chapters.yaml`: slug → `{chapter-number, icon, sections: [slug, ...]}`
//! - `chapters/{language}/{chapter}/{chapter}.md`: chapter name and introduction
//! - `chapters/{language}/{chapter}/sections/{section}.md`: section name and content
//!
//! Section numbers follow their position in the `sections` list, starting at 1.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use super::resolver::{load_yaml_file, TranslationResolver};
use super::translations::{decode_languages, encode_languages, Languages, Translations};
use super::{filtered_query, now, ContentLoader, LoadSummary};
use crate::error::{ContentError, Result};
use crate::search::{IndexContents, Indexable, ObjectType, PreviewContext, Weight};
use crate::utils::site_url;

pub const ENTITY_TYPE: &str = "chapter";
pub const SECTION_ENTITY_TYPE: &str = "chapter_section";
pub const REQUIRED_FIELDS: &[&str] = &["name", "introduction"];
pub const SECTION_REQUIRED_FIELDS: &[&str] = &["name", "content"];
const STRUCTURE_FILENAME: &str = "chapters.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ChapterStructure {
    #[serde(default)]
    chapter_number: Option<i64>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    pub id: i64,
    pub slug: String,
    pub number: i64,
    pub icon: Option<String>,
    pub translations: Translations,
    pub languages: Vec<String>,
}

impl Chapter {
    pub fn name(&self, language: &str) -> &str {
        self.translations.get_or_default(language, "name")
    }

    pub fn introduction(&self, language: &str) -> &str {
        self.translations.get_or_default(language, "introduction")
    }

    async fn upsert(conn: &mut SqliteConnection, slug: &str, number: i64, icon: Option<&str>) -> Result<(i64, bool)> {
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM chapters WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?;

        let timestamp = now();
        if let Some((id,)) = existing {
            sqlx::query("UPDATE chapters SET number = ?, icon = ?, updated_at = ? WHERE id = ?")
                .bind(number)
                .bind(icon)
                .bind(&timestamp)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            return Ok((id, false));
        }

        let result = sqlx::query(
            "INSERT INTO chapters (slug, number, icon, languages, created_at, updated_at) VALUES (?, ?, ?, '[]', ?, ?)",
        )
        .bind(slug)
        .bind(number)
        .bind(icon)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&mut *conn)
        .await?;
        Ok((result.last_insert_rowid(), true))
    }

    async fn save_languages(conn: &mut SqliteConnection, id: i64, languages: &[String]) -> Result<()> {
        sqlx::query("UPDATE chapters SET languages = ? WHERE id = ?")
            .bind(encode_languages(languages)?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// All chapters matching an optional SQL condition, ordered by number
    pub async fn fetch_all(pool: &SqlitePool, languages: &Languages, filter: Option<&str>) -> Result<Vec<Self>> {
        let sql = filtered_query("SELECT id, slug, number, icon, languages FROM chapters", filter, "number");
        let rows: Vec<(i64, String, i64, Option<String>, String)> = sqlx::query_as(&sql).fetch_all(pool).await?;
        let mut translations =
            Translations::fetch_for_type(pool, ENTITY_TYPE, languages, REQUIRED_FIELDS).await?;

        rows.into_iter()
            .map(|(id, slug, number, icon, available)| -> Result<Self> {
                Ok(Self {
                    id,
                    slug,
                    number,
                    icon,
                    translations: translations
                        .remove(&id)
                        .unwrap_or_else(|| Translations::blank(languages, REQUIRED_FIELDS)),
                    languages: decode_languages(&available)?,
                })
            })
            .collect()
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.translations.get_default("name");
        if name.is_empty() {
            f.write_str(&self.slug)
        } else {
            f.write_str(name)
        }
    }
}

impl Indexable for Chapter {
    fn object_type(&self) -> ObjectType {
        ObjectType::Chapter
    }

    fn object_id(&self) -> i64 {
        self.id
    }

    fn index_contents(&self, language: &str) -> IndexContents {
        IndexContents::from([
            (Weight::A, self.name(language).to_string()),
            (Weight::B, self.introduction(language).to_string()),
        ])
    }

    fn preview_context(&self, language: &str) -> PreviewContext {
        PreviewContext::from([
            ("slug", self.slug.clone()),
            ("name", self.name(language).to_string()),
            ("number", self.number.to_string()),
            ("icon", self.icon.clone().unwrap_or_default()),
            ("url", site_url(language, &["chapters", &self.slug])),
        ])
    }
}

/// Section of a chapter, carrying what its previews need from the parent.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterSection {
    pub id: i64,
    pub slug: String,
    pub number: i64,
    pub chapter_id: i64,
    pub chapter_slug: String,
    pub chapter_number: i64,
    pub chapter_translations: Translations,
    pub translations: Translations,
    pub languages: Vec<String>,
}

impl ChapterSection {
    pub fn name(&self, language: &str) -> &str {
        self.translations.get_or_default(language, "name")
    }

    pub fn content(&self, language: &str) -> &str {
        self.translations.get_or_default(language, "content")
    }

    pub fn chapter_name(&self, language: &str) -> &str {
        self.chapter_translations.get_or_default(language, "name")
    }

    async fn upsert(conn: &mut SqliteConnection, chapter_id: i64, slug: &str, number: i64) -> Result<(i64, bool)> {
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM chapter_sections WHERE chapter_id = ? AND slug = ?")
                .bind(chapter_id)
                .bind(slug)
                .fetch_optional(&mut *conn)
                .await?;

        let timestamp = now();
        if let Some((id,)) = existing {
            sqlx::query("UPDATE chapter_sections SET number = ?, updated_at = ? WHERE id = ?")
                .bind(number)
                .bind(&timestamp)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            return Ok((id, false));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO chapter_sections (chapter_id, slug, number, languages, created_at, updated_at)
            VALUES (?, ?, ?, '[]', ?, ?)
            "#,
        )
        .bind(chapter_id)
        .bind(slug)
        .bind(number)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&mut *conn)
        .await?;
        Ok((result.last_insert_rowid(), true))
    }

    async fn save_languages(conn: &mut SqliteConnection, id: i64, languages: &[String]) -> Result<()> {
        sqlx::query("UPDATE chapter_sections SET languages = ? WHERE id = ?")
            .bind(encode_languages(languages)?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// All sections, ordered by chapter number then section number
    pub async fn fetch_all(pool: &SqlitePool, languages: &Languages, filter: Option<&str>) -> Result<Vec<Self>> {
        let sql = filtered_query(
            r#"
            SELECT s.id, s.slug, s.number, s.chapter_id, c.slug, c.number, s.languages
            FROM chapter_sections s
            JOIN chapters c ON c.id = s.chapter_id
            "#,
            filter,
            "c.number, s.number",
        );
        let rows: Vec<(i64, String, i64, i64, String, i64, String)> = sqlx::query_as(&sql).fetch_all(pool).await?;
        let mut translations =
            Translations::fetch_for_type(pool, SECTION_ENTITY_TYPE, languages, SECTION_REQUIRED_FIELDS).await?;
        let chapter_translations =
            Translations::fetch_for_type(pool, ENTITY_TYPE, languages, REQUIRED_FIELDS).await?;

        rows.into_iter()
            .map(
                |(id, slug, number, chapter_id, chapter_slug, chapter_number, available)| -> Result<Self> {
                    Ok(Self {
                        id,
                        slug,
                        number,
                        chapter_id,
                        chapter_slug,
                        chapter_number,
                        chapter_translations: chapter_translations
                            .get(&chapter_id)
                            .cloned()
                            .unwrap_or_else(|| Translations::blank(languages, REQUIRED_FIELDS)),
                        translations: translations
                            .remove(&id)
                            .unwrap_or_else(|| Translations::blank(languages, SECTION_REQUIRED_FIELDS)),
                        languages: decode_languages(&available)?,
                    })
                },
            )
            .collect()
    }
}

impl fmt::Display for ChapterSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.translations.get_default("name");
        if name.is_empty() {
            write!(f, "{}/{}", self.chapter_slug, self.slug)
        } else {
            f.write_str(name)
        }
    }
}

impl Indexable for ChapterSection {
    fn object_type(&self) -> ObjectType {
        ObjectType::ChapterSection
    }

    fn object_id(&self) -> i64 {
        self.id
    }

    fn index_contents(&self, language: &str) -> IndexContents {
        IndexContents::from([
            (Weight::A, self.name(language).to_string()),
            (Weight::B, self.content(language).to_string()),
        ])
    }

    fn preview_context(&self, language: &str) -> PreviewContext {
        PreviewContext::from([
            ("slug", self.slug.clone()),
            ("name", self.name(language).to_string()),
            ("number", self.number.to_string()),
            ("chapter_name", self.chapter_name(language).to_string()),
            ("chapter_number", self.chapter_number.to_string()),
            ("url", site_url(language, &["chapters", &self.chapter_slug, &self.slug])),
        ])
    }
}

/// Loader for chapters and their sections / 章节加载器
pub struct ChaptersLoader {
    resolver: TranslationResolver,
}

impl ChaptersLoader {
    pub fn new(content_dir: &Path, languages: Languages) -> Self {
        Self {
            resolver: TranslationResolver::new(content_dir.join("chapters"), languages),
        }
    }

    /// Load the sections listed for one chapter, counting them into `summary`
    async fn load_sections(
        &self,
        conn: &mut SqliteConnection,
        chapter_id: i64,
        chapter_slug: &str,
        sections: &[String],
        summary: &mut LoadSummary,
    ) -> Result<()> {
        for (index, slug) in sections.iter().enumerate() {
            let number = index as i64 + 1;
            let mut translations = self.resolver.blank_translations(SECTION_REQUIRED_FIELDS);
            let contents = self
                .resolver
                .markdown_translations(&format!("{}/sections/{}.md", chapter_slug, slug))?;
            for (language, content) in contents {
                translations.set(&language, "name", content.title);
                translations.set(&language, "content", content.html_string);
            }

            let (id, created) = ChapterSection::upsert(conn, chapter_id, slug, number).await?;
            translations.save(conn, SECTION_ENTITY_TYPE, id).await?;
            let available = translations.available_languages(SECTION_REQUIRED_FIELDS);
            ChapterSection::save_languages(conn, id, &available).await?;

            let verb = summary.record(created);
            tracing::info!(
                "{} chapter section: {}.{} {}",
                verb,
                chapter_slug,
                number,
                translations.get_default("name")
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ContentLoader for ChaptersLoader {
    fn name(&self) -> &'static str {
        "chapters"
    }

    async fn load_into(&self, conn: &mut SqliteConnection) -> Result<LoadSummary> {
        let structure_path = self.resolver.structure_file(STRUCTURE_FILENAME);
        let structure: BTreeMap<String, Option<ChapterStructure>> = load_yaml_file(&structure_path)?;

        let mut numbers = BTreeSet::new();
        let mut summary = LoadSummary::default();
        let mut sections = LoadSummary::default();

        for (slug, data) in structure {
            let data = data.unwrap_or_default();

            let Some(number) = data
                .chapter_number
                .filter(|n| *n > 0 && numbers.insert(*n))
            else {
                return Err(ContentError::InvalidYamlValue {
                    path: structure_path.clone(),
                    field: format!("chapter-number of chapter '{}'", slug),
                    expected: "A positive integer not used by another chapter\n".to_string(),
                });
            };

            let mut seen_sections = BTreeSet::new();
            if let Some(duplicate) = data.sections.iter().find(|s| !seen_sections.insert(s.as_str())) {
                return Err(ContentError::InvalidYamlValue {
                    path: structure_path.clone(),
                    field: format!("section '{}' of chapter '{}'", duplicate, slug),
                    expected: "Section slugs listed once per chapter\n".to_string(),
                });
            }

            let mut translations = self.resolver.blank_translations(REQUIRED_FIELDS);
            let contents = self
                .resolver
                .markdown_translations(&format!("{}/{}.md", slug, slug))?;
            for (language, content) in contents {
                translations.set(&language, "name", content.title);
                translations.set(&language, "introduction", content.html_string);
            }

            let (id, created) = Chapter::upsert(conn, &slug, number, data.icon.as_deref()).await?;
            translations.save(conn, ENTITY_TYPE, id).await?;
            let available = translations.available_languages(REQUIRED_FIELDS);
            Chapter::save_languages(conn, id, &available).await?;

            let chapter = Chapter {
                id,
                slug,
                number,
                icon: data.icon,
                translations,
                languages: available,
            };
            let verb = summary.record(created);
            tracing::info!("{} chapter: {}", verb, chapter);

            self.load_sections(conn, chapter.id, &chapter.slug, &data.sections, &mut sections)
                .await?;
        }

        tracing::info!("{} chapter sections loaded!", sections.total());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{languages, memory_pool, write_file};

    const STRUCTURE: &str = r#"
algorithms:
  chapter-number: 1
  icon: img/chapters/algorithms.png
  sections:
    - sorting
    - searching
binary-numbers:
  chapter-number: 2
"#;

    fn write_sources(root: &Path) {
        write_file(root, "chapters/structure/chapters.yaml", STRUCTURE);
        write_file(root, "chapters/en/algorithms/algorithms.md", "# Algorithms\n\nStep by step.\n");
        write_file(root, "chapters/de/algorithms/algorithms.md", "# Algorithmen\n\nSchritt für Schritt.\n");
        write_file(root, "chapters/en/algorithms/sections/sorting.md", "# Sorting\n\nPut things in order.\n");
        write_file(root, "chapters/en/algorithms/sections/searching.md", "# Searching\n\nFind things.\n");
        write_file(root, "chapters/en/binary-numbers/binary-numbers.md", "# Binary Numbers\n\nOnes and zeros.\n");
    }

    async fn load(root: &Path, pool: &SqlitePool) -> Result<LoadSummary> {
        ChaptersLoader::new(root, languages()).load(pool).await
    }

    #[tokio::test]
    async fn test_load_chapters_and_sections() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        let pool = memory_pool().await;

        let summary = load(dir.path(), &pool).await.unwrap();
        assert_eq!(summary, LoadSummary { created: 2, updated: 0 });

        let chapters = Chapter::fetch_all(&pool, &languages(), None).await.unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].slug, "algorithms");
        assert_eq!(chapters[0].icon.as_deref(), Some("img/chapters/algorithms.png"));
        assert_eq!(chapters[0].name("de"), "Algorithmen");
        assert_eq!(chapters[0].languages, vec!["en", "de"]);
        assert_eq!(chapters[1].number, 2);
        assert!(chapters[1].icon.is_none());

        let sections = ChapterSection::fetch_all(&pool, &languages(), None).await.unwrap();
        let names: Vec<_> = sections.iter().map(|s| (s.number, s.name("en"))).collect();
        assert_eq!(names, vec![(1, "Sorting"), (2, "Searching")]);
        assert_eq!(sections[0].chapter_name("de"), "Algorithmen");
        assert_eq!(sections[0].languages, vec!["en"]);
    }

    #[tokio::test]
    async fn test_reload_updates_section_numbers() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        let pool = memory_pool().await;
        load(dir.path(), &pool).await.unwrap();

        write_file(
            dir.path(),
            "chapters/structure/chapters.yaml",
            "algorithms:\n  chapter-number: 1\n  sections:\n    - searching\n    - sorting\n",
        );
        let summary = load(dir.path(), &pool).await.unwrap();
        assert_eq!(summary, LoadSummary { created: 0, updated: 1 });

        let sections = ChapterSection::fetch_all(&pool, &languages(), None).await.unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].slug, "searching");
        assert_eq!(sections[1].slug, "sorting");
    }

    #[tokio::test]
    async fn test_duplicate_chapter_number_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "chapters/structure/chapters.yaml",
            "aaa:\n  chapter-number: 1\nbbb:\n  chapter-number: 1\n",
        );
        write_file(dir.path(), "chapters/en/aaa/aaa.md", "# A\n\nFirst.\n");
        write_file(dir.path(), "chapters/en/bbb/bbb.md", "# B\n\nSecond.\n");
        let pool = memory_pool().await;

        let err = load(dir.path(), &pool).await.unwrap_err();
        assert!(matches!(err, ContentError::InvalidYamlValue { .. }));
        assert!(err.to_string().contains("chapter 'bbb'"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chapters")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_missing_chapter_number_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "chapters/structure/chapters.yaml", "aaa:\n  icon: a.png\n");
        let pool = memory_pool().await;

        let err = load(dir.path(), &pool).await.unwrap_err();
        assert!(matches!(err, ContentError::InvalidYamlValue { .. }));
    }

    #[tokio::test]
    async fn test_missing_section_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "chapters/structure/chapters.yaml",
            "algorithms:\n  chapter-number: 1\n  sections:\n    - sorting\n",
        );
        write_file(dir.path(), "chapters/en/algorithms/algorithms.md", "# Algorithms\n\nIntro.\n");
        let pool = memory_pool().await;

        let err = load(dir.path(), &pool).await.unwrap_err();
        assert!(matches!(err, ContentError::MissingDefaultFile(_)));
    }

    #[test]
    fn test_section_preview_context() {
        let mut chapter_translations = Translations::blank(&languages(), REQUIRED_FIELDS);
        chapter_translations.set("en", "name", "Algorithms");
        let mut translations = Translations::blank(&languages(), SECTION_REQUIRED_FIELDS);
        translations.set("en", "name", "Sorting");
        let section = ChapterSection {
            id: 3,
            slug: "sorting".to_string(),
            number: 2,
            chapter_id: 1,
            chapter_slug: "algorithms".to_string(),
            chapter_number: 4,
            chapter_translations,
            translations,
            languages: vec!["en".to_string()],
        };

        let context = section.preview_context("en");
        assert_eq!(context["url"], "/en/chapters/algorithms/sorting/");
        assert_eq!(context["chapter_number"], "4");
        assert_eq!(context["number"], "2");
        assert_eq!(context["chapter_name"], "Algorithms");
        assert_eq!(section.index_contents("en")[&Weight::A], "Sorting");
    }

    #[tokio::test]
    async fn test_reload_updates_number_and_icon() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        let pool = memory_pool().await;
        load(dir.path(), &pool).await.unwrap();
        let before = Chapter::fetch_all(&pool, &languages(), None).await.unwrap();

        write_file(
            dir.path(),
            "chapters/structure/chapters.yaml",
            r#"
algorithms:
  chapter-number: 2
  sections:
    - sorting
    - searching
binary-numbers:
  chapter-number: 1
  icon: img/chapters/binary.png
"#,
        );
        let summary = load(dir.path(), &pool).await.unwrap();
        assert_eq!(summary, LoadSummary { created: 0, updated: 2 });

        let after = Chapter::fetch_all(&pool, &languages(), None).await.unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].slug, "binary-numbers");
        assert_eq!(after[0].id, before[1].id);
        assert_eq!(after[0].icon.as_deref(), Some("img/chapters/binary.png"));
        assert_eq!(after[1].slug, "algorithms");
        assert_eq!(after[1].number, 2);
        assert!(after[1].icon.is_none());

        let sections = ChapterSection::fetch_all(&pool, &languages(), None).await.unwrap();
        assert_eq!(sections.len(), 2);
        assert!(sections.iter().all(|s| s.chapter_number == 2));
    }

    #[tokio::test]
    async fn test_sections_are_counted_separately() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        let pool = memory_pool().await;
        load(dir.path(), &pool).await.unwrap();
        let chapter = Chapter::fetch_all(&pool, &languages(), None).await.unwrap().remove(0);

        let loader = ChaptersLoader::new(dir.path(), languages());
        let mut conn = pool.acquire().await.unwrap();
        let mut sections = LoadSummary::default();
        loader
            .load_sections(
                &mut *conn,
                chapter.id,
                &chapter.slug,
                &["sorting".to_string(), "searching".to_string()],
                &mut sections,
            )
            .await
            .unwrap();
        assert_eq!(sections, LoadSummary { created: 0, updated: 2 });
    }
}
