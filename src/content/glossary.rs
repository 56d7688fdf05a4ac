//! Glossary terms / 术语表
//!
//! Sources: `glossary/{language}/{slug}.md`. The Markdown heading is the term,
//! the rendered body is the definition.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::fmt;
use std::path::Path;

use super::resolver::TranslationResolver;
use super::translations::{decode_languages, encode_languages, Languages, Translations};
use super::{filtered_query, now, ContentLoader, LoadSummary};
use crate::error::Result;
use crate::search::{IndexContents, Indexable, ObjectType, PreviewContext, Weight};

pub const ENTITY_TYPE: &str = "glossary_term";
pub const REQUIRED_FIELDS: &[&str] = &["term", "definition"];
const FILE_EXTENSION: &str = ".md";

#[derive(Debug, Clone, Serialize)]
pub struct GlossaryTerm {
    pub id: i64,
    pub slug: String,
    pub translations: Translations,
    /// Languages with a complete translation / 翻译完整的语言
    pub languages: Vec<String>,
}

impl GlossaryTerm {
    pub fn term(&self, language: &str) -> &str {
        self.translations.get_or_default(language, "term")
    }

    pub fn definition(&self, language: &str) -> &str {
        self.translations.get_or_default(language, "definition")
    }

    /// Insert or find the row for a slug, returning (id, created)
    async fn upsert(conn: &mut SqliteConnection, slug: &str) -> Result<(i64, bool)> {
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM glossary_terms WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?;

        let timestamp = now();
        if let Some((id,)) = existing {
            sqlx::query("UPDATE glossary_terms SET updated_at = ? WHERE id = ?")
                .bind(&timestamp)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            return Ok((id, false));
        }

        let result = sqlx::query(
            "INSERT INTO glossary_terms (slug, languages, created_at, updated_at) VALUES (?, '[]', ?, ?)",
        )
        .bind(slug)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&mut *conn)
        .await?;
        Ok((result.last_insert_rowid(), true))
    }

    async fn save_languages(conn: &mut SqliteConnection, id: i64, languages: &[String]) -> Result<()> {
        sqlx::query("UPDATE glossary_terms SET languages = ? WHERE id = ?")
            .bind(encode_languages(languages)?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// All glossary terms matching an optional SQL condition, ordered by slug
    pub async fn fetch_all(pool: &SqlitePool, languages: &Languages, filter: Option<&str>) -> Result<Vec<Self>> {
        let sql = filtered_query("SELECT id, slug, languages FROM glossary_terms", filter, "slug");
        let rows: Vec<(i64, String, String)> = sqlx::query_as(&sql).fetch_all(pool).await?;
        let mut translations =
            Translations::fetch_for_type(pool, ENTITY_TYPE, languages, REQUIRED_FIELDS).await?;

        rows.into_iter()
            .map(|(id, slug, available)| -> Result<Self> {
                Ok(Self {
                    id,
                    slug,
                    translations: translations
                        .remove(&id)
                        .unwrap_or_else(|| Translations::blank(languages, REQUIRED_FIELDS)),
                    languages: decode_languages(&available)?,
                })
            })
            .collect()
    }

    pub async fn get_by_slug(pool: &SqlitePool, languages: &Languages, slug: &str) -> Result<Option<Self>> {
        let terms = Self::fetch_all(pool, languages, None).await?;
        Ok(terms.into_iter().find(|t| t.slug == slug))
    }
}

impl fmt::Display for GlossaryTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let term = self.translations.get_default("term");
        if term.is_empty() {
            f.write_str(&self.slug)
        } else {
            f.write_str(term)
        }
    }
}

impl Indexable for GlossaryTerm {
    fn object_type(&self) -> ObjectType {
        ObjectType::GlossaryTerm
    }

    fn object_id(&self) -> i64 {
        self.id
    }

    fn index_contents(&self, language: &str) -> IndexContents {
        IndexContents::from([
            (Weight::A, self.term(language).to_string()),
            (Weight::B, self.definition(language).to_string()),
        ])
    }

    fn preview_context(&self, language: &str) -> PreviewContext {
        PreviewContext::from([
            ("slug", self.slug.clone()),
            ("term", self.term(language).to_string()),
            ("definition", self.definition(language).to_string()),
        ])
    }
}

/// Loader for glossary terms / 术语加载器
pub struct GlossaryTermsLoader {
    resolver: TranslationResolver,
}

impl GlossaryTermsLoader {
    pub fn new(content_dir: &Path, languages: Languages) -> Self {
        Self {
            resolver: TranslationResolver::new(content_dir.join("glossary"), languages),
        }
    }
}

#[async_trait]
impl ContentLoader for GlossaryTermsLoader {
    fn name(&self) -> &'static str {
        "glossary terms"
    }

    async fn load_into(&self, conn: &mut SqliteConnection) -> Result<LoadSummary> {
        let slugs = self.resolver.discover_slugs("", FILE_EXTENSION)?;
        let mut summary = LoadSummary::default();

        for slug in &slugs {
            let mut translations = self.resolver.blank_translations(REQUIRED_FIELDS);
            let contents = self
                .resolver
                .markdown_translations(&format!("{}{}", slug, FILE_EXTENSION))?;
            for (language, content) in contents {
                translations.set(&language, "term", content.title);
                translations.set(&language, "definition", content.html_string);
            }

            let (id, created) = GlossaryTerm::upsert(conn, slug).await?;
            translations.save(conn, ENTITY_TYPE, id).await?;
            let available = translations.available_languages(REQUIRED_FIELDS);
            GlossaryTerm::save_languages(conn, id, &available).await?;

            let term = GlossaryTerm {
                id,
                slug: slug.clone(),
                translations,
                languages: available,
            };
            let verb = summary.record(created);
            tracing::info!("{} glossary term: {}", verb, term);
        }

        Ok(summary)
    }
}
