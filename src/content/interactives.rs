//! Interactives / 交互组件
//!
//! Sources:
//! - `interactives/structure/interactives.yaml`: slug → `{languages: {code: template}, is_interactive, use_large_thumbnail}`
//! - `interactives/{language}/interactives.yaml`: slug → `{name}`
//!
//! The template path of a language comes from the structure file, so an
//! interactive is only available in languages that declare a template.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::resolver::{load_yaml_file, TranslationResolver};
use super::thumbnail::thumbnail_static_path;
use super::translations::{decode_languages, encode_languages, Languages, Translations};
use super::{filtered_query, now, ContentLoader, LoadSummary};
use crate::error::{ContentError, Result};
use crate::search::{IndexContents, Indexable, ObjectType, PreviewContext, Weight};
use crate::utils::site_url;

pub const ENTITY_TYPE: &str = "interactive";
pub const REQUIRED_FIELDS: &[&str] = &["name", "template"];
/// Fields translators provide; templates only come from the structure file
const TRANSLATED_FIELDS: &[&str] = &["name"];
const STRUCTURE_FILENAME: &str = "interactives.yaml";

/// Entry of the structure file / 结构文件条目
#[derive(Debug, Default, Deserialize)]
struct InteractiveStructure {
    #[serde(default)]
    languages: BTreeMap<String, String>,
    #[serde(default)]
    is_interactive: Option<bool>,
    #[serde(default)]
    use_large_thumbnail: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interactive {
    pub id: i64,
    pub slug: String,
    pub is_interactive: bool,
    pub use_large_thumbnail: bool,
    pub translations: Translations,
    pub languages: Vec<String>,
}

impl Interactive {
    pub fn name(&self, language: &str) -> &str {
        self.translations.get_or_default(language, "name")
    }

    pub fn template(&self, language: &str) -> &str {
        self.translations.get_or_default(language, "template")
    }

    pub fn thumbnail(&self, language: &str) -> String {
        thumbnail_static_path(&self.slug, language)
    }

    async fn upsert(
        conn: &mut SqliteConnection,
        slug: &str,
        is_interactive: bool,
        use_large_thumbnail: bool,
    ) -> Result<(i64, bool)> {
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM interactives WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?;

        let timestamp = now();
        if let Some((id,)) = existing {
            sqlx::query(
                "UPDATE interactives SET is_interactive = ?, use_large_thumbnail = ?, updated_at = ? WHERE id = ?",
            )
            .bind(is_interactive)
            .bind(use_large_thumbnail)
            .bind(&timestamp)
            .bind(id)
            .execute(&mut *conn)
            .await?;
            return Ok((id, false));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO interactives (slug, is_interactive, use_large_thumbnail, languages, created_at, updated_at)
            VALUES (?, ?, ?, '[]', ?, ?)
            "#,
        )
        .bind(slug)
        .bind(is_interactive)
        .bind(use_large_thumbnail)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&mut *conn)
        .await?;
        Ok((result.last_insert_rowid(), true))
    }

    async fn save_languages(conn: &mut SqliteConnection, id: i64, languages: &[String]) -> Result<()> {
        sqlx::query("UPDATE interactives SET languages = ? WHERE id = ?")
            .bind(encode_languages(languages)?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn fetch_all(pool: &SqlitePool, languages: &Languages, filter: Option<&str>) -> Result<Vec<Self>> {
        let sql = filtered_query(
            "SELECT id, slug, is_interactive, use_large_thumbnail, languages FROM interactives",
            filter,
            "slug",
        );
        let rows: Vec<(i64, String, bool, bool, String)> = sqlx::query_as(&sql).fetch_all(pool).await?;
        let mut translations =
            Translations::fetch_for_type(pool, ENTITY_TYPE, languages, REQUIRED_FIELDS).await?;

        rows.into_iter()
            .map(|(id, slug, is_interactive, use_large_thumbnail, available)| -> Result<Self> {
                Ok(Self {
                    id,
                    slug,
                    is_interactive,
                    use_large_thumbnail,
                    translations: translations
                        .remove(&id)
                        .unwrap_or_else(|| Translations::blank(languages, REQUIRED_FIELDS)),
                    languages: decode_languages(&available)?,
                })
            })
            .collect()
    }
}

impl fmt::Display for Interactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.translations.get_default("name");
        if name.is_empty() {
            f.write_str(&self.slug)
        } else {
            f.write_str(name)
        }
    }
}

impl Indexable for Interactive {
    fn object_type(&self) -> ObjectType {
        ObjectType::Interactive
    }

    fn object_id(&self) -> i64 {
        self.id
    }

    fn index_contents(&self, language: &str) -> IndexContents {
        IndexContents::from([(Weight::A, self.name(language).to_string())])
    }

    fn preview_context(&self, language: &str) -> PreviewContext {
        let thumbnail_class = if self.use_large_thumbnail {
            " search-result-thumbnail-large"
        } else {
            ""
        };
        PreviewContext::from([
            ("slug", self.slug.clone()),
            ("name", self.name(language).to_string()),
            ("url", site_url(language, &["interactives", &self.slug])),
            ("thumbnail", self.thumbnail(language)),
            ("thumbnail_class", thumbnail_class.to_string()),
        ])
    }
}

/// Loader for interactives / 交互组件加载器
pub struct InteractivesLoader {
    resolver: TranslationResolver,
}

impl InteractivesLoader {
    pub fn new(content_dir: &Path, languages: Languages) -> Self {
        Self {
            resolver: TranslationResolver::new(content_dir.join("interactives"), languages),
        }
    }
}

#[async_trait]
impl ContentLoader for InteractivesLoader {
    fn name(&self) -> &'static str {
        "interactives"
    }

    async fn load_into(&self, conn: &mut SqliteConnection) -> Result<LoadSummary> {
        let structure_path = self.resolver.structure_file(STRUCTURE_FILENAME);
        let structure: BTreeMap<String, Option<InteractiveStructure>> = load_yaml_file(&structure_path)?;
        let slugs: Vec<String> = structure.keys().cloned().collect();
        let mut all_translations =
            self.resolver
                .yaml_translations(STRUCTURE_FILENAME, &slugs, TRANSLATED_FIELDS)?;

        let languages = self.resolver.languages();
        let mut summary = LoadSummary::default();

        for (slug, data) in structure {
            let data = data.unwrap_or_default();
            let mut translations = self.resolver.blank_translations(REQUIRED_FIELDS);
            if let Some(names) = all_translations.remove(&slug) {
                for language in languages.codes() {
                    translations.set(language, "name", names.get(language, "name"));
                }
            }

            for (language, template) in data.languages {
                if !languages.contains(&language) {
                    return Err(ContentError::invalid_value(
                        &structure_path,
                        &format!("language '{}' of interactive '{}'", language, slug),
                        languages.codes(),
                    ));
                }
                translations.set(&language, "template", template);
            }

            let is_interactive = data.is_interactive.unwrap_or(true);
            let use_large_thumbnail = data.use_large_thumbnail.unwrap_or(false);

            let (id, created) = Interactive::upsert(conn, &slug, is_interactive, use_large_thumbnail).await?;
            translations.save(conn, ENTITY_TYPE, id).await?;
            let available = translations.available_languages(REQUIRED_FIELDS);
            Interactive::save_languages(conn, id, &available).await?;

            let interactive = Interactive {
                id,
                slug,
                is_interactive,
                use_large_thumbnail,
                translations,
                languages: available,
            };
            let verb = summary.record(created);
            tracing::info!("{} interactive: {}", verb, interactive);
        }

        Ok(summary)
    }
}
