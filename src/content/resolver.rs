//! Translation resolver / 翻译解析器
//!
//! Content for each language lives in its own directory under a base path:
//!
//! ```text
//! {base}/structure/...      language independent structure files
//! {base}/{language}/...     localised Markdown and YAML
//! ```
//!
//! The default language is the authoritative index: slugs are discovered from
//! its directory and its files must exist. Other languages may be partial.

use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::markdown::MarkdownContent;
use super::translations::{Languages, Translations};
use crate::error::{ContentError, Result};

pub const STRUCTURE_DIR: &str = "structure";

#[derive(Debug, Clone)]
pub struct TranslationResolver {
    base_path: PathBuf,
    languages: Languages,
}

impl TranslationResolver {
    pub fn new(base_path: impl Into<PathBuf>, languages: Languages) -> Self {
        Self {
            base_path: base_path.into(),
            languages,
        }
    }

    pub fn languages(&self) -> &Languages {
        &self.languages
    }

    /// Directory holding the sources of one language / 某语言的源目录
    pub fn localised_dir(&self, language: &str) -> PathBuf {
        self.base_path.join(language)
    }

    pub fn localised_file(&self, language: &str, relative: &str) -> PathBuf {
        self.localised_dir(language).join(relative)
    }

    pub fn structure_file(&self, filename: &str) -> PathBuf {
        self.base_path.join(STRUCTURE_DIR).join(filename)
    }

    /// Slugs of every `extension` file in the default language directory, sorted.
    /// 从默认语言目录枚举 slug
    pub fn discover_slugs(&self, relative_dir: &str, extension: &str) -> Result<BTreeSet<String>> {
        let dir = self
            .localised_dir(self.languages.default_code())
            .join(relative_dir);
        let entries = std::fs::read_dir(&dir).map_err(|e| ContentError::io(&dir, e))?;

        let mut slugs = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| ContentError::io(&dir, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(slug) = name.strip_suffix(extension) {
                if !slug.is_empty() {
                    slugs.insert(slug.to_string());
                }
            }
        }
        Ok(slugs)
    }

    /// Blank translation template for the configured languages / 空白翻译模板
    pub fn blank_translations(&self, fields: &[&str]) -> Translations {
        Translations::blank(&self.languages, fields)
    }

    /// Convert a Markdown file for every language that has it.
    ///
    /// The default language file is required; other languages are skipped when
    /// their file is missing.
    pub fn markdown_translations(&self, relative: &str) -> Result<BTreeMap<String, MarkdownContent>> {
        let mut contents = BTreeMap::new();

        for language in self.languages.codes() {
            let path = self.localised_file(language, relative);
            if !path.is_file() {
                if language == self.languages.default_code() {
                    return Err(ContentError::MissingDefaultFile(path));
                }
                tracing::debug!("No {} translation for {}", language, relative);
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|e| ContentError::io(&path, e))?;
            contents.insert(language.clone(), MarkdownContent::parse(&source));
        }

        Ok(contents)
    }

    /// Field translations from per-language YAML files (`slug: {field: value}`).
    ///
    /// Returns one record per required slug; values missing from a language stay blank.
    pub fn yaml_translations<'a>(
        &self,
        filename: &str,
        required_slugs: impl IntoIterator<Item = &'a String>,
        fields: &[&str],
    ) -> Result<BTreeMap<String, Translations>> {
        let mut records: BTreeMap<String, Translations> = required_slugs
            .into_iter()
            .map(|slug| (slug.clone(), self.blank_translations(fields)))
            .collect();

        for language in self.languages.codes() {
            let path = self.localised_file(language, filename);
            if !path.is_file() {
                if language == self.languages.default_code() {
                    return Err(ContentError::MissingDefaultFile(path));
                }
                continue;
            }

            let localised: BTreeMap<String, Option<BTreeMap<String, String>>> = load_yaml_file(&path)?;
            for (slug, values) in localised {
                let Some(record) = records.get_mut(&slug) else {
                    tracing::debug!("Ignoring unknown slug '{}' in {:?}", slug, path);
                    continue;
                };
                for (field, value) in values.unwrap_or_default() {
                    if fields.contains(&field.as_str()) {
                        record.set(language, &field, value);
                    }
                }
            }
        }

        Ok(records)
    }
}

/// Read and deserialize a YAML file / 读取 YAML 文件
pub fn load_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let source = std::fs::read_to_string(path).map_err(|e| ContentError::io(path, e))?;
    if source.trim().is_empty() {
        return Err(ContentError::EmptyYamlFile(path.to_path_buf()));
    }
    serde_yaml::from_str(&source).map_err(|e| ContentError::yaml(path, e))
}
