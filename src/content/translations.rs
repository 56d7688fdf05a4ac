//! Per-language translation records / 多语言翻译记录
//!
//! A record maps language code → field name → value. Every configured language
//! always has an entry, so availability can be computed uniformly.

use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqliteConnection};
use std::collections::{BTreeMap, HashMap};

use crate::config::ContentConfig;
use crate::error::Result;

/// Configured languages, default first in meaning but kept in display order / 语言集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Languages {
    codes: Vec<String>,
    default: String,
}

impl Languages {
    pub fn new(codes: Vec<String>, default: &str) -> Self {
        Self {
            codes,
            default: default.to_string(),
        }
    }

    pub fn from_config(config: &ContentConfig) -> Self {
        Self::new(config.language_codes(), &config.default_language)
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn default_code(&self) -> &str {
        &self.default
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }
}

/// Translation record of one entity / 单个实体的翻译记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translations {
    languages: Languages,
    values: BTreeMap<String, BTreeMap<String, String>>,
}

impl Translations {
    /// Blank record: every language gets every field set to "" / 空白翻译模板
    pub fn blank(languages: &Languages, fields: &[&str]) -> Self {
        let values = languages
            .codes()
            .iter()
            .map(|code| {
                let blank = fields
                    .iter()
                    .map(|field| (field.to_string(), String::new()))
                    .collect();
                (code.clone(), blank)
            })
            .collect();
        Self {
            languages: languages.clone(),
            values,
        }
    }

    pub fn set(&mut self, language: &str, field: &str, value: impl Into<String>) {
        self.values
            .entry(language.to_string())
            .or_default()
            .insert(field.to_string(), value.into());
    }

    /// Value for a language, "" when absent / 获取指定语言的字段值
    pub fn get(&self, language: &str, field: &str) -> &str {
        self.values
            .get(language)
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Value in the default language / 默认语言的字段值
    pub fn get_default(&self, field: &str) -> &str {
        self.get(self.languages.default_code(), field)
    }

    /// Value for a language, falling back to the default language when empty.
    pub fn get_or_default(&self, language: &str, field: &str) -> &str {
        let value = self.get(language, field);
        if value.is_empty() {
            self.get_default(field)
        } else {
            value
        }
    }

    /// Languages whose required fields are all present and non-empty, in configured order.
    /// 所有必填字段都非空的语言
    pub fn available_languages(&self, required_fields: &[&str]) -> Vec<String> {
        self.languages
            .codes()
            .iter()
            .filter(|code| {
                required_fields
                    .iter()
                    .all(|field| !self.get(code, field).trim().is_empty())
            })
            .cloned()
            .collect()
    }

    /// Replace all stored translation rows of an entity / 替换实体的全部翻译行
    pub async fn save(
        &self,
        conn: &mut SqliteConnection,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<()> {
        sqlx::query("DELETE FROM translations WHERE entity_type = ? AND entity_id = ?")
            .bind(entity_type)
            .bind(entity_id)
            .execute(&mut *conn)
            .await?;

        for (language, fields) in &self.values {
            for (field, value) in fields {
                sqlx::query(
                    "INSERT INTO translations (entity_type, entity_id, language, field, value) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(entity_type)
                .bind(entity_id)
                .bind(language)
                .bind(field)
                .bind(value)
                .execute(&mut *conn)
                .await?;
            }
        }

        Ok(())
    }

    /// Load the translation records of every entity of a type, keyed by entity id.
    /// 批量读取某类实体的翻译
    pub async fn fetch_for_type<'e, E>(
        executor: E,
        entity_type: &str,
        languages: &Languages,
        fields: &[&str],
    ) -> Result<HashMap<i64, Translations>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT entity_id, language, field, value FROM translations WHERE entity_type = ?",
        )
        .bind(entity_type)
        .fetch_all(executor)
        .await?;

        let mut records: HashMap<i64, Translations> = HashMap::new();
        for (entity_id, language, field, value) in rows {
            records
                .entry(entity_id)
                .or_insert_with(|| Translations::blank(languages, fields))
                .set(&language, &field, value);
        }
        Ok(records)
    }
}

/// Encode availability for the `languages` column / 编码可用语言列表
pub fn encode_languages(languages: &[String]) -> Result<String> {
    Ok(serde_json::to_string(languages)?)
}

/// Decode the `languages` column / 解码可用语言列表
pub fn decode_languages(raw: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages() -> Languages {
        Languages::new(vec!["en".into(), "de".into(), "zh-hans".into()], "en")
    }

    #[test]
    fn test_blank_has_every_language_and_field() {
        let t = Translations::blank(&languages(), &["term", "definition"]);
        for code in ["en", "de", "zh-hans"] {
            assert_eq!(t.get(code, "term"), "");
            assert_eq!(t.get(code, "definition"), "");
        }
        assert!(t.available_languages(&["term", "definition"]).is_empty());
    }

    #[test]
    fn test_availability_requires_all_fields() {
        let mut t = Translations::blank(&languages(), &["term", "definition"]);
        t.set("en", "term", "Algorithm");
        assert!(t.available_languages(&["term", "definition"]).is_empty());

        t.set("en", "definition", "<p>A process.</p>");
        t.set("de", "term", "Algorithmus");
        t.set("de", "definition", "   ");
        assert_eq!(t.available_languages(&["term", "definition"]), vec!["en"]);
    }

    #[test]
    fn test_availability_follows_configured_order() {
        let mut t = Translations::blank(&languages(), &["name"]);
        t.set("zh-hans", "name", "算法");
        t.set("en", "name", "Algorithm");
        assert_eq!(t.available_languages(&["name"]), vec!["en", "zh-hans"]);
    }

    #[test]
    fn test_get_or_default_falls_back() {
        let mut t = Translations::blank(&languages(), &["name"]);
        t.set("en", "name", "Sorting");
        assert_eq!(t.get_or_default("de", "name"), "Sorting");
        t.set("de", "name", "Sortieren");
        assert_eq!(t.get_or_default("de", "name"), "Sortieren");
    }

    #[test]
    fn test_languages_column_round_trip() {
        let encoded = encode_languages(&["en".to_string(), "de".to_string()]).unwrap();
        assert_eq!(encoded, r#"["en","de"]"#);
        assert_eq!(decode_languages(&encoded).unwrap(), vec!["en", "de"]);
    }
}
