//! Application configuration module / 应用配置模块
//!
//! Manages configuration loaded from config.json.
//! Creates default config file on first run / 首次运行时创建默认配置文件
//!
//! The loaded [`AppConfig`] is passed explicitly to loaders and the indexer;
//! there is no process-wide configuration instance.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fallback shown when `GIT_SHA` is not set / 未设置 GIT_SHA 时的默认值
pub const DEFAULT_GIT_SHA: &str = "local development";

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database configuration / 数据库配置
    pub database: DatabaseConfig,
    /// Content source configuration / 内容源配置
    pub content: ContentConfig,
    /// Search configuration / 搜索配置
    pub search: SearchConfig,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Main database file path (relative to data_dir) / 主数据库文件路径
    pub db_file: String,
}

/// A site language / 站点语言
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Language code, e.g. "en" or "zh-hans" / 语言代码
    pub code: String,
    /// Display name / 显示名称
    pub name: String,
}

impl Language {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

/// Content source configuration / 内容源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Root directory of the content sources / 内容源根目录
    pub content_dir: String,
    /// Active languages, in display order / 启用的语言（按显示顺序）
    pub languages: Vec<Language>,
    /// Language whose sources drive slug discovery / 默认语言
    pub default_language: String,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Directory holding `{object_type}.html` preview templates.
    /// Empty means the templates embedded in the binary / 为空时使用内嵌模板
    pub templates_dir: String,
    /// Default number of results returned by a query / 默认返回结果数
    pub result_limit: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "fieldguide.db".to_string(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            languages: vec![
                Language::new("en", "English"),
                Language::new("de", "Deutsch"),
                Language::new("es", "Español"),
                Language::new("zh-hans", "简体中文"),
            ],
            default_language: "en".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            templates_dir: String::new(),
            result_limit: 20,
        }
    }
}

impl ContentConfig {
    /// Language codes in configured order / 按配置顺序的语言代码
    pub fn language_codes(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.code.clone()).collect()
    }

    /// Check whether a language code is configured / 检查语言代码是否有效
    pub fn is_valid_language(&self, code: &str) -> bool {
        self.languages.iter().any(|l| l.code == code)
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the content root directory / 获取内容根目录
    pub fn get_content_dir(&self) -> PathBuf {
        PathBuf::from(&self.content.content_dir)
    }

    /// Get the preview template directory, if one is configured / 获取预览模板目录
    pub fn get_templates_dir(&self) -> Option<PathBuf> {
        if self.search.templates_dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.search.templates_dir))
        }
    }

    /// Check invariants the pipeline relies on / 校验配置
    pub fn validate(&self) -> Result<(), String> {
        if self.content.languages.is_empty() {
            return Err("At least one language must be configured".to_string());
        }
        if !self.content.is_valid_language(&self.content.default_language) {
            return Err(format!(
                "Default language '{}' is not one of the configured languages: {}",
                self.content.default_language,
                self.content.language_codes().join(", ")
            ));
        }
        Ok(())
    }
}

/// Get the config file path / 获取配置文件路径
pub fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(config_path: &Path) -> Result<AppConfig, String> {
    let config = if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        config
    } else {
        let config = AppConfig::default();
        save_config(config_path, &config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        config
    };

    config.validate()?;
    Ok(config)
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config_path: &Path, config: &AppConfig) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

/// Build/version identifier for display in the site footer / 构建版本标识
pub fn git_sha() -> String {
    std::env::var("GIT_SHA")
        .ok()
        .filter(|sha| !sha.is_empty())
        .unwrap_or_else(|| DEFAULT_GIT_SHA.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.content.language_codes()[0], "en");
    }

    #[test]
    fn test_unknown_default_language_rejected() {
        let mut config = AppConfig::default();
        config.content.default_language = "xx".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("'xx'"));
        assert!(err.contains("zh-hans"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let created = load_config(&path).unwrap();
        assert!(path.exists());

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.content.languages, created.content.languages);
        assert_eq!(reloaded.database.db_file, "fieldguide.db");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"content": {"content_dir": "site"}}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.content.content_dir, "site");
        assert_eq!(config.content.default_language, "en");
        assert!(config.get_templates_dir().is_none());
    }
}
