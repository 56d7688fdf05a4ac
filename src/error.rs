//! Error types for the content pipeline / 内容管道错误类型

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContentError>;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find required file {0} for the default language")]
    MissingDefaultFile(PathBuf),

    #[error("Could not parse YAML file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML file {0} is empty")]
    EmptyYamlFile(PathBuf),

    /// A structured field holds a value outside its accepted set.
    #[error("Invalid value for {field} in {path}.\nExpected:\n{expected}")]
    InvalidYamlValue {
        path: PathBuf,
        field: String,
        expected: String,
    },

    #[error("No preview template found for object type '{0}'")]
    MissingTemplate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ContentError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Invalid enumerated value, listing every accepted value / 无效枚举值
    pub fn invalid_value(path: &Path, field: &str, valid: &[String]) -> Self {
        let mut expected = String::from("One of the following values:\n");
        for value in valid {
            expected.push_str(&format!("- {}\n", value));
        }
        Self::InvalidYamlValue {
            path: path.to_path_buf(),
            field: field.to_string(),
            expected,
        }
    }
}
