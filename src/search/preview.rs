//! Search result preview rendering / 搜索结果预览渲染
//!
//! Templates are named `{object_type}.html`. Placeholders:
//! - `{{ key }}` - value is HTML escaped
//! - `{{ key|safe }}` - value inserted as is (already rendered HTML)
//!
//! Unknown keys render as empty strings.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rust_embed::RustEmbed;
use std::path::PathBuf;

use super::{ObjectType, PreviewContext};
use crate::config::AppConfig;
use crate::error::{ContentError, Result};
use crate::utils::escape_html;

/// Default preview templates, compiled into the binary / 内嵌默认模板
#[derive(RustEmbed)]
#[folder = "templates/search/"]
#[include = "*.html"]
struct EmbeddedTemplates;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*(\|\s*safe\s*)?\}\}").expect("valid placeholder pattern")
});

#[derive(Debug, Clone)]
enum TemplateSource {
    Embedded,
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    source: TemplateSource,
}

impl PreviewRenderer {
    pub fn embedded() -> Self {
        Self {
            source: TemplateSource::Embedded,
        }
    }

    /// Templates read from a directory; nothing falls back to the embedded set.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: TemplateSource::Directory(dir.into()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        match config.get_templates_dir() {
            Some(dir) => Self::from_dir(dir),
            None => Self::embedded(),
        }
    }

    fn load_template(&self, object_type: ObjectType) -> Result<String> {
        let filename = format!("{}.html", object_type.as_str());
        match &self.source {
            TemplateSource::Embedded => EmbeddedTemplates::get(&filename)
                .map(|file| String::from_utf8_lossy(&file.data).into_owned())
                .ok_or_else(|| ContentError::MissingTemplate(object_type.as_str().to_string())),
            TemplateSource::Directory(dir) => {
                let path = dir.join(&filename);
                if !path.is_file() {
                    return Err(ContentError::MissingTemplate(object_type.as_str().to_string()));
                }
                std::fs::read_to_string(&path).map_err(|e| ContentError::io(&path, e))
            }
        }
    }

    /// Render the preview of one object / 渲染单个对象的预览
    pub fn render(&self, object_type: ObjectType, context: &PreviewContext) -> Result<String> {
        let template = self.load_template(object_type)?;
        Ok(render_template(&template, context))
    }
}

/// Substitute placeholders in a template / 替换模板占位符
pub fn render_template(template: &str, context: &PreviewContext) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let value = context.get(&caps[1]).map(String::as_str).unwrap_or("");
            if caps.get(2).is_some() {
                value.to_string()
            } else {
                escape_html(value)
            }
        })
        .trim()
        .to_string()
}
