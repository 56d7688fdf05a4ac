//! Search module - full-text index over loaded content / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - Content types expose what to index through the [`Indexable`] trait
//! - `db_index` only provides storage primitives: clear, insert, search, stats
//! - `indexer` controls the rebuild flow: wipe, then re-index the registry in order
//!
//! Index features / 索引特性：
//! - SQLite FTS5, one column per weight label (A–D), weighted BM25 ranking
//! - Multilingual tokenization (jieba for CJK text)
//! - One row per instance per active language

pub mod db_index;
pub mod indexer;
pub mod preview;
pub mod schema;
pub mod tokenizer;
pub mod vector;

use std::collections::BTreeMap;
use std::fmt;

pub use db_index::{IndexStats, SearchHit, SearchIndex};
pub use indexer::{RebuildSummary, SearchIndexer};
pub use preview::PreviewRenderer;
pub use schema::{SearchClass, SearchItem, SEARCH_CLASSES};
pub use vector::{SearchVector, Weight};

/// Weight label → text to index / 权重 → 文本
pub type IndexContents = BTreeMap<Weight, String>;

/// Values made available to a preview template / 预览模板上下文
pub type PreviewContext = BTreeMap<&'static str, String>;

/// Kinds of searchable content / 可搜索的内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Chapter,
    ChapterSection,
    Interactive,
    GlossaryTerm,
}

impl ObjectType {
    /// Identifier stored in index rows and used to pick the preview template
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Chapter => "chapter",
            ObjectType::ChapterSection => "chapter_section",
            ObjectType::Interactive => "interactive",
            ObjectType::GlossaryTerm => "glossary_term",
        }
    }

    pub fn verbose_name(self) -> &'static str {
        match self {
            ObjectType::Chapter => "chapter",
            ObjectType::ChapterSection => "chapter section",
            ObjectType::Interactive => "interactive",
            ObjectType::GlossaryTerm => "glossary term",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability every searchable content type must provide / 可索引内容必须实现的能力
pub trait Indexable: fmt::Display + Send + Sync {
    fn object_type(&self) -> ObjectType;

    fn object_id(&self) -> i64;

    /// Weighted text fragments for one language / 某语言的加权文本
    fn index_contents(&self, language: &str) -> IndexContents;

    /// Context for the `{object_type}.html` preview template
    fn preview_context(&self, language: &str) -> PreviewContext;
}
