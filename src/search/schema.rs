//! Search index schema and model registry / 搜索索引结构与模型注册表

use serde::{Deserialize, Serialize};

use super::ObjectType;

/// One row of the search index / 搜索索引行
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchItem {
    pub id: i64,
    pub object_type: String,
    pub object_type_name: String,
    pub object_id: i64,
    pub language: String,
    pub boost: f64,
    pub result_preview: String,
    /// Position in the rebuild run, used to break ranking ties / 排序位置
    #[sqlx(rename = "item_order")]
    pub order: i64,
    /// tsvector-style text of the weighted vector / 加权向量文本
    pub search_vector: String,
}

/// Registry entry: which instances of a model are indexed and how they rank.
#[derive(Debug, Clone, Copy)]
pub struct SearchClass {
    pub object_type: ObjectType,
    /// SQL condition on the model's table, applied when fetching instances
    pub filter: Option<&'static str>,
    pub boost: f64,
}

/// Indexed models, in indexing order / 按索引顺序排列的模型
pub const SEARCH_CLASSES: &[SearchClass] = &[
    SearchClass {
        object_type: ObjectType::Chapter,
        filter: None,
        boost: 1.6,
    },
    SearchClass {
        object_type: ObjectType::ChapterSection,
        filter: None,
        boost: 1.2,
    },
    SearchClass {
        object_type: ObjectType::Interactive,
        filter: Some("is_interactive = 1"),
        boost: 1.3,
    },
    SearchClass {
        object_type: ObjectType::GlossaryTerm,
        filter: None,
        boost: 1.0,
    },
];
