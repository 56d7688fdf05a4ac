//! 数据库搜索索引 - SQLite FTS5
//!
//! 存储方案：
//! - search_items 表：每个对象每种语言一行（预览HTML、排序位置、加权向量文本）
//! - search_items_fts 虚表：rowid = search_items.id，每个权重标签一列
//! - search_meta 表：索引更新时间等信息
//!
//! 排序：bm25 按列加权（A=1.0, B=0.4, C=0.2, D=0.1）乘以对象类型的 boost，
//! 分数相同时按 item_order 升序。

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

use super::schema::SearchItem;
use super::tokenizer::tokenize_query;
use super::vector::{SearchVector, Weight};
use super::ObjectType;
use crate::error::Result;

/// 搜索结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub object_type: String,
    pub object_type_name: String,
    pub object_id: i64,
    pub language: String,
    pub result_preview: String,
    pub order: i64,
    pub score: f64,
}

/// 索引统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub item_count: u64,
    pub last_updated: Option<i64>,
}

/// Row to be written by the indexer / 待写入的索引行
#[derive(Debug, Clone)]
pub struct NewSearchItem<'a> {
    pub object_type: ObjectType,
    pub object_id: i64,
    pub language: &'a str,
    pub boost: f64,
    pub result_preview: &'a str,
    pub order: i64,
}

/// 数据库搜索索引
pub struct SearchIndex {
    db: Pool<Sqlite>,
}

impl SearchIndex {
    /// 使用现有数据库连接池
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// 初始化表结构
    /// 只在表不存在时创建，不删除已有数据
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                object_type TEXT NOT NULL,
                object_type_name TEXT NOT NULL,
                object_id INTEGER NOT NULL,
                language TEXT NOT NULL,
                boost REAL NOT NULL DEFAULT 1.0,
                result_preview TEXT NOT NULL,
                item_order INTEGER NOT NULL,
                search_vector TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_search_items_language ON search_items(language)")
            .execute(&self.db)
            .await?;

        // 全文索引：每个权重一列
        sqlx::query(
            "CREATE VIRTUAL TABLE IF NOT EXISTS search_items_fts USING fts5(weight_a, weight_b, weight_c, weight_d)",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 清空索引，返回删除的行数
    pub async fn clear(&self) -> Result<u64> {
        sqlx::query("DELETE FROM search_items_fts").execute(&self.db).await?;
        let result = sqlx::query("DELETE FROM search_items").execute(&self.db).await?;
        Ok(result.rows_affected())
    }

    /// 写入一行索引，返回行ID
    pub async fn insert(&self, item: &NewSearchItem<'_>, vector: &SearchVector) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO search_items
                (object_type, object_type_name, object_id, language, boost, result_preview, item_order, search_vector)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.object_type.as_str())
        .bind(item.object_type.verbose_name())
        .bind(item.object_id)
        .bind(item.language)
        .bind(item.boost)
        .bind(item.result_preview)
        .bind(item.order)
        .bind(vector.to_string())
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO search_items_fts (rowid, weight_a, weight_b, weight_c, weight_d) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(vector.text_for(Weight::A))
        .bind(vector.text_for(Weight::B))
        .bind(vector.text_for(Weight::C))
        .bind(vector.text_for(Weight::D))
        .execute(&self.db)
        .await?;

        Ok(id)
    }

    /// 设置索引更新时间 / Set index last updated time
    pub async fn set_last_updated(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT OR REPLACE INTO search_meta (key, value) VALUES ('last_updated', ?)")
            .bind(now.to_string())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// 获取索引更新时间 / Get index last updated time
    pub async fn get_last_updated(&self) -> Option<i64> {
        let result: Option<(String,)> =
            sqlx::query_as("SELECT value FROM search_meta WHERE key = 'last_updated'")
                .fetch_optional(&self.db)
                .await
                .ok()
                .flatten();

        result.and_then(|(v,)| v.parse::<i64>().ok())
    }

    /// 全部索引行，按排序位置
    pub async fn items(&self) -> Result<Vec<SearchItem>> {
        let items = sqlx::query_as::<_, SearchItem>(
            r#"
            SELECT id, object_type, object_type_name, object_id, language, boost,
                   result_preview, item_order, search_vector
            FROM search_items
            ORDER BY item_order ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    /// 搜索（FTS5 MATCH + 加权 bm25 × boost）
    pub async fn search(&self, query: &str, language: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let Some(match_expr) = build_match_expression(query) else {
            return Ok(Vec::new());
        };

        let sql = format!(
            r#"
            SELECT s.object_type, s.object_type_name, s.object_id, s.language,
                   s.result_preview, s.item_order,
                   -bm25(search_items_fts, {}, {}, {}, {}) * s.boost AS score
            FROM search_items_fts
            JOIN search_items s ON s.id = search_items_fts.rowid
            WHERE search_items_fts MATCH ? AND s.language = ?
            ORDER BY score DESC, s.item_order ASC
            LIMIT ?
            "#,
            Weight::A.rank(),
            Weight::B.rank(),
            Weight::C.rank(),
            Weight::D.rank(),
        );

        let rows = sqlx::query(&sql)
            .bind(&match_expr)
            .bind(language)
            .bind(limit as i64)
            .fetch_all(&self.db)
            .await?;

        let hits = rows
            .iter()
            .map(|row| SearchHit {
                object_type: row.get("object_type"),
                object_type_name: row.get("object_type_name"),
                object_id: row.get("object_id"),
                language: row.get("language"),
                result_preview: row.get("result_preview"),
                order: row.get("item_order"),
                score: row.get("score"),
            })
            .collect();
        Ok(hits)
    }

    /// 获取统计信息
    pub async fn get_stats(&self) -> IndexStats {
        let count: std::result::Result<i64, _> = sqlx::query_scalar("SELECT COUNT(*) FROM search_items")
            .fetch_one(&self.db)
            .await;

        IndexStats {
            item_count: count.map(|c| c as u64).unwrap_or(0),
            last_updated: self.get_last_updated().await,
        }
    }
}

/// All query tokens must match; each is quoted so FTS5 syntax in user input is inert.
fn build_match_expression(query: &str) -> Option<String> {
    let tokens = tokenize_query(query);
    if tokens.is_empty() {
        return None;
    }
    Some(
        tokens
            .iter()
            .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" "),
    )
}
