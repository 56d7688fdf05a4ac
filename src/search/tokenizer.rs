//! Multilingual tokenizer - uses jieba-rs for CJK word segmentation / 多语言分词器
//!
//! Supports / 支持：
//! - Chinese word segmentation (jieba) / 中文分词
//! - Latin-script words (lowercased) / 英文等拉丁文字
//! - HTML bodies, stripped to plain text before tokenizing / HTML 正文

use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use regex::Regex;

/// Global jieba tokenizer instance / 全局 jieba 分词器实例
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Tokenize text / 对文本进行分词
///
/// Text is split on anything that is not a letter or digit; segments with CJK
/// characters are further cut by jieba (search mode, finer granularity).
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for segment in text.split(|c: char| !c.is_alphanumeric()) {
        if segment.is_empty() {
            continue;
        }
        if contains_cjk(segment) {
            for word in JIEBA.cut_for_search(segment, true) {
                let word = word.trim();
                if word.chars().any(char::is_alphanumeric) {
                    tokens.push(word.to_lowercase());
                }
            }
        } else {
            tokens.push(segment.to_lowercase());
        }
    }

    tokens
}

/// Tokenize search query (consistent with index tokenization) / 对搜索查询进行分词
pub fn tokenize_query(query: &str) -> Vec<String> {
    tokenize(query)
}

/// Check if text contains CJK characters (Chinese, Japanese, Korean) / 检测文本是否包含CJK字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4e00}'..='\u{9fff}' |  // CJK Unified Ideographs
            '\u{3400}'..='\u{4dbf}' |  // CJK Extension A
            '\u{3040}'..='\u{309f}' |  // Hiragana
            '\u{30a0}'..='\u{30ff}' |  // Katakana
            '\u{ac00}'..='\u{d7af}'    // Hangul Syllables
        )
    })
}

/// Strip HTML tags and decode the common entities / 去除 HTML 标签
pub fn plain_text(html: &str) -> String {
    let text = HTML_TAG.replace_all(html, " ");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_english() {
        let tokens = tokenize("Binary Search, explained!");
        assert_eq!(tokens, vec!["binary", "search", "explained"]);
    }

    #[test]
    fn test_tokenize_chinese() {
        let tokens = tokenize("二进制数字");
        assert!(!tokens.is_empty());
        assert!(tokens.iter().all(|t| !t.trim().is_empty()));
    }

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("排序 algorithms");
        assert!(tokens.contains(&"algorithms".to_string()));
        assert!(tokens.len() >= 2);
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("二进制"));
        assert!(!contains_cjk("binary"));
    }

    #[test]
    fn test_plain_text_strips_tags() {
        assert_eq!(
            plain_text("<p>A <strong>bit</strong> &amp; a\n byte.</p>"),
            "A bit & a byte."
        );
    }
}
