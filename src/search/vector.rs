//! Weighted search vectors / 加权搜索向量
//!
//! A vector is a list of (lexeme, position, weight). Combining two vectors
//! shifts the positions of the right-hand side past the left-hand side, so each
//! fragment keeps its own weight instead of being merged into plain text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;

use super::tokenizer::{plain_text, tokenize};

/// Weight label of an indexed fragment, A ranks highest / 权重标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weight {
    A,
    B,
    C,
    D,
}

impl Weight {
    pub const ALL: [Weight; 4] = [Weight::A, Weight::B, Weight::C, Weight::D];

    pub fn label(self) -> char {
        match self {
            Weight::A => 'A',
            Weight::B => 'B',
            Weight::C => 'C',
            Weight::D => 'D',
        }
    }

    /// Column of the full-text table holding this weight's lexemes
    pub fn column(self) -> &'static str {
        match self {
            Weight::A => "weight_a",
            Weight::B => "weight_b",
            Weight::C => "weight_c",
            Weight::D => "weight_d",
        }
    }

    /// Ranking multiplier used at query time / 查询排序权重
    pub fn rank(self) -> f64 {
        match self {
            Weight::A => 1.0,
            Weight::B => 0.4,
            Weight::C => 0.2,
            Weight::D => 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Lexeme {
    token: String,
    position: u32,
    weight: Weight,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchVector {
    lexemes: Vec<Lexeme>,
}

impl SearchVector {
    /// Build a vector from text (HTML allowed) with a single weight / 由文本构建向量
    pub fn new(text: &str, weight: Weight) -> Self {
        let lexemes = tokenize(&plain_text(text))
            .into_iter()
            .zip(1u32..)
            .map(|(token, position)| Lexeme {
                token,
                position,
                weight,
            })
            .collect();
        Self { lexemes }
    }

    /// Highest position in the vector / 最大位置
    pub fn len(&self) -> u32 {
        self.lexemes.iter().map(|l| l.position).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lexemes.is_empty()
    }

    /// Lexemes carrying `weight`, space separated in position order
    pub fn text_for(&self, weight: Weight) -> String {
        self.lexemes
            .iter()
            .filter(|l| l.weight == weight)
            .map(|l| l.token.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Add for SearchVector {
    type Output = SearchVector;

    fn add(mut self, rhs: SearchVector) -> SearchVector {
        let offset = self.len();
        self.lexemes
            .extend(rhs.lexemes.into_iter().map(|mut l| {
                l.position += offset;
                l
            }));
        self
    }
}

impl FromIterator<SearchVector> for SearchVector {
    fn from_iter<I: IntoIterator<Item = SearchVector>>(iter: I) -> Self {
        iter.into_iter().fold(SearchVector::default(), Add::add)
    }
}

/// tsvector-style text: `'lexeme':1A,4B` sorted by lexeme; weight D is left unlabelled
impl fmt::Display for SearchVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut grouped: BTreeMap<&str, Vec<&Lexeme>> = BTreeMap::new();
        for lexeme in &self.lexemes {
            grouped.entry(lexeme.token.as_str()).or_default().push(lexeme);
        }

        let mut first = true;
        for (token, lexemes) in grouped {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "'{}':", token.replace('\'', "''"))?;
            for (i, lexeme) in lexemes.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", lexeme.position)?;
                if lexeme.weight != Weight::D {
                    write!(f, "{}", lexeme.weight.label())?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_keeps_weights_and_shifts_positions() {
        let title = SearchVector::new("Binary numbers", Weight::A);
        let body = SearchVector::new("<p>Numbers in binary</p>", Weight::B);
        let combined = title + body;

        assert_eq!(combined.len(), 5);
        assert_eq!(combined.text_for(Weight::A), "binary numbers");
        assert_eq!(combined.text_for(Weight::B), "numbers in binary");
        assert_eq!(combined.text_for(Weight::C), "");
        assert_eq!(combined.to_string(), "'binary':1A,5B 'in':4B 'numbers':2A,3B");
    }

    #[test]
    fn test_collect_from_fragments() {
        let vector: SearchVector = vec![
            SearchVector::new("one", Weight::A),
            SearchVector::new("", Weight::B),
            SearchVector::new("two", Weight::D),
        ]
        .into_iter()
        .collect();

        assert_eq!(vector.to_string(), "'one':1A 'two':2");
    }

    #[test]
    fn test_empty_vector() {
        let vector = SearchVector::new("  ", Weight::A);
        assert!(vector.is_empty());
        assert_eq!(vector.len(), 0);
        assert_eq!(vector.to_string(), "");
    }
}
