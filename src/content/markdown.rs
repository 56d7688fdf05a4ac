//! Markdown source conversion / Markdown 源文件转换
//!
//! The first level-one heading becomes the title; everything else is rendered
//! to HTML as the body.

use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// Converted Markdown document / 转换后的 Markdown 文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownContent {
    pub title: String,
    pub html_string: String,
}

impl MarkdownContent {
    pub fn parse(source: &str) -> Self {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(source, options);

        let mut title = String::new();
        let mut in_title = false;
        let mut title_done = false;
        let mut body = Vec::new();

        for event in parser {
            match event {
                Event::Start(Tag::Heading {
                    level: HeadingLevel::H1,
                    ..
                }) if !title_done => in_title = true,
                Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_title => {
                    in_title = false;
                    title_done = true;
                }
                Event::Text(text) | Event::Code(text) if in_title => title.push_str(&text),
                _ if in_title => {}
                other => body.push(other),
            }
        }

        let mut html_string = String::new();
        html::push_html(&mut html_string, body.into_iter());

        Self {
            title: title.trim().to_string(),
            html_string: html_string.trim().to_string(),
        }
    }
}
