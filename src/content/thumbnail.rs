//! Interactive thumbnail paths / 交互组件缩略图路径
//!
//! Thumbnails are built per language, so the path depends on the language the
//! page is displayed in.

/// Thumbnail filename of an interactive
pub fn thumbnail_filename(slug: &str) -> String {
    format!("{}.png", slug)
}

/// Static directory holding the thumbnails of one language
pub fn thumbnail_base(language: &str) -> String {
    format!("build/img/interactives/thumbnails/{}/", language)
}

/// Static path of an interactive's thumbnail / 缩略图静态路径
pub fn thumbnail_static_path(slug: &str, language: &str) -> String {
    format!("{}{}", thumbnail_base(language), thumbnail_filename(slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_paths() {
        assert_eq!(thumbnail_filename("sorting-algorithms"), "sorting-algorithms.png");
        assert_eq!(thumbnail_base("de"), "build/img/interactives/thumbnails/de/");
        assert_eq!(
            thumbnail_static_path("sorting-algorithms", "zh-hans"),
            "build/img/interactives/thumbnails/zh-hans/sorting-algorithms.png"
        );
    }
}
