/// Small string helpers shared by content types and previews / 通用字符串工具

/// Escape text for inclusion in HTML / HTML 转义
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Site URL for a language, e.g. `/de/chapters/algorithms/` / 生成站点 URL
pub fn site_url(language: &str, segments: &[&str]) -> String {
    let mut url = format!("/{}/", language);
    for segment in segments.iter().filter(|s| !s.is_empty()) {
        url.push_str(segment.trim_matches('/'));
        url.push('/');
    }
    url
}
