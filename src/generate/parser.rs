use regex::Regex;
use std::sync::OnceLock;

fn html_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```html\s*(.*?)\s*```").unwrap())
}

/// Pulls the first ```html fenced block out of a model response. Responses
/// without such a block are taken as HTML as-is.
pub fn extract_html(text: &str) -> String {
    match html_fence().captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Text-only rendering of an HTML document for the terminal preview.
pub fn html_to_text(html: &str) -> String {
    static BLOCKS: OnceLock<Regex> = OnceLock::new();
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    static TAGS: OnceLock<Regex> = OnceLock::new();
    let blocks = BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|head)\b[^>]*>.*?</(script|style|head)>|<!--.*?-->").unwrap()
    });
    let breaks = BREAKS.get_or_init(|| {
        Regex::new(r"(?i)<(br|/p|/div|/li|/h[1-6]|/tr|/section|/header|/footer)\b[^>]*>").unwrap()
    });
    let tags = TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());

    let s = blocks.replace_all(html, "");
    let s = breaks.replace_all(&s, "\n");
    let s = tags.replace_all(&s, "");
    let s = s
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    s.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
