// src/ingest/mod.rs
pub mod providers;
pub mod types;

/// Normalize feed text: decode HTML entities, strip tags, collapse
/// whitespace, cap length. Feed summaries arrive as escaped HTML fragments.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 2000 chars (bounds classification prompt size).
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}
