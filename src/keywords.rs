// src/keywords.rs
use crate::ingest::types::FeedItem;

/// First configured keyword found in the item's title or summary,
/// case-insensitively. List order is the tie-break: the earliest configured
/// keyword wins. An empty list matches nothing.
pub fn first_match<'a>(item: &FeedItem, keywords: &'a [String]) -> Option<&'a str> {
    let haystack = format!("{} {}", item.title, item.summary).to_lowercase();
    keywords
        .iter()
        .find(|kw| haystack.contains(&kw.to_lowercase()))
        .map(String::as_str)
}
