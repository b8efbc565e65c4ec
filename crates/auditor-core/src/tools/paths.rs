use regex::Regex;

use crate::config::dedup_preserving_order;

/// All matches of `pattern` in `text`, deduplicated in first-seen order.
pub fn extract_paths_like(text: &str, pattern: &Regex) -> Vec<String> {
    dedup_preserving_order(pattern.find_iter(text).map(|m| m.as_str().to_string()))
}
