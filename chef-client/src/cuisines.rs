//! Turn the model's free-text cuisine answer into a list.
//!
//! Models answer in whatever shape they like: numbered lists, bullets, a
//! comma separated line, sometimes JSON. This accepts all of those.

use regex::Regex;
use serde_json::Value;

lazy_static::lazy_static! {
    // "1. Italian", "2) Greek", "3 - Spanish"
    static ref NUMBERED: Regex = Regex::new(r"^\s*\d+\s*[.)-]\s*(.+)$").unwrap();
    // "- Italian", "* Greek", "• Spanish"
    static ref BULLETED: Regex = Regex::new(r"^[-*•]\s+(.+)$").unwrap();
}

/// Split a cuisine answer into individual cuisine names.
pub fn parse_cuisines(text: &str) -> Vec<String> {
    let text = text.trim_start_matches('\u{feff}');
    if let Some(items) = parse_json_list(text) {
        return items;
    }

    let mut items = vec![];
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(caps) = NUMBERED.captures(line).or_else(|| BULLETED.captures(line)) {
            items.push(caps[1].trim().to_string());
        } else if line.contains(',') {
            items.extend(
                line.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        } else {
            items.push(line.to_string());
        }
    }
    items.iter().map(|item| capitalize(item)).collect()
}

/// A bare JSON array of names, or an object with a `cuisines` array.
fn parse_json_list(text: &str) -> Option<Vec<String>> {
    let list = match serde_json::from_str::<Value>(text.trim()).ok()? {
        Value::Array(list) => list,
        Value::Object(mut object) => match object.remove("cuisines")? {
            Value::Array(list) => list,
            _ => return None,
        },
        _ => return None,
    };
    Some(
        list.iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

fn capitalize(item: &str) -> String {
    let mut chars = item.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Case-insensitive substring filter, as used by the cuisine search box.
pub fn filter_cuisines<'a>(items: &'a [String], query: &str) -> Vec<&'a String> {
    let query = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.to_lowercase().contains(&query))
        .collect()
}
