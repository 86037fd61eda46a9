const QUOTES: &[char] = &['"', '\''];

/// Cleans up a scraped token candidate.
///
/// Trims whitespace and surrounding quotes. Empty results and the serialized
/// `null`/`undefined` an evaluated extraction script returns when it found
/// nothing count as "not found".
pub fn normalize_candidate(raw: &str) -> Option<String> {
    let token = raw.trim().trim_matches(QUOTES).trim();
    if token.is_empty() || token == "null" || token == "undefined" {
        None
    } else {
        Some(token.to_string())
    }
}
