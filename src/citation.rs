use regex::Regex;
use std::sync::LazyLock;

/// Field that may carry a `Citation Key: <key>` line, as written by Better BibTeX.
pub const EXTRA_FIELD: &str = "extra";

#[allow(clippy::expect_used)]
static CITATION_KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".*Citation Key: (\w+)").expect("citation key regex is valid") // Static pattern, safe to panic
});

/// The citation key embedded in free text, if any.
pub fn extract_citation_key(text: &str) -> Option<&str> {
    CITATION_KEY_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The ref to export under: the embedded override when the extra field has
/// one, the item key otherwise.
pub fn resolve_ref<'a>(extra: Option<&'a str>, item_key: &'a str) -> &'a str {
    extra.and_then(extract_citation_key).unwrap_or(item_key)
}
