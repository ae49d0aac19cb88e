//! URL slugs.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap_or_else(|_| unreachable!()));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").unwrap_or_else(|_| unreachable!()));

/// Convert a name into a URL slug.
///
/// Drops non-ASCII characters and lowercases the rest. Then drops
/// everything that is not a word character, whitespace or a hyphen,
/// collapses whitespace and hyphen runs into a single `-` and trims
/// leading and trailing `-` and `_`.
#[must_use]
pub fn slugify(value: &str) -> String {
    let lowered: String = value
        .chars()
        .filter(char::is_ascii)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let joined = SEPARATORS.replace_all(cleaned.trim(), "-");
    joined.trim_matches(|c| c == '-' || c == '_').to_string()
}
