//! Small string helpers shared by the naming, image and catalog code.

use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-_]+").expect("valid slug regex"));
static DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid dash regex"));
static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v?[0-9]+$").expect("valid version regex"));

/// Filesystem and URL safe folder name for a repository.
pub fn slugify(text: &str) -> String {
    let safe = NON_SLUG.replace_all(text.trim(), "-");
    let collapsed = DASH_RUN.replace_all(&safe, "-");
    let slug = collapsed.trim_matches('-').to_lowercase();
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

/// Cross-repository identity key: lowercase alphanumerics without a trailing version.
///
/// `"My App"` and `"MyApp2"` both normalize to `"myapp"`.
pub fn normalize_title(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase();
    VERSION_SUFFIX.replace(&cleaned, "").into_owned()
}

/// Capitalizes the first letter of every run of letters and lowercases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }
    out
}

/// Truncates to at most `limit` characters (not bytes).
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
