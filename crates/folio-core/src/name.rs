//! Display-name resolution.
//!
//! Each source is a pure function over the snapshot that only yields non-empty
//! names within the length limit. The first source with a name wins, otherwise
//! the repository slug is title-cased.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::repository::RepositorySnapshot;
use crate::text::title_case;

const JSON_MANIFESTS: [&str; 2] = ["package.json", "app.json"];
const JSON_NAME_KEYS: [&str; 2] = ["displayName", "name"];
const PUBSPEC: &str = "pubspec.yaml";
const ANDROID_STRINGS: [&str; 2] = [
    "app/src/main/res/values/strings.xml",
    "android/app/src/main/res/values/strings.xml",
];

/// Every file the name sources may read, in lookup order.
pub const MANIFEST_PATHS: [&str; 5] = [
    JSON_MANIFESTS[0],
    JSON_MANIFESTS[1],
    PUBSPEC,
    ANDROID_STRINGS[0],
    ANDROID_STRINGS[1],
];

static H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").expect("valid heading regex"));
static PUBSPEC_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^name:[ \t]*([A-Za-z0-9_\- ]+)").expect("valid pubspec regex")
});
static APP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<string\s+name="app_name">([^<]+)</string>"#).expect("valid strings.xml regex")
});

pub type NameSource = fn(&RepositorySnapshot, usize) -> Option<String>;

/// Name sources in priority order.
pub const NAME_SOURCES: [(&str, NameSource); 4] = [
    ("readme-heading", readme_heading),
    ("json-manifest", json_manifest_name),
    ("pubspec", pubspec_name),
    ("android-strings", android_app_name),
];

/// Human display name for a repository. Never empty.
pub fn resolve_display_name(snapshot: &RepositorySnapshot, max_len: usize) -> String {
    NAME_SOURCES
        .iter()
        .find_map(|(_, source)| source(snapshot, max_len))
        .unwrap_or_else(|| fallback_name(&snapshot.meta.name))
}

/// Repository slug with hyphens as spaces, each word capitalized.
pub fn fallback_name(slug: &str) -> String {
    let titled = title_case(&slug.replace('-', " "));
    let trimmed = titled.trim();
    if !trimmed.is_empty() {
        trimmed.to_string()
    } else if !slug.trim().is_empty() {
        slug.trim().to_string()
    } else {
        "Untitled Project".to_string()
    }
}

fn usable(name: &str, max_len: usize) -> Option<String> {
    let name = name.trim();
    (!name.is_empty() && name.chars().count() <= max_len).then(|| name.to_string())
}

/// First `# Title` line of the README.
pub fn readme_heading(snapshot: &RepositorySnapshot, max_len: usize) -> Option<String> {
    let readme = snapshot.readme.as_deref()?;
    let captures = H1.captures(readme)?;
    usable(&captures[1], max_len)
}

/// `displayName`, then `name`, from `package.json` and then `app.json`. A value
/// over the limit moves on to the next key.
pub fn json_manifest_name(snapshot: &RepositorySnapshot, max_len: usize) -> Option<String> {
    JSON_MANIFESTS.iter().find_map(|path| {
        let raw = snapshot.file(path)?;
        let data: Value = serde_json::from_str(raw).ok()?;
        JSON_NAME_KEYS.iter().find_map(|key| {
            data.get(key)
                .and_then(Value::as_str)
                .and_then(|value| usable(value, max_len))
        })
    })
}

pub fn pubspec_name(snapshot: &RepositorySnapshot, max_len: usize) -> Option<String> {
    let raw = snapshot.file(PUBSPEC)?;
    let captures = PUBSPEC_NAME.captures(raw)?;
    usable(&captures[1], max_len)
}

/// `app_name` string resource from either conventional Android location.
pub fn android_app_name(snapshot: &RepositorySnapshot, max_len: usize) -> Option<String> {
    ANDROID_STRINGS.iter().find_map(|path| {
        let raw = snapshot.file(path)?;
        let captures = APP_NAME.captures(raw)?;
        usable(&captures[1], max_len)
    })
}
