//! Screenshot candidate discovery and scoring.

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::config::Tunables;
use crate::hosting::TreeEntry;
use crate::repository::RepositorySnapshot;

static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[(?P<alt>[^\]]*)\]\((?P<src>[^)]+)\)").expect("valid markdown image regex")
});
static HTML_IMG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid img tag regex"));
static HTML_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)(src|alt)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("valid attribute regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Readme,
    Tree,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCandidate {
    /// Absolute URL; the identity key.
    pub src: String,
    pub caption: String,
    pub score: i32,
    pub source: CandidateSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Where repository-relative paths resolve to.
#[derive(Debug, Clone, Copy)]
pub struct RawLocation<'a> {
    pub raw_base: &'a str,
    pub full_name: &'a str,
    pub branch: &'a str,
}

impl RawLocation<'_> {
    /// Rewrites a relative path to a raw-content URL; absolute URLs pass through.
    pub fn resolve(&self, src: &str) -> String {
        if src.starts_with("http://") || src.starts_with("https://") {
            return src.to_string();
        }
        let cleaned = src.trim_start_matches(['.', '/']);
        format!(
            "{}/{}/{}/{}",
            self.raw_base.trim_end_matches('/'),
            self.full_name,
            self.branch,
            cleaned
        )
    }
}

/// README and tree candidates merged by URL (first seen wins), best score first.
pub fn scan_candidates(
    snapshot: &RepositorySnapshot,
    raw_base: &str,
    tunables: &Tunables,
) -> Vec<ImageCandidate> {
    let location = RawLocation {
        raw_base,
        full_name: &snapshot.meta.full_name,
        branch: snapshot.meta.branch(),
    };

    let readme = snapshot
        .readme
        .as_deref()
        .map(|text| readme_candidates(text, &location, tunables.scores.readme))
        .unwrap_or_default();
    let tree = tree_candidates(&snapshot.tree, &location, tunables);

    let mut merged: IndexMap<String, ImageCandidate> = IndexMap::new();
    for candidate in readme.into_iter().chain(tree) {
        merged.entry(candidate.src.clone()).or_insert(candidate);
    }

    let mut ranked: Vec<ImageCandidate> = merged.into_values().collect();
    // Stable, so equal scores keep insertion order.
    ranked.sort_by(|left, right| right.score.cmp(&left.score));
    ranked
}

/// Markdown `![alt](src "title")` images followed by HTML `<img>` tags.
pub fn readme_candidates(
    readme: &str,
    location: &RawLocation<'_>,
    score: i32,
) -> Vec<ImageCandidate> {
    let mut candidates = Vec::new();

    for captures in MARKDOWN_IMAGE.captures_iter(readme) {
        let Some(src) = captures["src"].split_whitespace().next() else {
            continue;
        };
        let src = src.trim_start_matches('<').trim_end_matches('>');
        if src.is_empty() {
            continue;
        }
        candidates.push(readme_candidate(location.resolve(src), &captures["alt"], score));
    }

    for tag in HTML_IMG.find_iter(readme) {
        let mut src = None;
        let mut alt = "";
        for attr in HTML_ATTR.captures_iter(tag.as_str()) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            if attr[1].eq_ignore_ascii_case("src") {
                src.get_or_insert(value);
            } else {
                alt = value;
            }
        }
        if let Some(src) = src.map(str::trim).filter(|s| !s.is_empty()) {
            candidates.push(readme_candidate(location.resolve(src), alt, score));
        }
    }

    candidates
}

fn readme_candidate(src: String, alt: &str, score: i32) -> ImageCandidate {
    ImageCandidate {
        src,
        caption: alt.trim().to_string(),
        score,
        source: CandidateSource::Readme,
        path: None,
        size: None,
    }
}

/// Image blobs from the tree that are not known to be below the size threshold.
pub fn tree_candidates(
    tree: &[TreeEntry],
    location: &RawLocation<'_>,
    tunables: &Tunables,
) -> Vec<ImageCandidate> {
    tree.iter()
        .filter(|entry| has_image_extension(&entry.path, tunables))
        .filter(|entry| !below_min_size(entry.size, tunables.min_image_size))
        .map(|entry| ImageCandidate {
            src: format!(
                "{}/{}/{}/{}",
                location.raw_base.trim_end_matches('/'),
                location.full_name,
                location.branch,
                entry.path
            ),
            caption: String::new(),
            score: score_tree_path(&entry.path, tunables),
            source: CandidateSource::Tree,
            path: Some(entry.path.clone()),
            size: entry.size,
        })
        .collect()
}

/// Path-based relevance. May be negative.
pub fn score_tree_path(path: &str, tunables: &Tunables) -> i32 {
    let lower = path.to_lowercase();
    let weights = &tunables.scores;
    let mut score = weights.tree_base;
    if contains_any(&lower, &tunables.screenshot_keywords) {
        score += weights.keyword_bonus;
    }
    if contains_any(&lower, &tunables.asset_dir_markers) {
        score += weights.asset_dir_bonus;
    }
    if contains_any(&lower, &tunables.icon_markers) {
        score -= weights.icon_penalty;
    }
    score
}

/// Unknown (or zero) sizes pass.
fn below_min_size(size: Option<u64>, min: u64) -> bool {
    matches!(size, Some(bytes) if bytes > 0 && bytes < min)
}

fn has_image_extension(path: &str, tunables: &Tunables) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| tunables.is_image_extension(&format!(".{ext}")))
        .unwrap_or(false)
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosting::RepositoryMeta;

    const RAW: &str = "https://raw.githubusercontent.com";

    fn location() -> RawLocation<'static> {
        RawLocation {
            raw_base: RAW,
            full_name: "acme/todo-app",
            branch: "main",
        }
    }

    fn snapshot() -> RepositorySnapshot {
        RepositorySnapshot::new(RepositoryMeta {
            id: 1,
            name: "todo-app".to_string(),
            full_name: "acme/todo-app".to_string(),
            html_url: "https://github.com/acme/todo-app".to_string(),
            description: None,
            language: Some("TypeScript".to_string()),
            fork: false,
            default_branch: Some("main".to_string()),
        })
    }

    #[test]
    fn markdown_images_resolve_relative_paths_and_drop_titles() {
        let readme = "![Screenshot](./docs/shot.png \"Main view\")\n![](https://cdn.example.com/a.gif)";
        let found = readme_candidates(readme, &location(), 50);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].src, format!("{RAW}/acme/todo-app/main/docs/shot.png"));
        assert_eq!(found[0].caption, "Screenshot");
        assert_eq!(found[1].src, "https://cdn.example.com/a.gif");
        assert!(found.iter().all(|c| c.score == 50 && c.source == CandidateSource::Readme));
    }

    #[test]
    fn html_img_tags_with_any_attribute_order() {
        let readme = r#"<p><img alt="Board" width="400" src="assets/board.jpg"></p>
<IMG SRC='https://x.io/y.png'>"#;
        let found = readme_candidates(readme, &location(), 50);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].src, format!("{RAW}/acme/todo-app/main/assets/board.jpg"));
        assert_eq!(found[0].caption, "Board");
        assert_eq!(found[1].src, "https://x.io/y.png");
        assert_eq!(found[1].caption, "");
    }

    #[test]
    fn prefixed_attributes_are_not_src_or_alt() {
        let readme = r#"<img data-src="lazy.png" data-alt="Lazy" src="docs/real.png" alt="Real">"#;
        let found = readme_candidates(readme, &location(), 50);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].src, format!("{RAW}/acme/todo-app/main/docs/real.png"));
        assert_eq!(found[0].caption, "Real");
    }

    #[test]
    fn tree_scoring_rewards_screenshots_and_penalizes_icons() {
        let tunables = Tunables::default();
        assert_eq!(score_tree_path("docs/screenshot-1.png", &tunables), 33);
        assert_eq!(score_tree_path("src/res/photo.png", &tunables), 10);
        assert_eq!(score_tree_path("public/logo.png", &tunables), 10);
        assert_eq!(score_tree_path("res/ic/launcher_icon.png", &tunables), 2);
    }

    #[test]
    fn tree_filter_drops_small_and_non_images_but_keeps_unknown_sizes() {
        let tunables = Tunables::default();
        let tree = vec![
            TreeEntry::new("docs/big.PNG", Some(50_000)),
            TreeEntry::new("docs/tiny.png", Some(900)),
            TreeEntry::new("docs/unknown.webp", None),
            TreeEntry::new("docs/notes.md", Some(50_000)),
            TreeEntry::new("Makefile", Some(50_000)),
        ];
        let found = tree_candidates(&tree, &location(), &tunables);
        let paths: Vec<_> = found.iter().filter_map(|c| c.path.as_deref()).collect();
        assert_eq!(paths, vec!["docs/big.PNG", "docs/unknown.webp"]);
        assert_eq!(found[0].size, Some(50_000));
    }

    #[test]
    fn readme_candidate_wins_over_tree_duplicate() {
        let snap = snapshot()
            .with_readme("# Todo Master\n![Screenshot](docs/shot.png)\n")
            .with_tree(vec![
                TreeEntry::new("docs/shot.png", Some(50_000)),
                TreeEntry::new("fastlane/screenshots/home.png", Some(80_000)),
            ]);
        let ranked = scan_candidates(&snap, RAW, &Tunables::default());
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].src, format!("{RAW}/acme/todo-app/main/docs/shot.png"));
        assert_eq!(ranked[0].score, 50);
        assert_eq!(ranked[0].source, CandidateSource::Readme);
        assert_eq!(ranked[1].source, CandidateSource::Tree);
        assert_eq!(ranked[1].score, 33);
    }

    #[test]
    fn equal_scores_keep_discovery_order() {
        let mut tunables = Tunables::default();
        tunables.scores.readme = 10;
        let snap = snapshot()
            .with_readme("![a](https://cdn.example.com/a.png)")
            .with_tree(vec![TreeEntry::new("src/b.png", None)]);
        let ranked = scan_candidates(&snap, RAW, &tunables);
        assert_eq!(ranked[0].src, "https://cdn.example.com/a.png");
        assert_eq!(ranked[1].path.as_deref(), Some("src/b.png"));
    }
}
