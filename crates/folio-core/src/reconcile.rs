//! Merging freshly derived repository data into previously persisted records.

use std::collections::HashSet;

use crate::catalog::{Category, DownloadedImage, ProjectRecord, RecordId};
use crate::config::Tunables;
use crate::hosting::RepositoryMeta;

pub const DEFAULT_DETAILS: &str = "Imported from GitHub. See README for details.";
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";
pub const UNSPECIFIED_LANGUAGE: &str = "Unspecified";
const TOPICS_AS_TAGS: usize = 3;

/// Everything about a project that can be re-derived from the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreshProject {
    pub repo_id: u64,
    pub title: String,
    pub full_name: String,
    /// Repository name without the owner.
    pub slug: String,
    pub link: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub category: Category,
}

impl FreshProject {
    pub fn from_repository(
        meta: &RepositoryMeta,
        topics: &[String],
        title: String,
        tunables: &Tunables,
    ) -> Self {
        Self {
            repo_id: meta.id,
            title,
            full_name: meta.full_name.clone(),
            slug: meta.name.clone(),
            link: meta.html_url.clone(),
            description: meta.description().map(str::to_string),
            tags: fresh_tags(meta.language.as_deref(), topics),
            category: classify_category(meta.language.as_deref(), topics, tunables),
        }
    }
}

/// Primary language (or `Unspecified`) plus the first three topics, deduplicated.
pub fn fresh_tags(language: Option<&str>, topics: &[String]) -> Vec<String> {
    let language = language
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNSPECIFIED_LANGUAGE);
    let mut tags = vec![language.to_string()];
    for topic in topics.iter().take(TOPICS_AS_TAGS) {
        if !tags.contains(topic) {
            tags.push(topic.clone());
        }
    }
    tags
}

/// `mobile` when a topic or the language carries a mobile marker, else `web`.
pub fn classify_category(
    language: Option<&str>,
    topics: &[String],
    tunables: &Tunables,
) -> Category {
    let topic_hit = topics.iter().any(|topic| {
        let lower = topic.to_lowercase();
        tunables.mobile_topics.iter().any(|marker| *marker == lower)
    });
    let language_hit = language
        .map(str::to_lowercase)
        .is_some_and(|lower| tunables.mobile_languages.iter().any(|marker| *marker == lower));

    if topic_hit || language_hit {
        Category::Mobile
    } else {
        Category::Web
    }
}

/// Index of the persisted record describing `fresh`, skipping records already
/// claimed this run.
///
/// Keys, first hit wins: link, title equal to the full name, title equal to the
/// repository name, then repository id.
pub fn find_match(
    prior: &[ProjectRecord],
    fresh: &FreshProject,
    claimed: &HashSet<usize>,
) -> Option<usize> {
    let keys: [&dyn Fn(&ProjectRecord) -> bool; 4] = [
        &|record: &ProjectRecord| !record.link.is_empty() && record.link == fresh.link,
        &|record: &ProjectRecord| record.title == fresh.full_name,
        &|record: &ProjectRecord| record.title == fresh.slug,
        &|record: &ProjectRecord| {
            record
                .id
                .as_ref()
                .is_some_and(|id| id.matches_repository(fresh.repo_id))
        },
    ];

    keys.iter().find_map(|matches| {
        prior
            .iter()
            .enumerate()
            .find(|(index, record)| !claimed.contains(index) && matches(*record))
            .map(|(index, _)| index)
    })
}

/// Produces the record to persist for this run.
pub fn merge_record(
    previous: Option<&ProjectRecord>,
    fresh: &FreshProject,
    downloaded: Vec<DownloadedImage>,
    preserve_images: bool,
) -> ProjectRecord {
    let mut record = match previous {
        Some(previous) => update_record(previous.clone(), fresh),
        None => new_record(fresh),
    };

    if let Some(first) = downloaded.first() {
        record.thumb = first.url.clone();
        record.images = downloaded;
    } else if !preserve_images {
        record.images.clear();
        record.thumb.clear();
    }

    record
}

fn new_record(fresh: &FreshProject) -> ProjectRecord {
    ProjectRecord {
        id: Some(RecordId::from(fresh.repo_id)),
        title: fresh.title.clone(),
        category: fresh.category.clone(),
        tags: fresh.tags.clone(),
        description: fresh
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        details: Some(DEFAULT_DETAILS.to_string()),
        link: fresh.link.clone(),
        images: Vec::new(),
        thumb: String::new(),
        extra: Default::default(),
    }
}

fn update_record(mut record: ProjectRecord, fresh: &FreshProject) -> ProjectRecord {
    record.title = fresh.title.clone();
    if let Some(description) = &fresh.description {
        record.description = description.clone();
    }
    record.link = fresh.link.clone();
    record.tags = union_tags(&record.tags, &fresh.tags);
    record
        .details
        .get_or_insert_with(|| DEFAULT_DETAILS.to_string());
    record
        .id
        .get_or_insert_with(|| RecordId::from(fresh.repo_id));
    record
}

fn union_tags(previous: &[String], fresh: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    previous
        .iter()
        .chain(fresh)
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}
