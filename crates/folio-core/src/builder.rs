//! Drives one catalog run: name, scan, fetch and reconcile every repository in
//! listing order.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalog::{DownloadedImage, ProjectRecord};
use crate::config::Tunables;
use crate::context::ContextDocument;
use crate::fetcher::download_images;
use crate::hosting::{ImageSource, RepositoryHost, RepositoryMeta};
use crate::images::scan_candidates;
use crate::name::resolve_display_name;
use crate::reconcile::{FreshProject, find_match, merge_record};
use crate::repository::RepositorySnapshot;
use crate::text::{normalize_title, slugify};

/// Counters collected while building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub repositories_seen: usize,
    pub processed: usize,
    pub skipped_forks: usize,
    pub skipped_duplicates: usize,
    pub images_downloaded: usize,
    pub records_written: usize,
    pub retained_stale: usize,
}

#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub records: Vec<ProjectRecord>,
    pub context: ContextDocument,
    pub stats: BuildStats,
}

/// What a finished run produced and where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: BuildStats,
    pub catalog: PathBuf,
    pub context: PathBuf,
    pub assets: PathBuf,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        writeln!(
            f,
            "Repositories: {} seen, {} processed, {} forks skipped, {} duplicates skipped",
            stats.repositories_seen, stats.processed, stats.skipped_forks, stats.skipped_duplicates
        )?;
        writeln!(f, "Images downloaded: {}", stats.images_downloaded)?;
        write!(
            f,
            "Catalog: {} ({} records, {} retained from previous runs)\nContext: {}\nAssets: {}",
            self.catalog.display(),
            stats.records_written,
            stats.retained_stale,
            self.context.display(),
            self.assets.display()
        )
    }
}

/// Owns the per-run state: the output list, the seen-title set and the set of
/// persisted records already claimed.
pub struct CatalogBuilder<'a> {
    host: &'a dyn RepositoryHost,
    images: &'a dyn ImageSource,
    tunables: &'a Tunables,
    raw_base: &'a str,
    assets_dir: &'a Path,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(
        host: &'a dyn RepositoryHost,
        images: &'a dyn ImageSource,
        tunables: &'a Tunables,
        raw_base: &'a str,
        assets_dir: &'a Path,
    ) -> Self {
        Self {
            host,
            images,
            tunables,
            raw_base,
            assets_dir,
        }
    }

    pub fn build(
        &self,
        repositories: Vec<RepositoryMeta>,
        prior: Vec<ProjectRecord>,
    ) -> BuildOutput {
        let mut stats = BuildStats {
            repositories_seen: repositories.len(),
            ..BuildStats::default()
        };
        let mut records = Vec::new();
        let mut context = ContextDocument::new();
        let mut seen_titles = HashSet::new();
        let mut claimed = HashSet::new();

        for meta in repositories {
            if meta.fork && !self.tunables.include_forks {
                stats.skipped_forks += 1;
                continue;
            }

            let mut snapshot = RepositorySnapshot::load_identity(self.host, meta);
            let title = resolve_display_name(&snapshot, self.tunables.title_limit);
            if !seen_titles.insert(normalize_title(&title)) {
                info!(title = %title, repo = %snapshot.meta.full_name, "Skipping duplicate title");
                stats.skipped_duplicates += 1;
                continue;
            }

            info!("Processing: {} ({})", title, snapshot.meta.full_name);
            snapshot.load_details(self.host);
            context.push(&snapshot);

            let fresh =
                FreshProject::from_repository(&snapshot.meta, &snapshot.topics, title, self.tunables);
            let matched = find_match(&prior, &fresh, &claimed);
            if let Some(index) = matched {
                claimed.insert(index);
            }

            let downloaded = self.download(&snapshot);
            stats.images_downloaded += downloaded.len();

            let previous = matched.map(|index| &prior[index]);
            records.push(merge_record(
                previous,
                &fresh,
                downloaded,
                self.tunables.preserve_images,
            ));
            stats.processed += 1;
        }

        if self.tunables.retain_unmatched {
            for (index, record) in prior.into_iter().enumerate() {
                if claimed.contains(&index) {
                    continue;
                }
                if !seen_titles.insert(normalize_title(&record.title)) {
                    info!(title = %record.title, "Dropping unmatched record with a duplicate title");
                    continue;
                }
                records.push(record);
                stats.retained_stale += 1;
            }
        }

        stats.records_written = records.len();
        BuildOutput {
            records,
            context,
            stats,
        }
    }

    fn download(&self, snapshot: &RepositorySnapshot) -> Vec<DownloadedImage> {
        let candidates = scan_candidates(snapshot, self.raw_base, self.tunables);
        let slug = slugify(&snapshot.meta.name);
        let dest_dir = self.assets_dir.join(&slug);
        let url_prefix = asset_url_prefix(self.assets_dir, &slug);

        match download_images(self.images, &candidates, &dest_dir, &url_prefix, self.tunables) {
            Ok(downloaded) => downloaded,
            Err(err) => {
                warn!(
                    repo = %snapshot.meta.full_name,
                    path = %dest_dir.display(),
                    error = %err,
                    "Image download failed"
                );
                Vec::new()
            }
        }
    }
}

/// Site-relative URL folder for a repository's images: `/<asset dir name>/<slug>`.
pub fn asset_url_prefix(assets_dir: &Path, slug: &str) -> String {
    match assets_dir.file_name().and_then(|name| name.to_str()) {
        Some(name) => format!("/{name}/{slug}"),
        None => format!("/{slug}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_prefix_uses_last_asset_component() {
        assert_eq!(
            asset_url_prefix(Path::new("site/public/projects"), "todo-app"),
            "/projects/todo-app"
        );
        assert_eq!(asset_url_prefix(Path::new("/"), "todo-app"), "/todo-app");
    }

    #[test]
    fn summary_mentions_every_output() {
        let summary = RunSummary {
            stats: BuildStats {
                repositories_seen: 3,
                processed: 2,
                skipped_forks: 1,
                records_written: 2,
                ..BuildStats::default()
            },
            catalog: PathBuf::from("public/data/projects.json"),
            context: PathBuf::from("docs/ALL_PROJECTS_CONTEXT.md"),
            assets: PathBuf::from("public/projects"),
        };
        let text = summary.to_string();
        assert!(text.contains("3 seen, 2 processed, 1 forks skipped"));
        assert!(text.contains("public/data/projects.json (2 records"));
        assert!(text.contains("Assets: public/projects"));
    }
}
