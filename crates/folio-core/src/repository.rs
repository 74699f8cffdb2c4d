use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::hosting::{RepositoryHost, RepositoryMeta, TreeEntry};
use crate::name::MANIFEST_PATHS;

/// README locations, tried in order.
pub const README_PATHS: [&str; 3] = ["README.md", "readme.md", "README"];
const DOCS_DIR: &str = "docs";

/// Everything fetched about one repository before any decision logic runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySnapshot {
    pub meta: RepositoryMeta,
    pub topics: Vec<String>,
    pub readme: Option<String>,
    /// Manifest contents keyed by repository path.
    pub files: BTreeMap<String, String>,
    pub tree: Vec<TreeEntry>,
    /// `docs/*.md` files as `(file name, content)`.
    pub docs: Vec<(String, String)>,
}

impl RepositorySnapshot {
    pub fn new(meta: RepositoryMeta) -> Self {
        Self {
            meta,
            topics: Vec::new(),
            readme: None,
            files: BTreeMap::new(),
            tree: Vec::new(),
            docs: Vec::new(),
        }
    }

    pub fn with_readme(mut self, readme: impl Into<String>) -> Self {
        self.readme = Some(readme.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn with_tree(mut self, tree: Vec<TreeEntry>) -> Self {
        self.tree = tree;
        self
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Fetches README, manifests, tree, topics and docs. API failures leave the
    /// corresponding field empty.
    pub fn load(host: &dyn RepositoryHost, meta: RepositoryMeta) -> Self {
        let mut snapshot = Self::load_identity(host, meta);
        snapshot.load_details(host);
        snapshot
    }

    /// Fetches only what name resolution reads: the README and the manifests.
    pub fn load_identity(host: &dyn RepositoryHost, meta: RepositoryMeta) -> Self {
        let mut snapshot = Self::new(meta);
        let repo = &snapshot.meta;

        snapshot.readme = README_PATHS
            .iter()
            .find_map(|path| read_file(host, repo, path));

        let mut files = BTreeMap::new();
        for path in MANIFEST_PATHS {
            if let Some(content) = read_file(host, repo, path) {
                files.insert(path.to_string(), content);
            }
        }
        snapshot.files = files;
        snapshot
    }

    /// Fetches the tree, topics and docs of a repository that will be processed.
    pub fn load_details(&mut self, host: &dyn RepositoryHost) {
        let repo = &self.meta;

        self.tree = match host.tree(repo, repo.branch()) {
            Ok(tree) => tree,
            Err(err) => {
                warn!(repo = %repo.full_name, error = %err, "Failed to list git tree");
                Vec::new()
            }
        };

        self.topics = match host.topics(repo) {
            Ok(topics) => topics,
            Err(err) => {
                warn!(repo = %repo.full_name, error = %err, "Failed to fetch topics");
                Vec::new()
            }
        };

        self.docs = load_docs(host, repo);
    }
}

fn read_file(host: &dyn RepositoryHost, repo: &RepositoryMeta, path: &str) -> Option<String> {
    match host.file_content(repo, path) {
        Ok(content) => content,
        Err(err) => {
            debug!(repo = %repo.full_name, path, error = %err, "File unavailable");
            None
        }
    }
}

fn load_docs(host: &dyn RepositoryHost, repo: &RepositoryMeta) -> Vec<(String, String)> {
    let entries = match host.list_directory(repo, DOCS_DIR) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(repo = %repo.full_name, error = %err, "No docs directory");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter(|entry| entry.is_file && entry.name.ends_with(".md"))
        .filter_map(|entry| {
            read_file(host, repo, &entry.path)
                .filter(|text| !text.is_empty())
                .map(|text| (entry.name, text))
        })
        .collect()
}
