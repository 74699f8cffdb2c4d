//! The combined markdown document describing every processed repository.

use crate::reconcile::DEFAULT_DESCRIPTION;
use crate::repository::RepositorySnapshot;

const HEADER: &str =
    "# All Projects Context\n\nThis document contains details of all projects fetched from GitHub.\n\n";
const NO_README: &str = "No README found.";

/// Accumulates one section per repository, in processing order.
#[derive(Debug, Clone, Default)]
pub struct ContextDocument {
    sections: Vec<String>,
}

impl ContextDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: &RepositorySnapshot) {
        self.sections.push(render_section(snapshot));
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        for section in &self.sections {
            out.push_str(section);
        }
        out
    }
}

pub fn render_section(snapshot: &RepositorySnapshot) -> String {
    let meta = &snapshot.meta;
    let readme = snapshot
        .readme
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(NO_README);

    let mut section = format!(
        "## {}\n**Description**: {}\n**URL**: {}\n### README\n{}\n",
        meta.name,
        meta.description().unwrap_or(DEFAULT_DESCRIPTION),
        meta.html_url,
        readme
    );
    for (name, body) in &snapshot.docs {
        section.push_str(&format!("\n### docs/{name}\n{body}\n"));
    }
    section.push_str("\n---\n\n");
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosting::RepositoryMeta;

    fn snapshot() -> RepositorySnapshot {
        RepositorySnapshot::new(RepositoryMeta {
            id: 9,
            name: "todo-app".to_string(),
            full_name: "acme/todo-app".to_string(),
            html_url: "https://github.com/acme/todo-app".to_string(),
            description: Some("Tasks, done.".to_string()),
            language: None,
            fork: false,
            default_branch: None,
        })
    }

    #[test]
    fn section_lists_readme_and_docs() {
        let mut snap = snapshot().with_readme("# Todo Master");
        snap.docs = vec![("setup.md".to_string(), "Run it.".to_string())];

        let section = render_section(&snap);
        assert_eq!(
            section,
            "## todo-app\n**Description**: Tasks, done.\n**URL**: https://github.com/acme/todo-app\n\
             ### README\n# Todo Master\n\n### docs/setup.md\nRun it.\n\n---\n\n"
        );
    }

    #[test]
    fn missing_readme_is_called_out() {
        let mut snap = snapshot();
        snap.meta.description = None;
        let section = render_section(&snap);
        assert!(section.contains("### README\nNo README found.\n"));
        assert!(section.contains("**Description**: No description provided.\n"));
    }

    #[test]
    fn document_starts_with_header_even_when_empty() {
        let mut doc = ContextDocument::new();
        assert!(doc.render().starts_with("# All Projects Context\n"));
        doc.push(&snapshot());
        doc.push(&snapshot());
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.render().matches("## todo-app\n").count(), 2);
    }
}
