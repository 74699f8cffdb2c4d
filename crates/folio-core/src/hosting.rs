use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::HostSettings;
use crate::error::FolioError;

const PAGE_SIZE: usize = 100;
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Repository attributes as reported by the hosting API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryMeta {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
}

impl RepositoryMeta {
    /// Default branch, or `main` when the API reports none.
    pub fn branch(&self) -> &str {
        match self.default_branch.as_deref() {
            Some(branch) if !branch.trim().is_empty() => branch,
            _ => "main",
        }
    }

    /// Description with blank values collapsed to `None`.
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// A blob in the recursive git tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub is_file: bool,
}

/// Read access to the authenticated user's repositories.
pub trait RepositoryHost {
    /// Repositories of the authenticated user, most recently updated first.
    fn list_repositories(&self) -> Result<Vec<RepositoryMeta>, FolioError>;

    /// UTF-8 (lossy) content of a file on the default branch, `None` when absent.
    fn file_content(&self, repo: &RepositoryMeta, path: &str)
    -> Result<Option<String>, FolioError>;

    fn list_directory(
        &self,
        repo: &RepositoryMeta,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, FolioError>;

    /// Every blob reachable from `branch`.
    fn tree(&self, repo: &RepositoryMeta, branch: &str) -> Result<Vec<TreeEntry>, FolioError>;

    fn topics(&self, repo: &RepositoryMeta) -> Result<Vec<String>, FolioError>;
}

/// Downloads image bytes. Anything but a 200 response is an error.
pub trait ImageSource {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FolioError>;
}

/// Blocking GitHub REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    token: String,
    api_base: String,
    auth_hosts: Vec<String>,
    image_timeout: Duration,
}

impl GitHubClient {
    pub fn new(
        token: String,
        settings: &HostSettings,
        image_timeout: Duration,
    ) -> Result<Self, FolioError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(API_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            token,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            auth_hosts: settings
                .auth_hosts
                .iter()
                .map(|host| host.to_ascii_lowercase())
                .collect(),
            image_timeout,
        })
    }

    fn api_get(&self, path_and_query: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.api_base, path_and_query))
            .header(ACCEPT, "application/vnd.github+json")
            .bearer_auth(&self.token)
    }

    fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, FolioError> {
        let response = self.api_get(path_and_query).send()?;
        let response = ensure_success(response)?;
        Ok(response.json::<T>()?)
    }

    fn contents(
        &self,
        repo: &RepositoryMeta,
        path: &str,
    ) -> Result<Option<ContentsPayload>, FolioError> {
        let route = format!("/repos/{}/contents/{}", repo.full_name, encode_path(path));
        match self.get_json::<ContentsPayload>(&route) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn should_authenticate(&self, url: &str) -> bool {
        should_authenticate(&self.auth_hosts, url)
    }
}

impl RepositoryHost for GitHubClient {
    fn list_repositories(&self) -> Result<Vec<RepositoryMeta>, FolioError> {
        let mut repos = Vec::new();
        let mut page = 1usize;
        loop {
            let route = format!(
                "/user/repos?sort=updated&direction=desc&per_page={PAGE_SIZE}&page={page}"
            );
            let batch: Vec<RepositoryMeta> = self.get_json(&route)?;
            let count = batch.len();
            repos.extend(batch);
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        debug!(count = repos.len(), "Listed repositories");
        Ok(repos)
    }

    fn file_content(
        &self,
        repo: &RepositoryMeta,
        path: &str,
    ) -> Result<Option<String>, FolioError> {
        match self.contents(repo, path)? {
            Some(ContentsPayload::File(file)) => {
                let bytes = decode_content(&file.content, file.encoding.as_deref())?;
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            }
            Some(ContentsPayload::Directory(_)) | None => Ok(None),
        }
    }

    fn list_directory(
        &self,
        repo: &RepositoryMeta,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, FolioError> {
        match self.contents(repo, path)? {
            Some(ContentsPayload::Directory(entries)) => Ok(entries
                .into_iter()
                .map(|entry| DirectoryEntry {
                    is_file: entry.kind == "file",
                    name: entry.name,
                    path: entry.path,
                })
                .collect()),
            Some(ContentsPayload::File(_)) | None => Ok(Vec::new()),
        }
    }

    fn tree(&self, repo: &RepositoryMeta, branch: &str) -> Result<Vec<TreeEntry>, FolioError> {
        let route = format!(
            "/repos/{}/git/trees/{}?recursive=1",
            repo.full_name,
            urlencoding::encode(branch)
        );
        let payload: TreePayload = self.get_json(&route)?;
        if payload.truncated {
            debug!(repo = %repo.full_name, "Git tree listing was truncated");
        }
        Ok(payload
            .tree
            .into_iter()
            .filter(|entry| entry.kind == "blob")
            .map(|entry| TreeEntry::new(entry.path, entry.size))
            .collect())
    }

    fn topics(&self, repo: &RepositoryMeta) -> Result<Vec<String>, FolioError> {
        let payload: TopicsPayload = self.get_json(&format!("/repos/{}/topics", repo.full_name))?;
        Ok(payload.names)
    }
}

impl ImageSource for GitHubClient {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FolioError> {
        let mut request = self.client.get(url).timeout(self.image_timeout);
        if self.should_authenticate(url) {
            request = request.bearer_auth(&self.token);
        }
        let response = request.send()?;
        if response.status().as_u16() != 200 {
            return Err(FolioError::Api {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

fn ensure_success(response: Response) -> Result<Response, FolioError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(FolioError::Api {
            status: response.status().as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// Percent-encodes each segment of a repository path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_content(content: &str, encoding: Option<&str>) -> Result<Vec<u8>, FolioError> {
    match encoding {
        Some("base64") | None => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map_err(|err| FolioError::Decode(err.to_string()))
        }
        Some(other) => Err(FolioError::Decode(format!(
            "unsupported content encoding {other}"
        ))),
    }
}

fn should_authenticate(auth_hosts: &[String], url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.scheme() != "https" {
        return false;
    }
    parsed
        .host_str()
        .map(|host| {
            let host = host.to_ascii_lowercase();
            auth_hosts.iter().any(|allowed| *allowed == host)
        })
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsPayload {
    Directory(Vec<DirectoryPayload>),
    File(FilePayload),
}

#[derive(Debug, Deserialize)]
struct FilePayload {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectoryPayload {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TreePayload {
    #[serde(default)]
    tree: Vec<TreeItemPayload>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItemPayload {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TopicsPayload {
    #[serde(default)]
    names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64_content() {
        let bytes = decode_content("IyBUb2RvIE1h\nc3Rlcgo=\n", Some("base64")).expect("decode");
        assert_eq!(String::from_utf8(bytes).unwrap(), "# Todo Master\n");
        assert!(decode_content("abc", Some("utf-16")).is_err());
    }

    #[test]
    fn encodes_each_path_segment() {
        assert_eq!(encode_path("docs/my shot.png"), "docs/my%20shot.png");
        assert_eq!(encode_path("/README.md"), "README.md");
    }

    #[test]
    fn token_only_sent_to_allowed_https_hosts() {
        let hosts = HostSettings::default().auth_hosts;
        assert!(should_authenticate(
            &hosts,
            "https://raw.githubusercontent.com/acme/app/main/a.png"
        ));
        assert!(!should_authenticate(&hosts, "https://i.imgur.com/a.png"));
        assert!(!should_authenticate(&hosts, "http://github.com/a.png"));
        assert!(!should_authenticate(&hosts, "not a url"));
    }

    #[test]
    fn contents_payload_distinguishes_files_and_directories() {
        let file: ContentsPayload =
            serde_json::from_str(r#"{"content":"aGk=","encoding":"base64","type":"file"}"#)
                .unwrap();
        assert!(matches!(file, ContentsPayload::File(_)));

        let dir: ContentsPayload =
            serde_json::from_str(r#"[{"name":"a.md","path":"docs/a.md","type":"file"}]"#).unwrap();
        assert!(matches!(dir, ContentsPayload::Directory(entries) if entries.len() == 1));
    }

    #[test]
    fn repository_meta_defaults_branch_and_blank_description() {
        let meta: RepositoryMeta = serde_json::from_str(
            r#"{"id":1,"name":"app","full_name":"acme/app","html_url":"https://github.com/acme/app","description":"  ","default_branch":null}"#,
        )
        .unwrap();
        assert_eq!(meta.branch(), "main");
        assert_eq!(meta.description(), None);
        assert!(!meta.fork);
    }
}
