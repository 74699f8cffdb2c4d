//! Bearer token lookup across the places a developer usually keeps one.

use std::env;
use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::HostSettings;
use crate::error::FolioError;

/// One place a token may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Passed on the command line.
    Explicit(String),
    /// An environment variable (after `.env` has been loaded).
    Env(String),
    /// `gh auth token`.
    GhCli,
    /// `git credential fill` for the given host.
    GitCredentialHelper { host: String },
}

impl TokenSource {
    pub fn label(&self) -> String {
        match self {
            TokenSource::Explicit(_) => "command line".to_string(),
            TokenSource::Env(var) => format!("${var}"),
            TokenSource::GhCli => "gh auth token".to_string(),
            TokenSource::GitCredentialHelper { host } => format!("git credential ({host})"),
        }
    }

    /// The token this source yields, if any. Lookup failures count as absent.
    pub fn lookup(&self) -> Option<String> {
        let token = match self {
            TokenSource::Explicit(token) => Some(token.clone()),
            TokenSource::Env(var) => env::var(var).ok(),
            TokenSource::GhCli => gh_auth_token(),
            TokenSource::GitCredentialHelper { host } => git_credential_password(host),
        };
        token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

/// Default cascade: explicit token, environment variable, gh CLI, git helper.
pub fn default_sources(explicit: Option<&str>, settings: &HostSettings) -> Vec<TokenSource> {
    let mut sources = Vec::with_capacity(4);
    if let Some(token) = explicit {
        sources.push(TokenSource::Explicit(token.to_string()));
    }
    sources.push(TokenSource::Env(settings.token_env.clone()));
    sources.push(TokenSource::GhCli);
    sources.push(TokenSource::GitCredentialHelper {
        host: settings.credential_host.clone(),
    });
    sources
}

/// First non-empty token from `sources`, else [`FolioError::MissingToken`].
pub fn resolve_token(sources: &[TokenSource]) -> Result<String, FolioError> {
    for source in sources {
        if let Some(token) = source.lookup() {
            debug!(source = %source.label(), "Resolved API token");
            return Ok(token);
        }
        debug!(source = %source.label(), "No token available");
    }
    Err(FolioError::MissingToken)
}

fn gh_auth_token() -> Option<String> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn git_credential_password(host: &str) -> Option<String> {
    let mut child = Command::new("git")
        .args(["credential", "fill"])
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;

    if let Some(mut stdin) = child.stdin.take() {
        let request = format!("protocol=https\nhost={host}\n\n");
        if stdin.write_all(request.as_bytes()).is_err() {
            let _ = child.kill();
            let _ = child.wait();
            return None;
        }
    }

    let output = child.wait_with_output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_credential_output(&String::from_utf8_lossy(&output.stdout))
}

/// Extracts `password=` from `git credential fill` output.
pub fn parse_credential_output(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("password="))
        .map(str::trim)
        .filter(|password| !password.is_empty())
        .map(str::to_string)
}
