use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::error::FolioError;

const CONFIG_DIR_NAME: &str = "folio";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 15;

/// Result returned by [`load_config`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: FileConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the configuration was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No configuration file was found or usable; defaults were synthesized.
    Default,
    /// Configuration was read from a TOML file.
    File,
}

/// Disk-backed configuration schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub tunables: Tunables,
    pub paths: Paths,
    pub host: HostSettings,
}

/// Heuristic knobs for name resolution, image scoring and reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    pub max_images_per_repo: usize,
    /// Bytes; anything smaller is treated as an icon or badge.
    pub min_image_size: u64,
    pub image_extensions: Vec<String>,
    pub screenshot_keywords: Vec<String>,
    pub asset_dir_markers: Vec<String>,
    pub icon_markers: Vec<String>,
    pub scores: ScoreWeights,
    /// Keep previously persisted images when a run downloads nothing.
    pub preserve_images: bool,
    pub download_timeout_secs: u64,
    pub caption_limit: usize,
    pub title_limit: usize,
    pub mobile_topics: Vec<String>,
    pub mobile_languages: Vec<String>,
    pub include_forks: bool,
    /// Keep persisted records that no repository claimed during the run.
    pub retain_unmatched: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            max_images_per_repo: 6,
            min_image_size: 20_000,
            image_extensions: strings(&[".png", ".jpg", ".jpeg", ".webp", ".gif"]),
            screenshot_keywords: strings(&[
                "screenshot",
                "screen",
                "demo",
                "preview",
                "capture",
                "ui",
                "mock",
                "example",
            ]),
            asset_dir_markers: strings(&[
                "screenshot",
                "screens",
                "docs",
                "assets",
                "public",
                "static",
                "fastlane",
            ]),
            icon_markers: strings(&["logo", "icon", "favicon", "apple-touch-icon"]),
            scores: ScoreWeights::default(),
            preserve_images: true,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            caption_limit: 140,
            title_limit: 80,
            mobile_topics: strings(&["android", "kotlin"]),
            mobile_languages: strings(&["kotlin"]),
            include_forks: false,
            retain_unmatched: false,
        }
    }
}

impl Tunables {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// True when `ext` (with leading dot, any case) is a recognized image type.
    pub fn is_image_extension(&self, ext: &str) -> bool {
        let lower = ext.to_ascii_lowercase();
        self.image_extensions.iter().any(|known| *known == lower)
    }

    pub fn apply_env(&mut self) -> Result<(), FolioError> {
        self.apply_env_with(|var| env::var(var).ok())
    }

    /// Applies `FOLIO_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), FolioError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.max_images_per_repo = parse_env(
            &lookup,
            "FOLIO_MAX_IMAGES",
            self.max_images_per_repo,
            |s| s.parse::<usize>(),
        )?;
        self.min_image_size = parse_env(
            &lookup,
            "FOLIO_MIN_IMAGE_SIZE",
            self.min_image_size,
            |s| s.parse::<u64>(),
        )?;
        self.download_timeout_secs = parse_env(
            &lookup,
            "FOLIO_DOWNLOAD_TIMEOUT_SECS",
            self.download_timeout_secs,
            |s| s.parse::<u64>(),
        )?;
        self.preserve_images = parse_env(
            &lookup,
            "FOLIO_PRESERVE_IMAGES",
            self.preserve_images,
            |s| s.parse::<bool>(),
        )?;
        Ok(())
    }
}

/// Score contributions used to rank image candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub readme: i32,
    pub tree_base: i32,
    pub keyword_bonus: i32,
    pub asset_dir_bonus: i32,
    pub icon_penalty: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            readme: 50,
            tree_base: 10,
            keyword_bonus: 15,
            asset_dir_bonus: 8,
            icon_penalty: 8,
        }
    }
}

/// Output locations, relative to `root` unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub root: String,
    pub catalog: String,
    pub context: String,
    pub assets: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            catalog: "public/data/projects.json".to_string(),
            context: "docs/ALL_PROJECTS_CONTEXT.md".to_string(),
            assets: "public/projects".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub catalog: PathBuf,
    pub context: PathBuf,
    pub assets: PathBuf,
}

impl Paths {
    pub fn resolve(&self) -> ResolvedPaths {
        let root = expand(&self.root);
        let join = |value: &str| {
            let path = expand(value);
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        };
        ResolvedPaths {
            catalog: join(&self.catalog),
            context: join(&self.context),
            assets: join(&self.assets),
        }
    }
}

/// Hosting platform endpoints and credential lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub api_base: String,
    pub raw_base: String,
    pub credential_host: String,
    pub token_env: String,
    /// Hosts that receive the bearer token when downloading images.
    pub auth_hosts: Vec<String>,
    pub user_agent: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            credential_host: "github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            auth_hosts: strings(&["github.com", "raw.githubusercontent.com", "api.github.com"]),
            user_agent: concat!("folio/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Directory containing folio's config file and logs.
pub fn config_directory() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Load the configuration from `explicit` or the default location, falling back to defaults.
pub fn load_config(explicit: Option<&Path>) -> ConfigLoadResult {
    let mut warnings = Vec::new();
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(config_path);

    if !path.exists() {
        if explicit.is_some() {
            warnings.push(format!(
                "Config file {} does not exist. Using defaults.",
                path.display()
            ));
        }
        return ConfigLoadResult {
            config: FileConfig::default(),
            warnings,
            source: ConfigSource::Default,
        };
    }

    match fs::read_to_string(&path) {
        Ok(raw) => match parse_config(&raw) {
            Ok(cfg) => {
                let (cfg, mut sanitize_warnings) = sanitize_config(cfg);
                warnings.append(&mut sanitize_warnings);
                return ConfigLoadResult {
                    config: cfg,
                    warnings,
                    source: ConfigSource::File,
                };
            }
            Err(err) => {
                warnings.push(format!(
                    "Failed to parse {} as TOML: {}. Falling back to defaults.",
                    path.display(),
                    err
                ));
            }
        },
        Err(err) => {
            warnings.push(format!(
                "Failed to read {}: {}. Falling back to defaults.",
                path.display(),
                err
            ));
        }
    }

    ConfigLoadResult {
        config: FileConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

pub fn parse_config(raw: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str::<FileConfig>(raw)
}

fn sanitize_config(mut config: FileConfig) -> (FileConfig, Vec<String>) {
    let mut warnings = Vec::new();
    let tunables = &mut config.tunables;

    if tunables.download_timeout_secs == 0 {
        warnings.push(format!(
            "download_timeout_secs must be positive; using {DEFAULT_DOWNLOAD_TIMEOUT_SECS}."
        ));
        tunables.download_timeout_secs = DEFAULT_DOWNLOAD_TIMEOUT_SECS;
    }

    tunables.image_extensions = tunables
        .image_extensions
        .iter()
        .map(|ext| ext.trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect();
    if tunables.image_extensions.is_empty() {
        warnings.push("image_extensions was empty; restoring defaults.".to_string());
        tunables.image_extensions = Tunables::default().image_extensions;
    }

    for list in [
        &mut tunables.screenshot_keywords,
        &mut tunables.asset_dir_markers,
        &mut tunables.icon_markers,
        &mut tunables.mobile_topics,
        &mut tunables.mobile_languages,
    ] {
        for entry in list.iter_mut() {
            *entry = entry.trim().to_ascii_lowercase();
        }
        list.retain(|entry| !entry.is_empty());
    }

    (config, warnings)
}

/// Values supplied on the command line; `None` leaves the configured value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeOverrides {
    pub root: Option<String>,
    pub catalog: Option<String>,
    pub context: Option<String>,
    pub assets: Option<String>,
    pub max_images: Option<usize>,
    pub min_image_size: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub preserve_images: Option<bool>,
    pub retain_unmatched: Option<bool>,
    pub include_forks: Option<bool>,
}

impl RuntimeOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Layers `overrides` over `config`, the highest-precedence step.
pub fn apply_runtime_overrides(
    config: &mut FileConfig,
    overrides: &RuntimeOverrides,
    warnings: &mut Vec<String>,
) {
    let paths = &mut config.paths;
    for (target, value) in [
        (&mut paths.root, &overrides.root),
        (&mut paths.catalog, &overrides.catalog),
        (&mut paths.context, &overrides.context),
        (&mut paths.assets, &overrides.assets),
    ] {
        if let Some(value) = value {
            *target = value.clone();
        }
    }

    let tunables = &mut config.tunables;
    if let Some(max) = overrides.max_images {
        tunables.max_images_per_repo = max;
    }
    if let Some(size) = overrides.min_image_size {
        tunables.min_image_size = size;
    }
    match overrides.download_timeout_secs {
        Some(0) => warnings.push(format!(
            "--timeout must be positive; keeping {}s.",
            tunables.download_timeout_secs
        )),
        Some(secs) => tunables.download_timeout_secs = secs,
        None => {}
    }
    if let Some(preserve) = overrides.preserve_images {
        tunables.preserve_images = preserve;
    }
    if let Some(retain) = overrides.retain_unmatched {
        tunables.retain_unmatched = retain;
    }
    if let Some(include) = overrides.include_forks {
        tunables.include_forks = include;
    }
}

fn parse_env<T, F, L, E>(lookup: &L, var: &str, default: T, mut parser: F) -> Result<T, FolioError>
where
    L: Fn(&str) -> Option<String>,
    F: FnMut(&str) -> Result<T, E>,
    E: std::fmt::Display,
{
    match lookup(var) {
        Some(value) => parser(value.trim())
            .map_err(|err| FolioError::Config(format!("invalid value for {}: {}", var, err))),
        None => Ok(default),
    }
}

fn expand(value: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(value).into_owned())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
