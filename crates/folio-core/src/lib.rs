//! Builds a portfolio catalog from the repositories of an authenticated
//! code-hosting account.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod hosting;
pub mod images;
pub mod logging;
pub mod name;
pub mod reconcile;
pub mod repository;
pub mod text;

use tracing::{info, warn};

pub use builder::{BuildOutput, BuildStats, CatalogBuilder, RunSummary};
pub use catalog::{Category, DownloadedImage, ProjectRecord, RecordId, load_catalog, save_catalog};
pub use config::{
    ConfigLoadResult, ConfigSource, FileConfig, HostSettings, Paths, ResolvedPaths,
    RuntimeOverrides, Tunables, apply_runtime_overrides, config_directory, config_path,
    load_config,
};
pub use credentials::{TokenSource, default_sources, resolve_token};
pub use error::FolioError;
pub use hosting::{GitHubClient, ImageSource, RepositoryHost, RepositoryMeta};
pub use logging::{LoggingDestination, LoggingError, current_log_path, init_logging};

/// Authenticates against the configured host and runs a full catalog refresh.
///
/// Reads the token from the process environment; callers wanting `.env`
/// support load it before building `config`.
pub fn run(config: &FileConfig, explicit_token: Option<&str>) -> Result<RunSummary, FolioError> {
    let token = resolve_token(&default_sources(explicit_token, &config.host))?;
    let client = GitHubClient::new(token, &config.host, config.tunables.download_timeout())?;
    run_with(&client, &client, config)
}

/// Runs a refresh against explicit collaborators and writes both outputs.
pub fn run_with(
    host: &dyn RepositoryHost,
    images: &dyn ImageSource,
    config: &FileConfig,
) -> Result<RunSummary, FolioError> {
    let paths = config.paths.resolve();
    let repositories = host.list_repositories()?;
    info!(count = repositories.len(), "Listed repositories");

    let prior = load_catalog(&paths.catalog);
    for warning in &prior.warnings {
        warn!(path = %paths.catalog.display(), "{warning}");
    }

    let builder = CatalogBuilder::new(
        host,
        images,
        &config.tunables,
        &config.host.raw_base,
        &paths.assets,
    );
    let output = builder.build(repositories, prior.records);

    catalog::write_atomic(&paths.context, &output.context.render())?;
    info!(path = %paths.context.display(), "Saved context");
    save_catalog(&paths.catalog, &output.records)?;
    info!(
        path = %paths.catalog.display(),
        records = output.records.len(),
        "Updated catalog"
    );

    Ok(RunSummary {
        stats: output.stats,
        catalog: paths.catalog,
        context: paths.context,
        assets: paths.assets,
    })
}
