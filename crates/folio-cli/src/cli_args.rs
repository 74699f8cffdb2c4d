use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};
use folio_core::RuntimeOverrides;

/// Refresh the portfolio catalog from your repositories.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "folio", version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Project root that relative output paths resolve against.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub root: Option<String>,

    /// Catalog JSON file.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub catalog: Option<String>,

    /// Generated context markdown file.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub context: Option<String>,

    /// Directory receiving one image folder per repository.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub assets: Option<String>,

    /// Maximum images kept per repository.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(usize))]
    pub max_images: Option<usize>,

    /// Images smaller than this many bytes are ignored.
    #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(u64))]
    pub min_image_size: Option<u64>,

    /// Per-image download timeout in seconds.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64))]
    pub timeout: Option<u64>,

    /// Clear existing images when a repository yields no new ones.
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_preserve_images: bool,

    /// Keep catalog records that no repository matched.
    #[arg(long, action = ArgAction::SetTrue)]
    pub keep_stale: bool,

    /// Include forked repositories.
    #[arg(long, action = ArgAction::SetTrue)]
    pub include_forks: bool,

    /// API token; otherwise taken from the environment, gh or git.
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Log to the log file only.
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub quiet: bool,
}

impl Cli {
    /// Flags that change configuration. Boolean switches only ever turn a
    /// behavior on, so an absent switch leaves the configured value.
    pub fn to_runtime_overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            root: self.root.clone(),
            catalog: self.catalog.clone(),
            context: self.context.clone(),
            assets: self.assets.clone(),
            max_images: self.max_images,
            min_image_size: self.min_image_size,
            download_timeout_secs: self.timeout,
            preserve_images: self.no_preserve_images.then_some(false),
            retain_unmatched: self.keep_stale.then_some(true),
            include_forks: self.include_forks.then_some(true),
        }
    }
}
