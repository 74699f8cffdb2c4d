use std::path::PathBuf;

use clap::Parser;
use folio_cli::cli_args::Cli;
use folio_core::{FileConfig, apply_runtime_overrides};

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["folio"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("arguments parse")
}

#[test]
fn no_flags_means_no_overrides() {
    let cli = parse(&[]);
    assert!(cli.to_runtime_overrides().is_empty());
    assert!(!cli.quiet);
    assert_eq!(cli.token, None);
}

#[test]
fn path_and_tunable_flags_are_carried() {
    let cli = parse(&[
        "--config",
        "/etc/folio.toml",
        "--root",
        "~/site",
        "--catalog",
        "data/projects.json",
        "--max-images",
        "3",
        "--min-image-size",
        "1024",
        "--timeout",
        "5",
    ]);
    assert_eq!(cli.config, Some(PathBuf::from("/etc/folio.toml")));

    let overrides = cli.to_runtime_overrides();
    assert_eq!(overrides.root.as_deref(), Some("~/site"));
    assert_eq!(overrides.catalog.as_deref(), Some("data/projects.json"));
    assert_eq!(overrides.context, None);
    assert_eq!(overrides.max_images, Some(3));
    assert_eq!(overrides.min_image_size, Some(1024));
    assert_eq!(overrides.download_timeout_secs, Some(5));
}

#[test]
fn switches_flip_configured_behavior() {
    let cli = parse(&["--no-preserve-images", "--keep-stale", "--include-forks", "-q"]);
    assert!(cli.quiet);

    let mut config = FileConfig::default();
    let mut warnings = Vec::new();
    apply_runtime_overrides(&mut config, &cli.to_runtime_overrides(), &mut warnings);
    assert!(!config.tunables.preserve_images);
    assert!(config.tunables.retain_unmatched);
    assert!(config.tunables.include_forks);
    assert!(warnings.is_empty());
}

#[test]
fn absent_switches_keep_file_settings() {
    let mut config = FileConfig::default();
    config.tunables.include_forks = true;
    config.tunables.preserve_images = false;

    let mut warnings = Vec::new();
    apply_runtime_overrides(&mut config, &parse(&[]).to_runtime_overrides(), &mut warnings);
    assert!(config.tunables.include_forks);
    assert!(!config.tunables.preserve_images);
}

#[test]
fn invalid_numbers_are_rejected() {
    assert!(Cli::try_parse_from(["folio", "--max-images", "many"]).is_err());
    assert!(Cli::try_parse_from(["folio", "--timeout", "-1"]).is_err());
}

#[test]
fn token_flag_is_captured() {
    let cli = parse(&["--token", "ghp_example"]);
    assert_eq!(cli.token.as_deref(), Some("ghp_example"));
}
