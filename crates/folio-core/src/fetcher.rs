//! Downloads top-ranked candidates under stable, URL-derived file names.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::catalog::DownloadedImage;
use crate::config::Tunables;
use crate::error::FolioError;
use crate::hosting::ImageSource;
use crate::images::ImageCandidate;
use crate::text::truncate_chars;

const HASH_PREFIX_LEN: usize = 8;

/// `{stem}_{sha1(src)[..8]}{ext}` with `%` removed, or `None` when the URL does
/// not name a recognized image type.
pub fn stable_file_name(src: &str, tunables: &Tunables) -> Option<String> {
    let without_query = src.split(['?', '#']).next().unwrap_or(src);
    let file_name = without_query.trim_end_matches('/').rsplit('/').next()?;
    let (stem, ext) = split_extension(file_name);
    if ext.is_empty() || !tunables.is_image_extension(ext) {
        return None;
    }

    let digest = Sha1::digest(src.as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    let short_hash = &hex[..HASH_PREFIX_LEN];
    Some(format!("{stem}_{short_hash}{ext}").replace('%', ""))
}

/// Fetches candidates in order until `max_images_per_repo` have been written to
/// `dest_dir`. Failed, undersized or non-image candidates are skipped.
pub fn download_images(
    source: &dyn ImageSource,
    candidates: &[ImageCandidate],
    dest_dir: &Path,
    url_prefix: &str,
    tunables: &Tunables,
) -> Result<Vec<DownloadedImage>, FolioError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(dest_dir)?;

    let mut picked = Vec::new();
    let mut seen_names = HashSet::new();

    for candidate in candidates {
        if picked.len() >= tunables.max_images_per_repo {
            break;
        }

        let Some(file_name) = stable_file_name(&candidate.src, tunables) else {
            continue;
        };
        if seen_names.contains(&file_name) {
            continue;
        }

        let bytes = match source.fetch_image(&candidate.src) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(src = %candidate.src, error = %err, "Skipping image");
                continue;
            }
        };
        if (bytes.len() as u64) < tunables.min_image_size {
            debug!(src = %candidate.src, bytes = bytes.len(), "Skipping undersized image");
            continue;
        }

        let dest_file = dest_dir.join(&file_name);
        if let Err(err) = fs::write(&dest_file, &bytes) {
            warn!(path = %dest_file.display(), error = %err, "Failed to write image");
            continue;
        }

        picked.push(DownloadedImage {
            url: format!("{}/{}", url_prefix.trim_end_matches('/'), file_name),
            caption: truncate_chars(&candidate.caption, tunables.caption_limit),
        });
        seen_names.insert(file_name);
    }

    Ok(picked)
}

/// Splits at the last dot, ignoring leading dots (`.png` has no extension).
fn split_extension(file_name: &str) -> (&str, &str) {
    let leading = file_name.len() - file_name.trim_start_matches('.').len();
    match file_name.rfind('.') {
        Some(idx) if idx >= leading => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}
