use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::VALID_EXTENSIONS;

/// Recursively collects every supported image below `folder`, sorted by path.
pub fn crawl(folder: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(folder).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Failure reading directory entry -> {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_supported(entry.path()) {
            continue;
        }

        files.push(entry.into_path());
    }

    files.sort();
    tracing::debug!("Found {} images below {}", files.len(), folder.display());

    files
}

pub fn is_supported(path: &Path) -> bool {
    VALID_EXTENSIONS.contains(&extension_lowercase(path).as_str())
}

pub fn extension_lowercase(path: &Path) -> String {
    path.extension()
        .unwrap_or_default()
        .to_str()
        .unwrap_or("")
        .to_lowercase()
}
