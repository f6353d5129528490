use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::audio::AudioFormat;

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| AudioFormat::EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// A single playable file, or every playable file under a directory,
/// sorted by path. Symlinked directories are followed; loops are skipped.
pub fn collect_tracks(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(%err, "skipping library entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_audio_file(p))
        .collect();
    files.sort();
    files
}
