//! Track metadata: title, artist and lyric text.
//!
//! Embedded lyrics (USLT and friends) win; a same-name `.lrc` file next to
//! the track is the fallback. Missing or unreadable metadata is never an
//! error for playback, callers just get empty fields.

use std::{
    fs,
    path::{Path, PathBuf},
};

use lofty::{
    error::LoftyError,
    file::TaggedFileExt,
    probe::Probe,
    tag::{Accessor, ItemKey},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub lyrics: String,
}

fn read_embedded(path: &Path) -> Result<TrackTags, LoftyError> {
    let tagged_file = Probe::open(path)?.read()?;
    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        return Ok(TrackTags::default());
    };

    Ok(TrackTags {
        title: tag.title().map(|t| t.to_string()).filter(|t| !t.trim().is_empty()),
        artist: tag.artist().map(|a| a.to_string()).filter(|a| !a.trim().is_empty()),
        lyrics: tag
            .get_string(&ItemKey::Lyrics)
            .map(str::to_string)
            .unwrap_or_default(),
    })
}

fn find_lyrics_file(audio_path: &Path) -> Option<PathBuf> {
    let parent = audio_path.parent()?;
    let stem = audio_path.file_stem()?.to_str()?;
    ["lrc", "LRC"]
        .iter()
        .map(|ext| parent.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

pub fn read_tags(path: &Path) -> TrackTags {
    let mut tags = match read_embedded(path) {
        Ok(tags) => tags,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "no readable tags");
            TrackTags::default()
        }
    };

    if tags.lyrics.trim().is_empty() {
        if let Some(lrc) = find_lyrics_file(path) {
            match fs::read_to_string(&lrc) {
                Ok(content) => {
                    tracing::debug!(path = %lrc.display(), "using sidecar lyrics");
                    tags.lyrics = content;
                }
                Err(err) => tracing::warn!(path = %lrc.display(), %err, "sidecar lyrics unreadable"),
            }
        }
    }
    tags
}
