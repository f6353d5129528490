use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while opening or starting a track.
///
/// Every variant is fatal to the track it concerns only; the playlist
/// controller decides whether to skip to the next track or give up.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("unsupported audio format: {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("audio output unavailable: {0}")]
    Device(String),

    #[error("session has no decoder attached")]
    NotInitialized,

    #[error("no playable track in playlist of {0}")]
    NoPlayableTrack(usize),
}
