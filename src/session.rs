//! One track's playback lifecycle.
//!
//! ```text
//! Uninitialized --init--> Ready --play--> Playing <--toggle_pause--> Paused
//!       any state --close--> Closed --init--> Ready
//! ```
//!
//! `close` releases the decoder and file handle and fires the session's
//! completion signal exactly once, whether playback ended naturally or was
//! cut short by the user.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use ratatui::backend::Backend;

use crate::audio::{AudioBackend, AudioFormat, AudioStream, frames_to_duration};
use crate::completion::Completion;
use crate::display::{DisplayCoordinator, DisplayJob, PlaybackClock};
use crate::error::PlayerError;
use crate::lyrics::LyricIndex;
use crate::now_playing::NowPlaying;
use crate::progress::ProgressModel;
use crate::tags::read_tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Playing,
    Paused,
    Closed,
}

struct Inner {
    state: SessionState,
    file: Option<File>,
    stream: Option<Box<dyn AudioStream>>,
    sample_rate: u32,
    total: Duration,
    paused: bool,
    lyrics: Arc<LyricIndex>,
    title: Option<String>,
    artist: Option<String>,
    done: Arc<Completion>,
}

impl Inner {
    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.file = None;
    }
}

pub struct PlaybackSession {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl PlaybackSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PlaybackSession {
            path: path.into(),
            inner: Mutex::new(Inner {
                state: SessionState::Uninitialized,
                file: None,
                stream: None,
                sample_rate: 0,
                total: Duration::ZERO,
                paused: false,
                lyrics: Arc::new(LyricIndex::default()),
                title: None,
                artist: None,
                done: Arc::new(Completion::new()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file, load lyrics and attach a decoder. Any previous
    /// lifecycle is released first, and a fresh completion signal is
    /// allocated so a closed session can be reused.
    pub fn init(&self, backend: &dyn AudioBackend) -> Result<(), PlayerError> {
        let mut inner = self.inner.lock();
        inner.release();
        inner.state = SessionState::Uninitialized;
        inner.paused = false;
        inner.sample_rate = 0;
        inner.total = Duration::ZERO;
        inner.done = Arc::new(Completion::new());

        let file = File::open(&self.path).map_err(|source| PlayerError::Open {
            path: self.path.clone(),
            source,
        })?;

        let tags = read_tags(&self.path);
        inner.lyrics = Arc::new(LyricIndex::parse(&tags.lyrics));
        inner.title = tags.title;
        inner.artist = tags.artist;

        let format = AudioFormat::from_path(&self.path)?;
        let decoder_file = file.try_clone().map_err(|source| PlayerError::Open {
            path: self.path.clone(),
            source,
        })?;
        let stream = backend.decode(&self.path, decoder_file, format)?;

        inner.sample_rate = stream.sample_rate();
        inner.file = Some(file);
        inner.stream = Some(stream);
        inner.state = SessionState::Ready;
        tracing::info!(
            path = %self.path.display(),
            sample_rate = inner.sample_rate,
            lyric_pairs = inner.lyrics.len(),
            "session initialized"
        );
        Ok(())
    }

    /// Start output and the display tasks, then block until the completion
    /// signal fires. Returns immediately when the session was never
    /// successfully initialized.
    pub fn play<B: Backend + Send>(
        &self,
        display: &DisplayCoordinator<B>,
        position: (usize, usize),
    ) -> Result<(), PlayerError> {
        let (done, lyrics, progress, header) = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Ready || inner.sample_rate == 0 {
                tracing::debug!(state = ?inner.state, "play ignored");
                return Ok(());
            }
            let sample_rate = inner.sample_rate;
            let done = Arc::clone(&inner.done);
            let on_complete = {
                let done = Arc::clone(&done);
                let path = self.path.clone();
                Box::new(move || {
                    if done.fire() {
                        tracing::debug!(path = %path.display(), "end of stream");
                    }
                })
            };
            let paused = inner.paused;
            let Some(stream) = inner.stream.as_mut() else {
                return Err(PlayerError::NotInitialized);
            };
            let total = frames_to_duration(stream.len(), sample_rate);
            if let Err(err) = stream.play(on_complete) {
                inner.release();
                inner.state = SessionState::Closed;
                done.fire();
                return Err(err);
            }
            // A pause pressed while Ready only set the flag; carry it onto the live output.
            if paused {
                stream.set_paused(true);
            }
            inner.total = total;
            inner.state = if paused {
                SessionState::Paused
            } else {
                SessionState::Playing
            };

            let header = NowPlaying {
                title: inner.title.clone().unwrap_or_else(|| self.display_name()),
                artist: inner.artist.clone(),
                position,
                paused,
            };
            (done, Arc::clone(&inner.lyrics), ProgressModel::new(total), header)
        };

        tracing::info!(path = %self.path.display(), total = ?progress.total(), "playing");
        display.run(DisplayJob {
            clock: self,
            lyrics: &lyrics,
            progress,
            header,
            done: &done,
        });
        self.close();
        Ok(())
    }

    pub fn toggle_pause(&self) {
        let mut inner = self.inner.lock();
        let paused = !inner.paused;
        let Some(stream) = inner.stream.as_mut() else {
            return;
        };
        stream.set_paused(paused);
        inner.paused = paused;
        inner.state = match inner.state {
            SessionState::Playing if paused => SessionState::Paused,
            SessionState::Paused if !paused => SessionState::Playing,
            other => other,
        };
        tracing::debug!(paused, "pause toggled");
    }

    /// Release the decoder and file handle and fire the completion signal.
    /// Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.release();
        if inner.state != SessionState::Uninitialized {
            inner.state = SessionState::Closed;
        }
        if inner.done.fire() {
            tracing::info!(path = %self.path.display(), "session closed");
        }
    }

    pub fn current_time(&self) -> Duration {
        let inner = self.inner.lock();
        match inner.stream.as_ref() {
            Some(stream) => frames_to_duration(stream.position(), inner.sample_rate),
            None => Duration::ZERO,
        }
    }

    #[cfg(test)]
    pub fn total(&self) -> Duration {
        self.inner.lock().total
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    #[cfg(test)]
    /// True once neither a decoder nor a file handle is attached.
    pub fn is_released(&self) -> bool {
        let inner = self.inner.lock();
        inner.stream.is_none() && inner.file.is_none()
    }

    #[cfg(test)]
    /// The completion signal of the current lifecycle.
    pub fn completion(&self) -> Arc<Completion> {
        Arc::clone(&self.inner.lock().done)
    }

    #[cfg(test)]
    pub fn lyrics(&self) -> Arc<LyricIndex> {
        Arc::clone(&self.inner.lock().lyrics)
    }

    fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".into())
    }
}

impl PlaybackClock for PlaybackSession {
    fn current_time(&self) -> Duration {
        PlaybackSession::current_time(self)
    }

    fn is_paused(&self) -> bool {
        PlaybackSession::is_paused(self)
    }
}
