//! Track sequencing and the playback control loop.
//!
//! The controller owns at most one live [`PlaybackSession`]. Its play call
//! runs on a worker thread; keystrokes and "session finished" notices both
//! arrive on one queue, so the control loop never has to wait on two things
//! at once.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use rand::{Rng, seq::SliceRandom};
use ratatui::backend::Backend;

use crate::audio::AudioBackend;
use crate::display::DisplayCoordinator;
use crate::error::PlayerError;
use crate::session::PlaybackSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    /// 1-based position shown to the user.
    pub id: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Playlist {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        let tracks = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| Track { path, id: i + 1 })
            .collect();
        Playlist { tracks, current: 0 }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current)
    }

    fn set_current(&mut self, index: usize) {
        self.current = index;
    }

    /// Neighbouring index, wrapping at both ends.
    pub fn step(&self, index: usize, direction: Direction) -> usize {
        let len = self.tracks.len();
        if len == 0 {
            return 0;
        }
        match direction {
            Direction::Forward => (index + 1) % len,
            Direction::Backward => (index + len - 1) % len,
        }
    }

    /// Randomly permute the tracks and re-label display ids 1..N. The
    /// current index follows the track it pointed at.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let current_path = self.current().map(|t| t.path.clone());
        self.tracks.shuffle(rng);
        for (i, track) in self.tracks.iter_mut().enumerate() {
            track.id = i + 1;
        }
        if let Some(path) = current_path {
            self.current = self.tracks.iter().position(|t| t.path == path).unwrap_or(0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Next,
    Previous,
    Shuffle,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Command(Command),
    /// A session's play call returned. `generation` identifies which one.
    Finished { generation: u64 },
}

/// Why the control loop handed control back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    ReturnedToMenu,
}

struct LiveSession {
    session: Arc<PlaybackSession>,
    worker: JoinHandle<()>,
    generation: u64,
}

pub struct PlaylistController<B: Backend + Send + 'static> {
    playlist: Playlist,
    backend: Box<dyn AudioBackend>,
    display: Arc<DisplayCoordinator<B>>,
    live: Option<LiveSession>,
    generation: u64,
    tx: Sender<ControlEvent>,
    rx: Receiver<ControlEvent>,
}

impl<B: Backend + Send + 'static> PlaylistController<B> {
    pub fn new(backend: Box<dyn AudioBackend>, display: Arc<DisplayCoordinator<B>>) -> Self {
        let (tx, rx) = mpsc::channel();
        PlaylistController {
            playlist: Playlist::default(),
            backend,
            display,
            live: None,
            generation: 0,
            tx,
            rx,
        }
    }

    /// Queue for keystroke readers and other producers.
    pub fn sender(&self) -> Sender<ControlEvent> {
        self.tx.clone()
    }

    #[cfg(test)]
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[cfg(test)]
    pub fn current_session(&self) -> Option<Arc<PlaybackSession>> {
        self.live.as_ref().map(|live| Arc::clone(&live.session))
    }

    /// Replace the playlist and start playing at `start` (0-based, clamped).
    pub fn load(&mut self, playlist: Playlist, start: usize) -> Result<(), PlayerError> {
        self.stop_current();
        let start = start.min(playlist.len().saturating_sub(1));
        self.playlist = playlist;
        tracing::info!(tracks = self.playlist.len(), start, "playlist loaded");
        self.open_from(start, Direction::Forward)
    }

    /// Process events until the user quits.
    pub fn run(&mut self) -> Result<Exit, PlayerError> {
        loop {
            // The controller keeps a sender alive, so the queue never disconnects.
            let Ok(event) = self.rx.recv() else {
                return Ok(Exit::ReturnedToMenu);
            };
            if let Some(exit) = self.handle(event)? {
                return Ok(exit);
            }
        }
    }

    pub fn handle(&mut self, event: ControlEvent) -> Result<Option<Exit>, PlayerError> {
        match event {
            ControlEvent::Command(Command::TogglePause) => {
                if let Some(live) = &self.live {
                    live.session.toggle_pause();
                }
            }
            ControlEvent::Command(Command::Next) => self.advance(Direction::Forward)?,
            ControlEvent::Command(Command::Previous) => self.advance(Direction::Backward)?,
            ControlEvent::Command(Command::Shuffle) => self.shuffle(),
            ControlEvent::Command(Command::Quit) => {
                self.stop_current();
                tracing::info!("returning to menu");
                return Ok(Some(Exit::ReturnedToMenu));
            }
            ControlEvent::Finished { generation } => {
                let is_live = self.live.as_ref().is_some_and(|l| l.generation == generation);
                if is_live {
                    self.on_natural_completion()?;
                } else {
                    tracing::trace!(generation, "stale finish notice");
                }
            }
        }
        Ok(None)
    }

    /// Close the live session and start its neighbour.
    pub fn advance(&mut self, direction: Direction) -> Result<(), PlayerError> {
        if self.playlist.is_empty() {
            return Ok(());
        }
        let next = self.playlist.step(self.playlist.current_index(), direction);
        self.stop_current();
        self.open_from(next, direction)
    }

    pub fn on_natural_completion(&mut self) -> Result<(), PlayerError> {
        tracing::debug!("track finished, advancing");
        self.advance(Direction::Forward)
    }

    pub fn shuffle(&mut self) {
        self.playlist.shuffle_with(&mut rand::rng());
        tracing::info!(current = self.playlist.current_index(), "playlist shuffled");
    }

    #[cfg(test)]
    pub fn next_event(&self, timeout: std::time::Duration) -> Option<ControlEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Close the live session and wait for its display tasks to wind down.
    fn stop_current(&mut self) {
        if let Some(live) = self.live.take() {
            live.session.close();
            if live.worker.join().is_err() {
                tracing::error!(path = %live.session.path().display(), "playback worker panicked");
            }
        }
    }

    /// Start the first track that initializes, walking in `direction` from
    /// `index`. Tracks that fail to open or decode are skipped.
    fn open_from(&mut self, index: usize, direction: Direction) -> Result<(), PlayerError> {
        let mut index = index;
        for _ in 0..self.playlist.len() {
            let track = self.playlist.tracks()[index].clone();
            let session = Arc::new(PlaybackSession::new(track.path.clone()));
            match session.init(self.backend.as_ref()) {
                Ok(()) => {
                    self.playlist.set_current(index);
                    self.start(session, track.id);
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(path = %track.path.display(), %err, "skipping track");
                    index = self.playlist.step(index, direction);
                }
            }
        }
        Err(PlayerError::NoPlayableTrack(self.playlist.len()))
    }

    fn start(&mut self, session: Arc<PlaybackSession>, id: usize) {
        self.generation += 1;
        let generation = self.generation;
        let position = (id, self.playlist.len());
        let display = Arc::clone(&self.display);
        let tx = self.tx.clone();
        let worker_session = Arc::clone(&session);
        let worker = thread::spawn(move || {
            if let Err(err) = worker_session.play(&display, position) {
                tracing::warn!(path = %worker_session.path().display(), %err, "playback failed");
            }
            let _ = tx.send(ControlEvent::Finished { generation });
        });
        self.live = Some(LiveSession {
            session,
            worker,
            generation,
        });
    }
}

impl<B: Backend + Send + 'static> Drop for PlaylistController<B> {
    fn drop(&mut self) {
        self.stop_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_audio::{FakeBackend, StreamEvent};
    use crate::session::SessionState;
    use crate::terminal::test_support::test_sink;
    use rand::{SeedableRng, rngs::StdRng};
    use ratatui::backend::TestBackend;
    use std::{fs, time::Duration, time::Instant};

    const WAIT: Duration = Duration::from_secs(5);

    struct Fixture {
        _dir: tempfile::TempDir,
        paths: Vec<PathBuf>,
        backend: FakeBackend,
        controller: PlaylistController<TestBackend>,
    }

    fn fixture(names: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = names
            .iter()
            .map(|n| {
                let p = dir.path().join(n);
                fs::write(&p, b"fake").unwrap();
                p
            })
            .collect();
        let backend = FakeBackend::new();
        let display = Arc::new(DisplayCoordinator::new(
            Arc::new(test_sink(60, 20)),
            Duration::from_millis(5),
            Duration::from_millis(2),
        ));
        let controller = PlaylistController::new(Box::new(backend.clone()), display);
        Fixture {
            _dir: dir,
            paths,
            backend,
            controller,
        }
    }

    fn position_of(events: &[StreamEvent], event: &StreamEvent) -> usize {
        events
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("{event:?} missing from {events:?}"))
    }

    #[test]
    fn step_wraps_both_ways() {
        let playlist = Playlist::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(playlist.step(2, Direction::Forward), 0);
        assert_eq!(playlist.step(0, Direction::Backward), 2);
        assert_eq!(playlist.step(1, Direction::Forward), 2);
    }

    #[test]
    fn shuffle_relabels_and_keeps_current_track() {
        let paths: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("{i}.mp3"))).collect();
        let mut playlist = Playlist::new(paths.clone());
        playlist.set_current(3);
        playlist.shuffle_with(&mut StdRng::seed_from_u64(7));

        let ids: Vec<usize> = playlist.tracks().iter().map(|t| t.id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
        let mut shuffled: Vec<PathBuf> = playlist.tracks().iter().map(|t| t.path.clone()).collect();
        shuffled.sort();
        let mut original = paths;
        original.sort();
        assert_eq!(shuffled, original);
        assert_eq!(playlist.current().unwrap().path, PathBuf::from("3.mp3"));
    }

    #[test]
    fn natural_completion_closes_old_session_before_next_starts() {
        let mut fx = fixture(&["one.mp3", "two.mp3", "three.mp3"]);
        fx.controller.load(Playlist::new(fx.paths.clone()), 0).unwrap();
        fx.backend.wait_for(StreamEvent::Started(0));
        let first = fx.controller.current_session().unwrap();

        fx.backend.stream(0).finish();
        let event = fx.controller.next_event(WAIT).expect("finish notice");
        assert!(matches!(event, ControlEvent::Finished { .. }));
        assert_eq!(fx.controller.handle(event).unwrap(), None);

        assert_eq!(first.state(), SessionState::Closed);
        assert!(first.is_released());
        assert_eq!(fx.controller.playlist().current_index(), 1);
        assert_eq!(fx.backend.opened_paths()[1], fx.paths[1]);

        fx.backend.wait_for(StreamEvent::Started(1));
        let events = fx.backend.events();
        assert!(position_of(&events, &StreamEvent::Closed(0)) < position_of(&events, &StreamEvent::Opened(1)));

        let sink = Arc::clone(fx.controller.display.sink());
        let start = Instant::now();
        while sink.screen().header.position != (2, 3) {
            assert!(start.elapsed() < WAIT, "second track never painted");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn skip_ignores_stale_finish_notice() {
        let mut fx = fixture(&["a.wav", "b.wav", "c.wav"]);
        fx.controller.load(Playlist::new(fx.paths.clone()), 0).unwrap();
        fx.backend.wait_for(StreamEvent::Started(0));

        fx.controller.handle(ControlEvent::Command(Command::Next)).unwrap();
        assert_eq!(fx.controller.playlist().current_index(), 1);

        // The skipped session's worker still reports in; it must not advance.
        let stale = fx.controller.next_event(WAIT).expect("stale notice");
        fx.controller.handle(stale).unwrap();
        assert_eq!(fx.controller.playlist().current_index(), 1);
        assert_eq!(fx.backend.opened_paths().len(), 2);
    }

    #[test]
    fn previous_wraps_to_last_track() {
        let mut fx = fixture(&["a.flac", "b.flac", "c.flac"]);
        fx.controller.load(Playlist::new(fx.paths.clone()), 0).unwrap();
        fx.controller.handle(ControlEvent::Command(Command::Previous)).unwrap();
        assert_eq!(fx.controller.playlist().current_index(), 2);
        assert_eq!(fx.backend.opened_paths().last(), Some(&fx.paths[2]));
    }

    #[test]
    fn failing_tracks_are_skipped() {
        let mut fx = fixture(&["a.mp3", "b.mp3", "c.ogg", "d.mp3"]);
        fx.backend.fail_decode_of("b.mp3");
        fx.controller.load(Playlist::new(fx.paths.clone()), 0).unwrap();
        fx.controller.handle(ControlEvent::Command(Command::Next)).unwrap();
        assert_eq!(fx.controller.playlist().current_index(), 3);
    }

    #[test]
    fn nothing_playable_is_an_error() {
        let mut fx = fixture(&["a.ogg", "b.txt"]);
        let err = fx.controller.load(Playlist::new(fx.paths.clone()), 0).unwrap_err();
        assert!(matches!(err, PlayerError::NoPlayableTrack(2)));
        assert!(fx.controller.current_session().is_none());
    }

    #[test]
    fn pause_and_quit() {
        let mut fx = fixture(&["a.mp3"]);
        fx.controller.load(Playlist::new(fx.paths.clone()), 0).unwrap();
        fx.backend.wait_for(StreamEvent::Started(0));
        let session = fx.controller.current_session().unwrap();

        fx.controller.handle(ControlEvent::Command(Command::TogglePause)).unwrap();
        assert!(session.is_paused());

        let tx = fx.controller.sender();
        tx.send(ControlEvent::Command(Command::Quit)).unwrap();
        assert_eq!(fx.controller.run().unwrap(), Exit::ReturnedToMenu);
        assert!(session.is_released());
        assert!(fx.controller.current_session().is_none());
        assert_eq!(fx.backend.events().last(), Some(&StreamEvent::Closed(0)));
    }
}
