//! In-memory audio backend for tests. Streams never touch a device; tests
//! drive position and end-of-stream by hand and read back an ordered event
//! log.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::audio::{AudioBackend, AudioFormat, AudioStream, CompletionCallback};
use crate::error::PlayerError;

pub const SAMPLE_RATE: u32 = 44_100;
pub const LENGTH_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Opened(usize),
    Started(usize),
    Paused(usize, bool),
    Closed(usize),
}

#[derive(Default)]
pub struct FakeStreamHandle {
    position: AtomicU64,
    on_complete: Mutex<Option<CompletionCallback>>,
}

impl FakeStreamHandle {
    pub fn set_position(&self, frames: u64) {
        self.position.store(frames, Ordering::SeqCst);
    }

    /// Simulate the device draining the stream.
    pub fn finish(&self) {
        let callback = self.on_complete.lock().take();
        if let Some(done) = callback {
            done();
        }
    }
}

#[derive(Default)]
struct Shared {
    events: Mutex<Vec<StreamEvent>>,
    streams: Mutex<Vec<Arc<FakeStreamHandle>>>,
    opened: Mutex<Vec<PathBuf>>,
    failing: Mutex<Vec<String>>,
}

impl Shared {
    fn record(&self, event: StreamEvent) {
        self.events.lock().push(event);
    }
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    shared: Arc<Shared>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_decode_of(&self, file_name: &str) {
        self.shared.failing.lock().push(file_name.to_string());
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.shared.events.lock().clone()
    }

    pub fn opened_paths(&self) -> Vec<PathBuf> {
        self.shared.opened.lock().clone()
    }

    pub fn stream(&self, id: usize) -> Arc<FakeStreamHandle> {
        Arc::clone(&self.shared.streams.lock()[id])
    }

    /// Block until `event` shows up in the log; panics after a few seconds.
    pub fn wait_for(&self, event: StreamEvent) {
        let start = Instant::now();
        while !self.shared.events.lock().contains(&event) {
            assert!(
                start.elapsed() < Duration::from_secs(5),
                "timed out waiting for {event:?}; saw {:?}",
                self.events()
            );
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl AudioBackend for FakeBackend {
    fn decode(
        &self,
        path: &Path,
        _file: File,
        _format: AudioFormat,
    ) -> Result<Box<dyn AudioStream>, PlayerError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.shared.failing.lock().contains(&name) {
            return Err(PlayerError::Decode {
                path: path.to_path_buf(),
                reason: "fake decoder refused".into(),
            });
        }

        let handle = Arc::new(FakeStreamHandle::default());
        let id = {
            let mut streams = self.shared.streams.lock();
            streams.push(Arc::clone(&handle));
            streams.len() - 1
        };
        self.shared.opened.lock().push(path.to_path_buf());
        self.shared.record(StreamEvent::Opened(id));
        Ok(Box::new(FakeStream {
            id,
            handle,
            shared: Arc::clone(&self.shared),
            closed: false,
        }))
    }
}

struct FakeStream {
    id: usize,
    handle: Arc<FakeStreamHandle>,
    shared: Arc<Shared>,
    closed: bool,
}

impl AudioStream for FakeStream {
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn len(&self) -> u64 {
        LENGTH_SECS * u64::from(SAMPLE_RATE)
    }

    fn position(&self) -> u64 {
        self.handle.position.load(Ordering::SeqCst)
    }

    fn play(&mut self, on_complete: CompletionCallback) -> Result<(), PlayerError> {
        *self.handle.on_complete.lock() = Some(on_complete);
        self.shared.record(StreamEvent::Started(self.id));
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) {
        self.shared.record(StreamEvent::Paused(self.id, paused));
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shared.record(StreamEvent::Closed(self.id));
        }
    }
}
