//! Decoder and output-device seam.
//!
//! A [`AudioBackend`] turns an open track file into an [`AudioStream`]: a
//! decoded stream that knows its sample rate, its length and position in
//! frames, and can be started, paused and closed. The rodio implementation
//! counts frames as the device pulls them and fires the completion callback
//! when the decoder runs dry.

use std::{
    fs::File,
    io::BufReader,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source, mixer::Mixer};
use symphonia::core::{
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

use crate::error::PlayerError;

/// Invoked once by the output side when the stream is exhausted.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Wav,
}

impl AudioFormat {
    pub const EXTENSIONS: [&'static str; 3] = ["mp3", "flac", "wav"];

    pub fn from_path(path: &Path) -> Result<Self, PlayerError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "flac" => Ok(AudioFormat::Flac),
            "wav" => Ok(AudioFormat::Wav),
            _ => Err(PlayerError::UnsupportedFormat(ext)),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
        }
    }
}

pub trait AudioStream: Send {
    fn sample_rate(&self) -> u32;
    /// Stream length in frames (samples per channel).
    fn len(&self) -> u64;
    /// Frames handed to the output device so far.
    fn position(&self) -> u64;
    /// Start output; `on_complete` runs once the stream is exhausted.
    fn play(&mut self, on_complete: CompletionCallback) -> Result<(), PlayerError>;
    fn set_paused(&mut self, paused: bool);
    /// Stop output and release the decoder. Safe to call repeatedly.
    fn close(&mut self);
}

pub trait AudioBackend {
    fn decode(
        &self,
        path: &Path,
        file: File,
        format: AudioFormat,
    ) -> Result<Box<dyn AudioStream>, PlayerError>;
}

pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let rate = u64::from(sample_rate);
    Duration::from_secs(frames / rate) + Duration::from_nanos((frames % rate) * 1_000_000_000 / rate)
}

struct StreamInfo {
    sample_rate: u32,
    frames: Option<u64>,
}

fn probe_stream(path: &Path, format: AudioFormat) -> Option<StreamInfo> {
    let file = File::open(path).ok()?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .ok()?;

    let reader = probed.format;
    let track = reader.default_track()?;
    Some(StreamInfo {
        sample_rate: track.codec_params.sample_rate?,
        frames: track.codec_params.n_frames,
    })
}

/// Source wrapper that counts the samples pulled by the device and reports
/// exhaustion exactly once.
struct CountingSource<S> {
    inner: S,
    samples: Arc<AtomicU64>,
    on_complete: Option<CompletionCallback>,
}

impl<S> CountingSource<S>
where
    S: Source<Item = f32>,
{
    fn new(source: S, samples: Arc<AtomicU64>, on_complete: CompletionCallback) -> Self {
        CountingSource {
            inner: source,
            samples,
            on_complete: Some(on_complete),
        }
    }
}

impl<S> Iterator for CountingSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        match self.inner.next() {
            Some(sample) => {
                self.samples.fetch_add(1, Ordering::Relaxed);
                Some(sample)
            }
            None => {
                if let Some(done) = self.on_complete.take() {
                    done();
                }
                None
            }
        }
    }
}

impl<S> Source for CountingSource<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

type FileDecoder = Decoder<BufReader<File>>;

pub struct RodioStream {
    mixer: Mixer,
    decoder: Option<FileDecoder>,
    sink: Option<Sink>,
    samples: Arc<AtomicU64>,
    channels: u16,
    sample_rate: u32,
    frames: u64,
}

impl AudioStream for RodioStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn len(&self) -> u64 {
        self.frames
    }

    fn position(&self) -> u64 {
        self.samples.load(Ordering::Relaxed) / u64::from(self.channels.max(1))
    }

    fn play(&mut self, on_complete: CompletionCallback) -> Result<(), PlayerError> {
        let decoder = self.decoder.take().ok_or(PlayerError::NotInitialized)?;
        let sink = Sink::connect_new(&self.mixer);
        sink.append(CountingSource::new(decoder, Arc::clone(&self.samples), on_complete));
        self.sink = Some(sink);
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) {
        if let Some(sink) = &self.sink {
            if paused {
                sink.pause();
            } else {
                sink.play();
            }
        }
    }

    fn close(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.decoder = None;
    }
}

/// Default output device plus the decoders feeding it.
pub struct RodioBackend {
    _stream: OutputStream,
    mixer: Mixer,
}

impl RodioBackend {
    pub fn open_default() -> Result<Self, PlayerError> {
        let stream = OutputStreamBuilder::from_default_device()
            .map_err(|e| PlayerError::Device(e.to_string()))?
            .open_stream_or_fallback()
            .map_err(|e| PlayerError::Device(e.to_string()))?;
        let mixer = stream.mixer().clone();
        Ok(RodioBackend {
            _stream: stream,
            mixer,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn decode(
        &self,
        path: &Path,
        file: File,
        format: AudioFormat,
    ) -> Result<Box<dyn AudioStream>, PlayerError> {
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| PlayerError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let channels = decoder.channels();
        let probed = probe_stream(path, format);
        let sample_rate = probed
            .as_ref()
            .map_or_else(|| decoder.sample_rate(), |info| info.sample_rate);
        let frames = probed
            .and_then(|info| info.frames)
            .or_else(|| {
                decoder
                    .total_duration()
                    .map(|d| (d.as_secs_f64() * f64::from(sample_rate)) as u64)
            })
            .unwrap_or(0);
        tracing::debug!(path = %path.display(), sample_rate, channels, frames, "decoder opened");

        Ok(Box::new(RodioStream {
            mixer: self.mixer.clone(),
            decoder: Some(decoder),
            sink: None,
            samples: Arc::new(AtomicU64::new(0)),
            channels,
            sample_rate,
            frames,
        }))
    }
}
