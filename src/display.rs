use std::{sync::Arc, thread, time::Duration};

use ratatui::backend::Backend;

use crate::completion::Completion;
use crate::lyrics::{LyricIndex, locate_word};
use crate::now_playing::NowPlaying;
use crate::progress::ProgressModel;
use crate::terminal::TerminalSink;

/// Read side of a live session as seen by the refresh tasks.
pub trait PlaybackClock: Sync {
    fn current_time(&self) -> Duration;
    fn is_paused(&self) -> bool;
}

/// Everything a session hands the display for one track.
pub struct DisplayJob<'a> {
    pub clock: &'a dyn PlaybackClock,
    pub lyrics: &'a LyricIndex,
    pub progress: ProgressModel,
    pub header: NowPlaying,
    pub done: &'a Completion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayStats {
    pub progress_ticks: usize,
    pub lyric_repaints: usize,
}

pub struct DisplayCoordinator<B: Backend> {
    sink: Arc<TerminalSink<B>>,
    progress_interval: Duration,
    lyric_interval: Duration,
}

impl<B: Backend + Send> DisplayCoordinator<B> {
    pub fn new(sink: Arc<TerminalSink<B>>, progress_interval: Duration, lyric_interval: Duration) -> Self {
        DisplayCoordinator {
            sink,
            progress_interval,
            lyric_interval,
        }
    }

    #[cfg(test)]
    pub fn sink(&self) -> &Arc<TerminalSink<B>> {
        &self.sink
    }

    /// Run the progress and lyric refresh tasks until `job.done` fires.
    /// Both tasks are joined before this returns.
    pub fn run(&self, job: DisplayJob<'_>) -> DisplayStats {
        self.sink.reset();
        let header = job.header.clone();
        self.sink.paint(|s| s.header = header);

        let stats = thread::scope(|scope| {
            let progress = scope.spawn(|| self.progress_task(&job));
            let lyrics = scope.spawn(|| self.lyric_task(&job));
            job.done.wait();
            DisplayStats {
                progress_ticks: progress.join().unwrap_or_default(),
                lyric_repaints: lyrics.join().unwrap_or_default(),
            }
        });
        tracing::debug!(?stats, "display tasks finished");
        stats
    }

    fn progress_task(&self, job: &DisplayJob<'_>) -> usize {
        let mut ticks = 0;
        loop {
            let width = self.sink.width().saturating_sub(2) as usize;
            let view = job.progress.at(job.clock.current_time(), width);
            let paused = job.clock.is_paused();
            self.sink.paint(|s| {
                s.progress = view;
                s.header.paused = paused;
            });
            ticks += 1;
            if job.done.wait_timeout(self.progress_interval) {
                return ticks;
            }
        }
    }

    fn lyric_task(&self, job: &DisplayJob<'_>) -> usize {
        let mut repaints = 0;
        let mut last = None;
        loop {
            let now = job.clock.current_time();
            let located = job.lyrics.locate(now);
            let line = located.map(|(i, _)| i);
            let word = located.and_then(|(_, pair)| locate_word(&pair.original, now));
            if last != Some((line, word)) {
                let view = job.lyrics.view(line, word);
                self.sink.paint(|s| s.lyrics = view);
                last = Some((line, word));
                repaints += 1;
            }
            if job.done.wait_timeout(self.lyric_interval) {
                return repaints;
            }
        }
    }
}
