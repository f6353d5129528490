//! The process-wide terminal sink.
//!
//! All screen writes go through one lock. Refresh tasks own disjoint regions
//! of [`Screen`]; each updates its region and repaints under that lock, and
//! ratatui's buffer diff keeps the emitted escape sequences to changed cells.

use parking_lot::Mutex;
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Layout},
};

use crate::controls::draw_controls;
use crate::lyrics::{LyricView, draw_lyrics};
use crate::now_playing::{NOW_PLAYING_HEIGHT, NowPlaying, draw_now_playing_bar};
use crate::progress::{ProgressView, draw_progress};
use crate::theme::Theme;

/// Used when the backend cannot report its size.
const FALLBACK_WIDTH: u16 = 80;

#[derive(Debug, Clone, Default)]
pub struct Screen {
    pub header: NowPlaying,
    pub progress: ProgressView,
    pub lyrics: LyricView,
}

impl Screen {
    fn render(&self, frame: &mut Frame, theme: &Theme) {
        let chunks = Layout::vertical([
            Constraint::Length(NOW_PLAYING_HEIGHT),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

        draw_now_playing_bar(frame, chunks[0], &self.header, theme);
        draw_progress(frame, chunks[1], &self.progress, theme);
        draw_lyrics(frame, chunks[2], &self.lyrics, theme);
        draw_controls(frame, chunks[3], theme);
    }
}

struct SinkState<B: Backend> {
    terminal: Terminal<B>,
    screen: Screen,
}

pub struct TerminalSink<B: Backend> {
    state: Mutex<SinkState<B>>,
    theme: &'static Theme,
}

impl<B: Backend> TerminalSink<B> {
    pub fn new(terminal: Terminal<B>, theme: &'static Theme) -> Self {
        TerminalSink {
            state: Mutex::new(SinkState {
                terminal,
                screen: Screen::default(),
            }),
            theme,
        }
    }

    pub fn width(&self) -> u16 {
        let state = self.state.lock();
        match state.terminal.size() {
            Ok(size) => size.width,
            Err(err) => {
                tracing::debug!(%err, "terminal size unavailable");
                FALLBACK_WIDTH
            }
        }
    }

    /// Update part of the screen and repaint, serialized against every other
    /// writer.
    pub fn paint(&self, update: impl FnOnce(&mut Screen)) {
        let mut guard = self.state.lock();
        let SinkState { terminal, screen } = &mut *guard;
        update(screen);
        let theme = self.theme;
        if let Err(err) = terminal.draw(|frame| screen.render(frame, theme)) {
            tracing::warn!(%err, "terminal repaint failed");
        }
    }

    /// Forget the previous track's content.
    pub fn reset(&self) {
        let mut guard = self.state.lock();
        guard.screen = Screen::default();
        if let Err(err) = guard.terminal.clear() {
            tracing::warn!(%err, "terminal clear failed");
        }
    }

    #[cfg(test)]
    pub fn screen(&self) -> Screen {
        self.state.lock().screen.clone()
    }

    /// Run `f` against the backend while holding the writer lock.
    #[cfg(test)]
    pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(self.state.lock().terminal.backend())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{rows, test_sink};
    use crate::lyrics::LyricIndex;
    use crate::progress::ProgressModel;
    use std::time::Duration;

    #[test]
    fn regions_are_painted_independently() {
        let sink = test_sink(60, 20);
        let index = LyricIndex::parse("[00:01.00]hello there\n[00:04.00]next line");
        sink.paint(|s| s.lyrics = index.view(Some(0), Some(0)));
        sink.paint(|s| {
            s.progress = ProgressModel::new(Duration::from_secs(100)).at(Duration::from_secs(61), 56)
        });

        let text = rows(&sink).join("\n");
        assert!(text.contains("01:01 / 01:40"));
        assert!(text.contains("hello there"));
        assert!(text.contains("next line"));
        assert_eq!(sink.screen().lyrics.current.unwrap().original.text, "hello there");
    }

    #[test]
    fn width_reports_backend_size() {
        assert_eq!(test_sink(42, 12).width(), 42);
    }
}
