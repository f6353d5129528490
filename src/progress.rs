use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    text::Line,
    widgets::{Block, BorderType, Borders},
};

use crate::gauge::RoundedGauge;
use crate::theme::Theme;

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Elapsed/total time mapped onto a bar of a given width.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressView {
    pub elapsed: Duration,
    pub total: Duration,
    pub ratio: f64,
    pub bar_width: usize,
    pub filled: usize,
}

impl ProgressView {
    pub fn label(&self) -> String {
        format!("{} / {}", format_duration(self.elapsed), format_duration(self.total))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressModel {
    total: Duration,
}

impl ProgressModel {
    pub fn new(total: Duration) -> Self {
        ProgressModel { total }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    /// Pure function of the playback clock and the bar width; the fill never
    /// exceeds `bar_width`, and an unknown (zero) total shows an empty bar.
    pub fn at(&self, elapsed: Duration, bar_width: usize) -> ProgressView {
        let ratio = if self.total.is_zero() {
            0.0
        } else {
            (elapsed.as_secs_f64() / self.total.as_secs_f64()).min(1.0)
        };
        let filled = ((ratio * bar_width as f64) as usize).min(bar_width);
        ProgressView {
            elapsed,
            total: self.total,
            ratio,
            bar_width,
            filled,
        }
    }
}

pub fn draw_progress(frame: &mut Frame, area: Rect, view: &ProgressView, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Progress ")
        .title(Line::from(format!(" {} ", view.label())).alignment(Alignment::Right));

    let gauge = RoundedGauge::new(view.filled, theme.accent)
        .dimmed_color(theme.dimmed)
        .block(block);
    frame.render_widget(gauge, area);
}
