use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::theme::Theme;

/// Header content for the live track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: String,
    pub artist: Option<String>,
    /// 1-based display id and playlist length.
    pub position: (usize, usize),
    pub paused: bool,
}

pub const NOW_PLAYING_HEIGHT: u16 = 3;

pub fn draw_now_playing_bar(frame: &mut Frame, area: Rect, now: &NowPlaying, theme: &Theme) {
    let status = if now.paused { "Paused" } else { "Playing" };
    let (cur, total) = now.position;
    let mut spans = vec![
        Span::styled(
            format!(" {status} "),
            Style::default().fg(Color::Black).bg(theme.accent),
        ),
        Span::raw("  "),
        Span::styled(now.title.as_str(), Style::default().fg(theme.text)),
    ];
    if let Some(ref artist) = now.artist {
        spans.push(Span::styled(
            format!("  ·  {artist}"),
            Style::default().fg(theme.dimmed),
        ));
    }
    if total > 0 {
        spans.push(Span::styled(
            format!("  {cur}/{total}"),
            Style::default().fg(theme.dimmed),
        ));
    }
    let title = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Now Playing "),
    );
    frame.render_widget(title, area);
}
