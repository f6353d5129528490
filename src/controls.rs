use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::theme::Theme;

fn build_control_spans(theme: &Theme) -> Vec<Span<'static>> {
    let key_style = Style::default().fg(Color::Black).bg(theme.secondary);
    vec![
        Span::styled(" Space ", key_style),
        Span::raw(" Play/Pause  "),
        Span::styled(" +/n ", key_style),
        Span::raw(" Next  "),
        Span::styled(" -/N ", key_style),
        Span::raw(" Prev  "),
        Span::styled(" s ", key_style),
        Span::raw(" Shuffle  "),
        Span::styled(" q ", key_style),
        Span::raw(" Quit"),
    ]
}

pub fn draw_controls(frame: &mut Frame, area: Rect, theme: &Theme) {
    let help = Paragraph::new(Line::from(build_control_spans(theme)));
    frame.render_widget(help, area);
}
