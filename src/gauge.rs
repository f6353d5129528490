use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    widgets::{Block, Widget},
};

/// One-row bar drawn with rounded line caps. The caller decides how many
/// cells are filled; the gauge clamps that to the space it gets.
pub struct RoundedGauge<'a> {
    filled: usize,
    filled_color: Color,
    dimmed_color: Color,
    block: Option<Block<'a>>,
}

impl<'a> RoundedGauge<'a> {
    pub fn new(filled: usize, filled_color: Color) -> Self {
        RoundedGauge {
            filled,
            filled_color,
            dimmed_color: Color::DarkGray,
            block: None,
        }
    }

    pub fn dimmed_color(mut self, color: Color) -> Self {
        self.dimmed_color = color;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for RoundedGauge<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width < 2 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let filled = self.filled.min(width);
        let dim = self.dimmed_color;
        let y = inner.y;

        for col in 0..width {
            let x = inner.x + col as u16;
            let (ch, fg) = if filled == 0 {
                if col == 0 {
                    ('╶', dim)
                } else if col == width - 1 {
                    ('╴', dim)
                } else {
                    ('─', dim)
                }
            } else if col < filled {
                if col == 0 {
                    ('╺', self.filled_color)
                } else if col == filled - 1 && filled < width {
                    ('╸', self.filled_color)
                } else {
                    ('━', self.filled_color)
                }
            } else if col == width - 1 {
                ('╴', dim)
            } else {
                ('─', dim)
            };

            buf[(x, y)].set_char(ch).set_fg(fg).set_bg(Color::Reset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, width: u16) -> String {
        (0..width).map(|x| buf[(x, 0)].symbol().to_string()).collect()
    }

    #[test]
    fn renders_partial_fill() {
        let area = Rect::new(0, 0, 8, 1);
        let mut buf = Buffer::empty(area);
        RoundedGauge::new(3, Color::Blue).render(area, &mut buf);
        assert_eq!(row(&buf, 8), "╺━╸────╴");
    }

    #[test]
    fn clamps_overfill() {
        let area = Rect::new(0, 0, 5, 1);
        let mut buf = Buffer::empty(area);
        RoundedGauge::new(40, Color::Blue).render(area, &mut buf);
        assert_eq!(row(&buf, 5), "╺━━━━");
    }

    #[test]
    fn empty_bar() {
        let area = Rect::new(0, 0, 4, 1);
        let mut buf = Buffer::empty(area);
        RoundedGauge::new(0, Color::Blue).render(area, &mut buf);
        assert_eq!(row(&buf, 4), "╶──╴");
    }
}
