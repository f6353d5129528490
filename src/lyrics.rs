//! Timestamped lyric parsing and clock-to-line lookup.
//!
//! Accepts LRC text with one `[mm:ss.xx]` tag per line, or "enhanced" lines
//! where every word carries its own tag (`[00:01.000]He[00:01.500]llo`).
//! Lines sharing a timestamp with their predecessor become a translation
//! pair.

use std::{
    sync::{
        LazyLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use regex::Regex;

use crate::theme::Theme;

pub const NO_LYRICS: &str = "No lyrics";

static TIME_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([0-9]{2}):([0-9]{2})\.([0-9]{2,3})\]([^\[]*)").expect("static lyric tag pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub timestamp: Duration,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricLine {
    pub timestamp: Duration,
    pub words: Vec<Word>,
    pub text: String,
}

impl LyricLine {
    /// Split the line into its sung prefix and pending suffix for a resolved
    /// word index. `None` means nothing is sung yet; an index past the last
    /// word means the whole line is sung.
    pub fn split_sung(&self, word: Option<usize>) -> (String, String) {
        if self.words.is_empty() {
            return match word {
                Some(_) => (self.text.clone(), String::new()),
                None => (String::new(), self.text.clone()),
            };
        }
        let sung_count = word.map_or(0, |i| (i + 1).min(self.words.len()));
        let (sung, pending) = self.words.split_at(sung_count);
        (
            sung.iter().map(|w| w.text.as_str()).collect(),
            pending.iter().map(|w| w.text.as_str()).collect(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricPair {
    pub original: LyricLine,
    pub translated: LyricLine,
}

impl LyricPair {
    fn single(original: LyricLine) -> Self {
        LyricPair {
            original,
            translated: LyricLine::default(),
        }
    }

    pub fn timestamp(&self) -> Duration {
        self.original.timestamp
    }
}

/// Ordered lyric timeline. Read-only after construction apart from the
/// lookup cursor, which only speeds up forward polling.
#[derive(Debug, Default)]
pub struct LyricIndex {
    pairs: Vec<LyricPair>,
    sorted: bool,
    cursor: AtomicUsize,
}

impl LyricIndex {
    /// Parse raw lyric text. Never fails: lines without a timestamp tag are
    /// dropped, and blank input yields a single placeholder pair.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::placeholder();
        }
        Self::from_pairs(pair_lines(raw.lines().filter_map(parse_line)))
    }

    pub fn placeholder() -> Self {
        let line = LyricLine {
            timestamp: Duration::ZERO,
            words: vec![Word {
                timestamp: Duration::ZERO,
                text: NO_LYRICS.to_string(),
            }],
            text: NO_LYRICS.to_string(),
        };
        Self::from_pairs(vec![LyricPair::single(line)])
    }

    pub fn from_pairs(pairs: Vec<LyricPair>) -> Self {
        let sorted = pairs.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp());
        if !sorted {
            tracing::debug!(pairs = pairs.len(), "lyric timestamps out of order, lookups use full scan");
        }
        LyricIndex {
            pairs,
            sorted,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn pairs(&self) -> &[LyricPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Resolve the pair active at `now`. `None` means playback has not
    /// reached the first line (or there are no lines); times at or past the
    /// last line clamp to the last pair.
    pub fn locate(&self, now: Duration) -> Option<(usize, &LyricPair)> {
        let first = self.pairs.first()?;
        if now < first.timestamp() {
            return None;
        }
        let index = if self.sorted {
            self.locate_sorted(now)
        } else {
            self.scan(now)
        };
        self.cursor.store(index, Ordering::Relaxed);
        Some((index, &self.pairs[index]))
    }

    fn timestamp_at(&self, i: usize) -> Duration {
        self.pairs[i].timestamp()
    }

    fn covers(&self, i: usize, now: Duration) -> bool {
        self.timestamp_at(i) <= now && (i + 1 == self.pairs.len() || now < self.timestamp_at(i + 1))
    }

    // Requires non-decreasing timestamps and `now >= pairs[0]`.
    fn locate_sorted(&self, now: Duration) -> usize {
        let last = self.pairs.len() - 1;
        let hint = self.cursor.load(Ordering::Relaxed).min(last);
        if self.covers(hint, now) {
            return hint;
        }
        if hint < last && self.covers(hint + 1, now) {
            return hint + 1;
        }
        self.pairs.partition_point(|p| p.timestamp() <= now) - 1
    }

    fn scan(&self, now: Duration) -> usize {
        let n = self.pairs.len();
        (0..n - 1)
            .find(|&i| self.timestamp_at(i) <= now && now < self.timestamp_at(i + 1))
            .unwrap_or(n - 1)
    }

    /// Build the previous/current/next window around a resolved position.
    pub fn view(&self, line: Option<usize>, word: Option<usize>) -> LyricView {
        if self.pairs.is_empty() {
            return LyricView {
                empty: true,
                ..LyricView::default()
            };
        }
        match line {
            None => LyricView {
                next: self.pairs.first().cloned(),
                ..LyricView::default()
            },
            Some(i) => LyricView {
                previous: i.checked_sub(1).and_then(|p| self.pairs.get(p)).cloned(),
                current: self.pairs.get(i).cloned(),
                word,
                next: self.pairs.get(i + 1).cloned(),
                empty: false,
            },
        }
    }
}

/// Karaoke cursor: the last word whose start time has passed. `None` when
/// `now` precedes the first word or the line carries no words.
pub fn locate_word(line: &LyricLine, now: Duration) -> Option<usize> {
    line.words
        .iter()
        .take_while(|w| w.timestamp <= now)
        .count()
        .checked_sub(1)
}

fn word_from_tag(caps: &regex::Captures<'_>) -> Option<Word> {
    let minutes: u64 = caps[1].parse().ok()?;
    let seconds: u64 = caps[2].parse().ok()?;
    let frac = &caps[3];
    let mut millis: u64 = frac.parse().ok()?;
    if frac.len() == 2 {
        millis *= 10;
    }
    Some(Word {
        timestamp: Duration::from_secs(minutes * 60 + seconds) + Duration::from_millis(millis),
        text: caps[4].to_string(),
    })
}

fn parse_line(line: &str) -> Option<LyricLine> {
    let tagged = TIME_TAG
        .captures_iter(line)
        .map(|caps| word_from_tag(&caps))
        .collect::<Option<Vec<Word>>>()?;

    match tagged.len() {
        0 => None,
        1 => {
            let word = tagged.into_iter().next()?;
            Some(LyricLine {
                timestamp: word.timestamp,
                text: word.text.clone(),
                words: vec![word],
            })
        }
        _ => {
            let first_tag = tagged[0].timestamp;
            let words: Vec<Word> = tagged
                .into_iter()
                .filter(|w| !w.text.trim().is_empty())
                .collect();
            Some(LyricLine {
                timestamp: words.first().map_or(first_tag, |w| w.timestamp),
                text: words.iter().map(|w| w.text.as_str()).collect(),
                words,
            })
        }
    }
}

/// Merge consecutive same-timestamp lines two at a time into
/// original/translation pairs.
fn pair_lines(lines: impl IntoIterator<Item = LyricLine>) -> Vec<LyricPair> {
    let mut pairs = Vec::new();
    let mut held: Option<LyricLine> = None;
    for line in lines {
        held = match held.take() {
            None => Some(line),
            Some(original) if original.timestamp == line.timestamp => {
                pairs.push(LyricPair {
                    original,
                    translated: line,
                });
                None
            }
            Some(original) => {
                pairs.push(LyricPair::single(original));
                Some(line)
            }
        };
    }
    if let Some(original) = held {
        pairs.push(LyricPair::single(original));
    }
    pairs
}

/// What the lyric region shows for one resolved position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricView {
    pub previous: Option<LyricPair>,
    pub current: Option<LyricPair>,
    pub word: Option<usize>,
    pub next: Option<LyricPair>,
    pub empty: bool,
}

fn original_text(pair: Option<&LyricPair>) -> String {
    pair.map(|p| p.original.text.clone()).unwrap_or_default()
}

fn translated_text(pair: Option<&LyricPair>) -> String {
    pair.map(|p| p.translated.text.clone()).unwrap_or_default()
}

pub fn draw_lyrics(frame: &mut Frame, area: Rect, view: &LyricView, theme: &Theme) {
    let dim = Style::default().fg(theme.dimmed);
    let text = Style::default().fg(theme.text);

    let mut lines: Vec<Line> = Vec::with_capacity(8);
    if view.empty {
        lines.push(Line::styled(NO_LYRICS, dim));
    } else {
        lines.push(Line::styled(original_text(view.previous.as_ref()), dim));
        lines.push(Line::styled(translated_text(view.previous.as_ref()), dim));
        lines.push(Line::raw(""));

        match view.current.as_ref() {
            Some(pair) => {
                let (sung, pending) = pair.original.split_sung(view.word);
                lines.push(Line::from(vec![
                    Span::styled("➣ ", Style::default().fg(theme.accent)),
                    Span::styled(
                        sung,
                        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(pending, dim),
                ]));
                lines.push(Line::styled(pair.translated.text.clone(), text));
            }
            None => {
                lines.push(Line::raw(""));
                lines.push(Line::raw(""));
            }
        }

        lines.push(Line::raw(""));
        lines.push(Line::styled(original_text(view.next.as_ref()), text));
        lines.push(Line::styled(translated_text(view.next.as_ref()), dim));
    }

    let inner_h = area.height.saturating_sub(2) as usize;
    let pad = inner_h.saturating_sub(lines.len()) / 2;
    let mut padded: Vec<Line> = vec![Line::raw(""); pad];
    padded.extend(lines);

    let widget = Paragraph::new(padded).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(" Lyrics "),
    );
    frame.render_widget(widget, area);
}
