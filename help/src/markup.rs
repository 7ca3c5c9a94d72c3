//! Inline styling markup and styled text.
//!
//! Markup marks a span with `@|style,style text|@`, for example
//! `@|bold,fg(red) careful|@`. Supported styles are `bold`, `faint`,
//! `italic`, `underline`, `blink`, `reverse`, `fg(color)`, `bg(color)` and a
//! bare color name as shorthand for `fg(color)`. Colors are the eight ANSI
//! names or a 256-color index. Unknown styles are ignored.
//!
//! A parsed [`Text`] keeps its styles per span, so wrapping it yields lines
//! that each reopen and reset their own styles. Escape sequences are
//! produced by `ansi_term`.
//!
//! # Example
//!
//! ```
//! use argbind_help::Text;
//!
//! let text = Text::parse("a @|bold b|@ c");
//! assert_eq!(text.render(false), "a b c");
//! assert_eq!(text.render(true), "a \x1b[1mb\x1b[0m c");
//! ```

use std::fmt;
use std::sync::LazyLock;

use ansi_term::{Colour, Style as AnsiStyle};
use regex::Regex;

use crate::width::{char_width, str_width};

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)@\|(\S*?)(?:\s(.*?))?\|@").expect("static regex must compile")
});

static COLOR_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(fg|bg)\((\w+)\)$").expect("static regex must compile")
});

/// Terminal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    /// 256-color palette index.
    Indexed(u8),
}

impl Color {
    fn parse(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "black" => Self::Black,
            "red" => Self::Red,
            "green" => Self::Green,
            "yellow" => Self::Yellow,
            "blue" => Self::Blue,
            "magenta" => Self::Magenta,
            "cyan" => Self::Cyan,
            "white" => Self::White,
            other => Self::Indexed(other.parse().ok()?),
        })
    }

    fn colour(self) -> Colour {
        match self {
            Self::Black => Colour::Black,
            Self::Red => Colour::Red,
            Self::Green => Colour::Green,
            Self::Yellow => Colour::Yellow,
            Self::Blue => Colour::Blue,
            Self::Magenta => Colour::Purple,
            Self::Cyan => Colour::Cyan,
            Self::White => Colour::White,
            Self::Indexed(n) => Colour::Fixed(n),
        }
    }
}

/// One text attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Bold,
    Faint,
    Italic,
    Underline,
    Blink,
    Reverse,
    Fg(Color),
    Bg(Color),
}

impl Style {
    /// Parses one style name.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(caps) = COLOR_FN.captures(name) {
            let color = Color::parse(&caps[2])?;
            return Some(if &caps[1] == "fg" {
                Self::Fg(color)
            } else {
                Self::Bg(color)
            });
        }
        match name.to_ascii_lowercase().as_str() {
            "bold" => Some(Self::Bold),
            "faint" => Some(Self::Faint),
            "italic" => Some(Self::Italic),
            "underline" => Some(Self::Underline),
            "blink" => Some(Self::Blink),
            "reverse" => Some(Self::Reverse),
            other => Color::parse(other).map(Self::Fg),
        }
    }

    /// Parses a comma-separated style list, skipping unknown names.
    pub fn parse_list(spec: &str) -> Vec<Self> {
        spec.split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(Self::parse)
            .collect()
    }

    /// Adds this attribute to a terminal style.
    fn apply(self, style: AnsiStyle) -> AnsiStyle {
        match self {
            Self::Bold => style.bold(),
            Self::Faint => style.dimmed(),
            Self::Italic => style.italic(),
            Self::Underline => style.underline(),
            Self::Blink => style.blink(),
            Self::Reverse => style.reverse(),
            Self::Fg(color) => style.fg(color.colour()),
            Self::Bg(color) => style.on(color.colour()),
        }
    }
}

/// A run of text sharing one set of styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub styles: Vec<Style>,
}

/// Styled text: a sequence of spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    spans: Vec<Span>,
}

impl Text {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unstyled text, taken literally.
    pub fn plain(text: &str) -> Self {
        Self::styled(text, Vec::new())
    }

    pub fn styled(text: &str, styles: Vec<Style>) -> Self {
        let mut out = Self::new();
        out.push_styled(text, &styles);
        out
    }

    /// Parses markup.
    pub fn parse(markup: &str) -> Self {
        let mut out = Self::new();
        let mut last = 0;
        for caps in MARKUP.captures_iter(markup) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_styled(&markup[last..whole.start()], &[]);
            let styles = Style::parse_list(&caps[1]);
            let body = caps.get(2).map_or("", |m| m.as_str());
            out.push_styled(body, &styles);
            last = whole.end();
        }
        out.push_styled(&markup[last..], &[]);
        out
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Display width in columns, styles excluded.
    pub fn width(&self) -> usize {
        self.spans.iter().map(|s| str_width(&s.text)).sum()
    }

    /// The text without styles.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn push(&mut self, other: Text) {
        for span in other.spans {
            self.push_styled(&span.text, &span.styles);
        }
    }

    pub fn push_str(&mut self, text: &str) {
        self.push_styled(text, &[]);
    }

    /// Appends `text`, merging into the last span when styles match.
    pub fn push_styled(&mut self, text: &str, styles: &[Style]) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.styles == styles => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_string(),
                styles: styles.to_vec(),
            }),
        }
    }

    /// Chained form of [`push`](Self::push).
    pub fn with(mut self, other: Text) -> Self {
        self.push(other);
        self
    }

    /// Renders to a string with ANSI escape codes, or without styles.
    pub fn render(&self, ansi: bool) -> String {
        let mut out = String::new();
        for span in &self.spans {
            if ansi && !span.styles.is_empty() {
                let style = span
                    .styles
                    .iter()
                    .fold(AnsiStyle::new(), |style, s| s.apply(style));
                out.push_str(&style.paint(span.text.as_str()).to_string());
            } else {
                out.push_str(&span.text);
            }
        }
        out
    }

    /// Splits on newlines.
    pub fn lines(&self) -> Vec<Text> {
        let mut lines = vec![Text::new()];
        for span in &self.spans {
            let mut parts = span.text.split('\n');
            if let Some(first) = parts.next() {
                push_last(&mut lines, first, &span.styles);
            }
            for part in parts {
                lines.push(Text::new());
                push_last(&mut lines, part, &span.styles);
            }
        }
        lines
    }

    /// Word-wraps to `width` columns. Newlines always break; words wider
    /// than `width` are split. Every returned line is at most `width`
    /// columns wide.
    pub fn wrap(&self, width: usize) -> Vec<Text> {
        let width = width.max(2);
        let mut out = Vec::new();
        for line in self.lines() {
            wrap_line(&line, width, &mut out);
        }
        out
    }
}

fn push_last(lines: &mut [Text], text: &str, styles: &[Style]) {
    if let Some(last) = lines.last_mut() {
        last.push_styled(text, styles);
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self::plain(s)
    }
}

/// One character with the styles of its span.
type Cell<'a> = (char, &'a [Style]);

fn collect(cells: &[Cell<'_>]) -> Text {
    let mut text = Text::new();
    let mut buf = [0u8; 4];
    for (c, styles) in cells {
        text.push_styled(c.encode_utf8(&mut buf), styles);
    }
    text
}

fn cells_width(cells: &[Cell<'_>]) -> usize {
    cells.iter().map(|(c, _)| char_width(*c)).sum()
}

fn wrap_line(line: &Text, width: usize, out: &mut Vec<Text>) {
    let cells: Vec<Cell<'_>> = line
        .spans
        .iter()
        .flat_map(|span| {
            span.text
                .chars()
                .map(move |c| (if c == '\t' { ' ' } else { c }, span.styles.as_slice()))
        })
        .collect();

    // words with the whitespace run in front of them
    let mut words: Vec<(&[Cell<'_>], &[Cell<'_>])> = Vec::new();
    let mut i = 0;
    while i < cells.len() {
        let gap_start = i;
        while i < cells.len() && cells[i].0 == ' ' {
            i += 1;
        }
        let word_start = i;
        while i < cells.len() && cells[i].0 != ' ' {
            i += 1;
        }
        if word_start < i {
            words.push((&cells[gap_start..word_start], &cells[word_start..i]));
        }
    }

    let mut current: Vec<Cell<'_>> = Vec::new();
    let mut used = 0;
    for (gap, word) in words {
        let gap = if current.is_empty() { &[][..] } else { gap };
        let gap_width = cells_width(gap);
        let word_width = cells_width(word);

        if used + gap_width + word_width <= width {
            current.extend_from_slice(gap);
            current.extend_from_slice(word);
            used += gap_width + word_width;
            continue;
        }
        if !current.is_empty() {
            out.push(collect(&current));
            current.clear();
            used = 0;
        }
        for &cell in word {
            let w = char_width(cell.0);
            if used + w > width {
                out.push(collect(&current));
                current.clear();
                used = 0;
            }
            current.push(cell);
            used += w;
        }
    }
    out.push(collect(&current));
}
