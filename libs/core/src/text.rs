use std::fmt::{self, Display, Formatter};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::Charset;

/// Shape of the character grid formed by the display's modules.
///
/// Modules are numbered row by row, left to right.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    /// Modules per row.
    pub columns: usize,

    /// Number of rows.
    pub rows: usize,
}

impl Grid {
    /// Creates a grid of the given shape.
    pub fn new(columns: usize, rows: usize) -> Self {
        Grid { columns, rows }
    }

    /// Total number of modules.
    pub fn cells(&self) -> usize {
        self.columns * self.rows
    }
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new(12, 2)
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

/// Strips diacritics and lower-cases `text`.
///
/// # Examples
///
/// ```
/// use flapper_core::text;
///
/// assert_eq!("creme brulee", text::normalize("Crème Brûlée"));
/// ```
pub fn normalize(text: &str) -> String {
    let stripped: String = text.nfd().filter(|&c| !is_combining_mark(c)).nfc().collect();
    stripped.to_lowercase()
}

/// Turns arbitrary text into exactly one character per module of `grid`.
///
/// The text is [normalized](normalize), characters that `charset` cannot show are
/// replaced with [blanks](Charset::blank), and the result is word-wrapped to the grid's width. Words
/// longer than a row are split across lines. Lines beyond the last row are dropped,
/// and every row is padded with blanks to the full width.
///
/// # Examples
///
/// ```
/// use flapper_core::{text, Charset, Grid};
///
/// let shaped = text::prepare("Hello world!", Grid::new(12, 2), &Charset::default());
/// assert_eq!("hello world             ", shaped);
/// ```
pub fn prepare(text: &str, grid: Grid, charset: &Charset) -> String {
    if grid.cells() == 0 {
        return String::new();
    }

    let blank = charset.blank();
    let restricted: String = normalize(text)
        .chars()
        .map(|c| if charset.contains(c) { c } else { blank })
        .collect();

    let mut lines = wrap(&restricted, grid.columns, blank);
    lines.truncate(grid.rows);

    let mut shaped = String::with_capacity(grid.cells());
    for row in 0..grid.rows {
        let line = lines.get(row).map(String::as_str).unwrap_or("");
        let mut width = 0;
        for c in line.chars().take(grid.columns) {
            shaped.push(c);
            width += 1;
        }
        shaped.extend(std::iter::repeat(blank).take(grid.columns - width));
    }
    shaped
}

/// Greedy word wrap.
///
/// Runs of blanks between words are kept unless a line break lands on them. Leading
/// blanks that don't fit before the first word leave the first line empty. Words
/// wider than `width` are split into `width`-sized pieces.
fn wrap(text: &str, width: usize, blank: char) -> Vec<String> {
    let mut wrapper = Wrapper {
        width,
        blank,
        lines: Vec::new(),
        line: String::new(),
        line_len: 0,
        blanks: 0,
    };

    let mut word = String::new();
    for c in text.chars() {
        if c == blank {
            if !word.is_empty() {
                wrapper.place(&word);
                word.clear();
            }
            wrapper.blanks += 1;
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        wrapper.place(&word);
    }

    wrapper.finish()
}

struct Wrapper {
    width: usize,
    blank: char,
    lines: Vec<String>,
    line: String,
    line_len: usize,
    blanks: usize,
}

impl Wrapper {
    fn place(&mut self, word: &str) {
        let word_len = word.chars().count();
        let occupied = self.line_len + self.blanks;
        if occupied > 0 && occupied + word_len > self.width {
            self.break_line();
        } else {
            self.line.extend(std::iter::repeat(self.blank).take(self.blanks));
            self.line_len += self.blanks;
        }
        self.blanks = 0;

        if word_len <= self.width {
            self.line.push_str(word);
            self.line_len += word_len;
            return;
        }

        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(self.width) {
            if self.line_len > 0 {
                self.break_line();
            }
            self.line.extend(piece);
            self.line_len = piece.len();
        }
    }

    fn break_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.line));
        self.line_len = 0;
        self.blanks = 0;
    }

    fn finish(mut self) -> Vec<String> {
        if self.line_len > 0 || self.lines.is_empty() {
            self.lines.push(self.line);
        }
        self.lines
    }
}
