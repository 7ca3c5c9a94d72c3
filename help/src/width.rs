//! Display width of characters in a monospace terminal.
//!
//! Widths come from the Unicode East Asian Width tables: wide and fullwidth
//! characters (CJK, emoji presentation) take two columns and combining marks
//! take none. A tab counts as one column since wrapping turns it into a
//! space. Other control characters take none.

use unicode_width::UnicodeWidthChar;

/// Columns taken by `c`.
pub fn char_width(c: char) -> usize {
    if c == '\t' {
        return 1;
    }
    c.width().unwrap_or(0)
}

/// Columns taken by `s`, the sum of its characters' widths.
///
/// ```
/// use argbind_help::str_width;
///
/// assert_eq!(str_width("abc"), 3);
/// assert_eq!(str_width("日本"), 4);
/// assert_eq!(str_width("e\u{301}"), 1);
/// assert_eq!(str_width("🚀"), 2);
/// ```
pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}
