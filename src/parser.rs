use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{Error, LineIssue, ParseError, ParseErrorKind};
use crate::model::{Entry, ParseMode};

/// Classification of a single raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Comment,
    /// Neither blank nor a comment, and no `=` anywhere.
    Malformed,
    Pair { key: &'a str, value: &'a str },
}

impl Line<'_> {
    /// What a strict parse reports for this line, if anything.
    pub fn issue(&self) -> Option<ParseErrorKind> {
        match self {
            Self::Malformed => Some(ParseErrorKind::MissingSeparator),
            Self::Pair { key, .. } if key.is_empty() => Some(ParseErrorKind::EmptyKey),
            _ => None,
        }
    }
}

/// Strip spaces, tabs, `\r` and `\n` from both ends.
///
/// Other Unicode whitespace is kept.
pub fn trim_line(line: &str) -> &str {
    line.trim_matches(is_line_space)
}

fn is_line_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

pub fn classify_line(raw: &str) -> Line<'_> {
    let line = trim_line(raw);
    if line.is_empty() {
        return Line::Blank;
    }
    if line.starts_with('#') {
        return Line::Comment;
    }

    // Only the first `=` separates; key and value keep their inner spacing.
    match line.split_once('=') {
        Some((key, value)) => Line::Pair { key, value },
        None => Line::Malformed,
    }
}

/// Split a raw line into `(key, value)`, or `None` when the line is skipped.
pub fn parse_line(raw: &str) -> Option<(&str, &str)> {
    match classify_line(raw) {
        Line::Pair { key, value } => Some((key, value)),
        _ => None,
    }
}

/// Parse entries from UTF-8 text, skipping malformed lines.
///
/// Duplicate keys keep their last value.
pub fn parse_str(input: &str) -> Vec<Entry> {
    let mut collector = EntryCollector::default();
    for (idx, raw) in input.split_inclusive('\n').enumerate() {
        collector.push(line_number(idx), classify_line(raw));
    }
    collector.entries
}

// 1-based, saturating like `LineScanner`.
fn line_number(idx: usize) -> u32 {
    u32::try_from(idx.saturating_add(1)).unwrap_or(u32::MAX)
}

/// Parse entries from UTF-8 text using a specific parse mode.
pub fn parse_str_with_mode(input: &str, mode: ParseMode) -> Result<Vec<Entry>, Error> {
    parse_reader_with_mode(input.as_bytes(), mode)
}

/// Parse entries from a buffered reader, skipping malformed lines.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<Entry>, Error> {
    parse_reader_with_mode(reader, ParseMode::Lenient)
}

/// Parse entries from a buffered reader using a specific parse mode.
///
/// Input is consumed line by line. Invalid UTF-8 surfaces as an I/O error
/// of kind `InvalidData`.
pub fn parse_reader_with_mode<R: BufRead>(reader: R, mode: ParseMode) -> Result<Vec<Entry>, Error> {
    let mut scanner = LineScanner::new(reader);
    let mut collector = EntryCollector::default();
    while let Some((line_num, line)) = scanner.next_line()? {
        collector.push(line_num, line);
    }
    collector.finish(mode)
}

/// Reads `\n`-terminated lines one at a time and classifies them.
///
/// A final line without a trailing newline is still returned.
#[derive(Debug)]
pub struct LineScanner<R> {
    reader: R,
    buf: String,
    line: u32,
}

impl<R: BufRead> LineScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line: 0,
        }
    }

    /// Next 1-based line number and its classification, or `None` at end of input.
    pub fn next_line(&mut self) -> std::io::Result<Option<(u32, Line<'_>)>> {
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line = self.line.saturating_add(1);
        Ok(Some((self.line, classify_line(&self.buf))))
    }
}

#[derive(Debug, Default)]
struct EntryCollector {
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    issues: Vec<LineIssue>,
}

impl EntryCollector {
    fn push(&mut self, line_num: u32, line: Line<'_>) {
        if let Some(kind) = line.issue() {
            self.issues.push(LineIssue {
                line: line_num,
                kind,
            });
        }

        let Line::Pair { key, value } = line else {
            return;
        };
        let entry = Entry {
            key: key.to_owned(),
            value: value.to_owned(),
            line: line_num,
        };

        if let Some(existing_idx) = self.by_key.get(key).copied() {
            self.entries[existing_idx] = entry;
        } else {
            self.by_key.insert(entry.key.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    fn finish(self, mode: ParseMode) -> Result<Vec<Entry>, Error> {
        if mode == ParseMode::Strict && !self.issues.is_empty() {
            return Err(ParseError::new(self.issues).into());
        }
        Ok(self.entries)
    }
}
