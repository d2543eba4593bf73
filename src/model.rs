/// A parsed `KEY=VALUE` entry from a backing file or input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub line: u32,
}

/// Summary of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Distinct keys in the store after the scan.
    pub loaded: usize,
    /// Blank, comment and malformed lines.
    pub skipped: usize,
    pub file_found: bool,
}

/// How malformed lines are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Skip malformed lines without reporting them.
    #[default]
    Lenient,
    /// Fail with every offending line number once the input is scanned.
    Strict,
}

/// Separator written between entries when persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    /// `key=value\n` per entry.
    ///
    /// Values are not escaped, so a value containing `\n` reloads as
    /// several entries.
    #[default]
    LineSeparated,
    /// `key=value` entries back to back with no separator.
    ///
    /// Byte-compatible with files written by older tooling. Such a file
    /// reloads as a single line, so only the first key survives.
    Concatenated,
}

/// Whether `set_save` waits for the file write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persist {
    /// Queue the save and drop its handle.
    #[default]
    Background,
    /// Wait until the save finished. Its result is discarded.
    Blocking,
}
