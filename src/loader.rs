use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

use tracing::{debug, trace};

use crate::env::TargetEnv;
use crate::error::{Error, LineIssue, ParseError};
use crate::model::{LoadReport, ParseMode};
use crate::parser::{Line, LineScanner};

/// Replace `entries` with the contents of `path`, then mirror them into `target`.
///
/// A missing file leaves `entries` empty and `target` untouched. On a read
/// error `entries` keeps what was scanned so far and nothing is mirrored.
pub(crate) fn load_file(
    path: &Path,
    mode: ParseMode,
    entries: &mut BTreeMap<String, String>,
    target: &mut TargetEnv,
) -> Result<LoadReport, Error> {
    entries.clear();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no backing file, starting empty");
            return Ok(LoadReport::default());
        }
        Err(err) => return Err(err.into()),
    };

    let mut report = LoadReport {
        file_found: true,
        ..LoadReport::default()
    };
    let mut issues = Vec::new();
    let mut scanner = LineScanner::new(BufReader::new(file));

    while let Some((line_num, line)) = scanner.next_line()? {
        if let Some(kind) = line.issue() {
            issues.push(LineIssue {
                line: line_num,
                kind,
            });
        }

        match line {
            Line::Pair { key, value } => {
                entries.insert(key.to_owned(), value.to_owned());
            }
            skipped => {
                report.skipped += 1;
                trace!(line = line_num, kind = ?skipped, "skipping line");
            }
        }
    }

    if mode == ParseMode::Strict && !issues.is_empty() {
        return Err(ParseError::new(issues).into());
    }

    report.loaded = entries.len();
    mirror(entries, target);
    debug!(
        path = %path.display(),
        loaded = report.loaded,
        skipped = report.skipped,
        "loaded backing file"
    );
    Ok(report)
}

/// Keys the host rejects stay in the store but never reach the target.
fn mirror(entries: &BTreeMap<String, String>, target: &mut TargetEnv) {
    for (key, value) in entries {
        if let Err(err) = target.set_var(key, value) {
            debug!(error = %err, "entry not mirrored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(
        content: Option<&[u8]>,
        mode: ParseMode,
    ) -> (Result<LoadReport, Error>, BTreeMap<String, String>, TargetEnv) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(".env");
        if let Some(content) = content {
            std::fs::write(&path, content).expect("write fixture");
        }

        let mut entries = BTreeMap::from([("STALE".to_owned(), "x".to_owned())]);
        let mut target = TargetEnv::memory();
        let result = load_file(&path, mode, &mut entries, &mut target);
        (result, entries, target)
    }

    #[test]
    fn missing_file_is_an_empty_load() {
        let (result, entries, target) = load(None, ParseMode::Lenient);

        let report = result.expect("missing file is not an error");
        assert!(!report.file_found);
        assert_eq!(report.loaded, 0);
        assert!(entries.is_empty());
        assert!(target.as_memory().expect("memory target").is_empty());
    }

    #[test]
    fn mirrors_loaded_entries() {
        let (result, entries, target) = load(Some(b"A=1\n# c\n\nB=2".as_slice()), ParseMode::Lenient);

        let report = result.expect("load should succeed");
        assert!(report.file_found);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(entries.get("A").map(String::as_str), Some("1"));
        assert_eq!(target.as_memory().expect("memory target"), &entries);
    }

    #[test]
    fn empty_key_is_stored_but_not_mirrored() {
        let (result, entries, target) = load(Some(b"=orphan\nA=1\n".as_slice()), ParseMode::Lenient);

        result.expect("lenient load should succeed");
        assert_eq!(entries.get("").map(String::as_str), Some("orphan"));
        let mirrored = target.as_memory().expect("memory target");
        assert!(!mirrored.contains_key(""));
        assert_eq!(mirrored.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn strict_failure_keeps_scanned_entries_unmirrored() {
        let (result, entries, target) = load(Some(b"A=1\noops\n".as_slice()), ParseMode::Strict);

        match result.expect_err("expected parse error") {
            Error::Parse(parse_err) => assert_eq!(parse_err.lines(), vec![2]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(entries.get("A").map(String::as_str), Some("1"));
        assert!(target.as_memory().expect("memory target").is_empty());
    }

    #[test]
    fn read_error_keeps_partial_entries() {
        let (result, entries, target) = load(Some(b"A=1\nB=2\nC=\xff\nD=4\n".as_slice()), ParseMode::Lenient);

        match result.expect_err("expected I/O error") {
            Error::Io(io_err) => assert_eq!(io_err.kind(), ErrorKind::InvalidData),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(entries.len(), 2);
        assert!(!entries.contains_key("D"));
        assert!(target.as_memory().expect("memory target").is_empty());
    }
}
