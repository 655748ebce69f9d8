//! Flat `key=value` domain files.
//!
//! One property per line, `#`/`!` comment lines and blank lines ignored. Spaces, tabs
//! and form feeds around the key and before the value are padding. A backslash escapes
//! `\\`, newlines, carriage returns, tabs, any leading whitespace character, and inside
//! keys `=`, `#` and `!`.
//! Files are written atomically (unique temp file, `fsync`, rename).

use crate::error::{StoreError, StoreErrorExt};
use fxhash::FxHashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

const TMP_MARKER: &str = ".anviltmp.";

/// Reads a domain file; `Ok(None)` when the file does not exist.
pub(crate) fn read_entries(path: &Path) -> Result<Option<FxHashMap<String, String>>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(StoreError::Io {
                source: err,
                context: Some(format!("Read failed: {}", path.display()).into()),
            });
        },
    };

    parse(&content, path).map(Some)
}

pub(crate) fn parse(content: &str, path: &Path) -> Result<FxHashMap<String, String>, StoreError> {
    let mut entries = FxHashMap::default();

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim_start_matches(is_blank);
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let malformed = |message: &'static str| StoreError::Malformed {
            path: path.display().to_string(),
            line: index + 1,
            message: message.into(),
            context: None,
        };

        let split = separator_position(trimmed).ok_or_else(|| malformed("missing `=`"))?;
        let key = unescape(trimmed[..split].trim_end_matches(is_blank));
        if key.trim().is_empty() {
            return Err(malformed("empty key"));
        }
        let value = unescape(trimmed[split + 1..].trim_start_matches(is_blank));

        entries.insert(key, value);
    }

    Ok(entries)
}

/// Serializes entries sorted by key, prefixed with a header comment.
pub(crate) fn render(domain: &str, entries: &FxHashMap<String, String>) -> String {
    let mut sorted: Vec<_> = entries.iter().collect();
    sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut out = format!("# Anvil domain `{domain}`\n");
    for (key, value) in sorted {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}

/// Writes `data` to `path` using the atomic swap pattern.
pub(crate) fn write_atomic(path: &Path, data: &[u8], counter: &AtomicU64) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .context(format!("Failed to create config folder {}", parent.display()))?;
    }

    let temp = unique_tmp_path(path, counter);
    {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp)
            .context(format!("Temp creation failed: {}", temp.display()))?;
        file.write_all(data).context("Write failed")?;
        file.sync_all().context("Hardware sync failed")?;
    }

    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(StoreError::Io {
            source: err,
            context: Some(
                format!("Atomic swap failed: {} -> {}", temp.display(), path.display()).into(),
            ),
        });
    }

    debug!(path = %path.display(), "Domain file saved atomically");
    Ok(())
}

/// Removes temp files left behind by an interrupted save.
pub(crate) fn purge_tmp(folder: &Path) {
    let Ok(entries) = fs::read_dir(folder) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_tmp = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(TMP_MARKER));
        if !is_tmp {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed orphaned temp file"),
            Err(err) => warn!(path = %path.display(), error = %err, "Failed to remove temp file"),
        }
    }
}

fn unique_tmp_path(path: &Path, counter: &AtomicU64) -> PathBuf {
    let id = counter.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!("{TMP_MARKER}{}.{id}", std::process::id()));
    path.with_file_name(name)
}

/// Separator padding; any other whitespace belongs to the key or value.
const fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0C')
}

/// Byte offset of the first `=` not preceded by an escaping backslash.
fn separator_position(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (pos, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '=' => return Some(pos),
            _ => {},
        }
    }
    None
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (pos, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '=' if is_key => out.push_str("\\="),
            '#' | '!' if is_key && pos == 0 => {
                out.push('\\');
                out.push(c);
            },
            _ if pos == 0 && c.is_whitespace() => {
                out.push('\\');
                out.push(c);
            },
            _ => out.push(c),
        }
    }
    out
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(content: &str) -> Result<FxHashMap<String, String>, StoreError> {
        parse(content, Path::new("test.config"))
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let entries = parse_str("# header\n\n! bang comment\nintProp=20\n  dblProp = 23.02\n")
            .expect("parse");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["intProp"], "20");
        assert_eq!(entries["dblProp"], "23.02");
    }

    #[test]
    fn value_may_contain_separators() {
        let entries = parse_str("url=postgres://u:p@host/db?a=b\n").expect("parse");
        assert_eq!(entries["url"], "postgres://u:p@host/db?a=b");
    }

    #[test]
    fn line_without_separator_reports_line_number() {
        let err = parse_str("a=1\njust text\n").unwrap_err();
        assert!(
            matches!(err, StoreError::Malformed { line: 2, .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn escaped_content_survives_render_and_parse() {
        let mut entries = FxHashMap::default();
        entries.insert("multi\nline=key".to_owned(), "tab\there\\path\nnext".to_owned());
        entries.insert("#hash".to_owned(), "=starts with equals".to_owned());
        entries.insert("padded".to_owned(), "  two leading spaces".to_owned());
        entries.insert("empty".to_owned(), String::new());
        entries.insert("ideographic".to_owned(), "\u{3000}x".to_owned());
        entries.insert("vertical".to_owned(), "\u{0B}y".to_owned());
        entries.insert("nbsp".to_owned(), "\u{A0}z".to_owned());
        entries.insert("feed".to_owned(), "\x0Cw".to_owned());

        let rendered = render("demo", &entries);
        assert!(rendered.starts_with("# Anvil domain `demo`\n"));

        let parsed = parse_str(&rendered).expect("parse rendered");
        assert_eq!(parsed, entries);
    }

    #[test]
    fn render_sorts_keys() {
        let mut entries = FxHashMap::default();
        entries.insert("b".to_owned(), "2".to_owned());
        entries.insert("a".to_owned(), "1".to_owned());
        assert_eq!(render("d", &entries), "# Anvil domain `d`\na=1\nb=2\n");
    }
}
