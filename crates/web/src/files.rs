//! Stored file naming and housekeeping for the upload and output directories.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Characters kept in a sanitized file name.
static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// A stored name: 32 hex digits, an underscore, then the client's name.
static STORED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{32}_(.+)$").unwrap());

/// Reduce a client-supplied file name to a safe ASCII name.
///
/// Directory components are dropped, whitespace runs become `_`, and anything
/// outside `[A-Za-z0-9_.-]` is removed. Leading and trailing dots and
/// underscores are stripped so the result is never hidden or relative.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let joined = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Whether `name` ends in one of `extensions` (case-insensitive, no dot).
pub fn has_extension(name: &str, extensions: &[&str]) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Name a file is stored under: `{uuid}_{secure name}`.
///
/// `fallback` is used when nothing survives sanitizing.
pub fn stored_name(id: Uuid, client_name: &str, fallback: &str) -> String {
    let secure = secure_filename(client_name);
    let secure = if secure.is_empty() {
        fallback.to_string()
    } else {
        secure
    };
    format!("{}_{}", id.simple(), secure)
}

/// The client-facing part of a stored name.
pub fn display_name(stored: &str) -> &str {
    STORED_NAME
        .captures(stored)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(stored)
}

/// Resolve a requested download inside `dir`.
///
/// Returns `None` for names that would leave the directory or for files that
/// no longer exist.
pub fn resolve_download(dir: &Path, filename: &str) -> Option<PathBuf> {
    if filename.is_empty() || secure_filename(filename) != filename {
        log::warn!("Rejected download name '{}'", filename);
        return None;
    }
    let path = dir.join(filename);
    path.is_file().then_some(path)
}

/// Delete files older than `retention` from each directory.
///
/// Returns how many files were removed. Files that cannot be inspected or
/// removed are skipped.
pub fn cleanup_old_files(dirs: &[&Path], retention: Duration) -> usize {
    let Some(cutoff) = SystemTime::now().checked_sub(retention) else {
        return 0;
    };

    let mut removed = 0;
    for dir in dirs {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot scan {} for cleanup: {}", dir.display(), e);
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::now());
            if modified < cutoff {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        log::info!("Cleaned up old file: {}", path.display());
                        removed += 1;
                    }
                    Err(e) => log::debug!("Could not remove {}: {}", path.display(), e),
                }
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Songs.txt"), "My_Songs.txt");
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\Users\\me\\hymns.txt"), "hymns.txt");
        assert_eq!(secure_filename("café deck.pptx"), "caf_deck.pptx");
        assert_eq!(secure_filename(".hidden"), "hidden");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("songs.txt", &["txt"]));
        assert!(has_extension("SONGS.TXT", &["txt"]));
        assert!(has_extension("master.pptx", &["pptx"]));
        assert!(!has_extension("songs.txt.exe", &["txt"]));
        assert!(!has_extension("songs", &["txt"]));
    }

    #[test]
    fn test_stored_and_display_names() {
        let id = Uuid::new_v4();
        let stored = stored_name(id, "Sunday Set.pptx", "deck.pptx");
        assert!(stored.starts_with(&id.simple().to_string()));
        assert_eq!(display_name(&stored), "Sunday_Set.pptx");

        let fallback = stored_name(id, "///", "deck.pptx");
        assert_eq!(display_name(&fallback), "deck.pptx");

        assert_eq!(display_name("plain.pptx"), "plain.pptx");
    }

    #[test]
    fn test_resolve_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deck.pptx"), b"x").unwrap();

        assert!(resolve_download(dir.path(), "deck.pptx").is_some());
        assert!(resolve_download(dir.path(), "missing.pptx").is_none());
        assert!(resolve_download(dir.path(), "../deck.pptx").is_none());
        assert!(resolve_download(dir.path(), "").is_none());
    }

    #[test]
    fn test_cleanup_keeps_recent_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("recent.txt");
        std::fs::write(&file, b"x").unwrap();

        assert_eq!(cleanup_old_files(&[dir.path()], Duration::from_secs(3600)), 0);
        assert!(file.exists());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cleanup_old_files(&[dir.path()], Duration::ZERO), 1);
        assert!(!file.exists());
    }
}
