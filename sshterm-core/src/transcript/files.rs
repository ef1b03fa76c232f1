//! Plain-text transcript export.
//!
//! Each export is one `ssh_session_<millis>.txt` file holding a short header
//! (`SSH Session Log`, `Host:`, `Username:`, blank line) followed by the
//! transcript text.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{TranscriptError, TranscriptResult};

/// File name prefix of exported transcripts
pub const FILE_PREFIX: &str = "ssh_session_";

/// File name suffix of exported transcripts
pub const FILE_SUFFIX: &str = ".txt";

/// An exported transcript file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFile {
    /// File name inside the export directory
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, if the filesystem reports one
    pub modified: Option<DateTime<Utc>>,
}

/// Replaces characters that are unsafe in file names
///
/// Keeps alphanumerics, `-`, `_` and `.`, and limits the result to 64
/// characters.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect()
}

/// Returns true if `name` looks like an exported transcript
#[must_use]
pub fn is_transcript_file_name(name: &str) -> bool {
    name.starts_with(FILE_PREFIX)
        && name.ends_with(FILE_SUFFIX)
        && name.len() > FILE_PREFIX.len() + FILE_SUFFIX.len()
        && sanitize_filename(name) == name
}

/// Builds the file contents for an export
#[must_use]
pub fn render_transcript(host: &str, username: &str, text: &str) -> String {
    format!("SSH Session Log\nHost: {host}\nUsername: {username}\n\n{text}")
}

/// Directory of exported transcript files
#[derive(Debug, Clone)]
pub struct TranscriptFiles {
    dir: PathBuf,
}

impl TranscriptFiles {
    /// Uses `dir` as the export directory; it is created on first export
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the export directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a new export stamped with the current time
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn export(&self, host: &str, username: &str, text: &str) -> TranscriptResult<PathBuf> {
        self.export_at(Utc::now().timestamp_millis(), host, username, text)
    }

    /// Writes a new export named after `millis`
    ///
    /// Existing files are never overwritten: if the name is taken, the next
    /// free millisecond is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn export_at(
        &self,
        millis: i64,
        host: &str,
        username: &str,
        text: &str,
    ) -> TranscriptResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let contents = render_transcript(host, username, text);

        let mut stamp = millis;
        loop {
            let path = self.dir.join(format!("{FILE_PREFIX}{stamp}{FILE_SUFFIX}"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(contents.as_bytes())?;
                    file.sync_all()?;
                    tracing::info!(path = %path.display(), "Transcript exported");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Lists exports, most recently modified first
    ///
    /// A missing directory lists as empty. Files not named like an export
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn list(&self) -> TranscriptResult<Vec<TranscriptFile>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let metadata = entry.metadata()?;
            if !metadata.is_file() || !is_transcript_file_name(&name) {
                continue;
            }
            files.push(TranscriptFile {
                path: entry.path(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                name,
            });
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(files)
    }

    /// Reads one export
    ///
    /// # Errors
    ///
    /// Returns `TranscriptError::NotFound` for unknown or invalid names.
    pub fn read(&self, name: &str) -> TranscriptResult<String> {
        let path = self.resolve(name)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TranscriptError::NotFound(name.to_string()),
            _ => e.into(),
        })
    }

    /// Deletes one export
    ///
    /// # Errors
    ///
    /// Returns `TranscriptError::NotFound` for unknown or invalid names.
    pub fn delete(&self, name: &str) -> TranscriptResult<()> {
        let path = self.resolve(name)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TranscriptError::NotFound(name.to_string()),
            _ => e.into(),
        })
    }

    /// Maps a bare export name to its path, refusing anything else
    fn resolve(&self, name: &str) -> TranscriptResult<PathBuf> {
        if is_transcript_file_name(name) {
            Ok(self.dir.join(name))
        } else {
            Err(TranscriptError::NotFound(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my server"), "my_server");
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename(&"a".repeat(100)).len(), 64);
    }

    #[test]
    fn test_transcript_file_names() {
        assert!(is_transcript_file_name("ssh_session_1700000000000.txt"));
        assert!(!is_transcript_file_name("ssh_session_.txt"));
        assert!(!is_transcript_file_name("notes.txt"));
        assert!(!is_transcript_file_name("ssh_session_1/../x.txt"));
    }

    #[test]
    fn test_export_format() {
        let temp = TempDir::new().unwrap();
        let files = TranscriptFiles::new(temp.path().join("sessions"));
        let path = files
            .export_at(1_700_000_000_000, "example.com", "alice", "ls\nfile")
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            "ssh_session_1700000000000.txt"
        );
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "SSH Session Log\nHost: example.com\nUsername: alice\n\nls\nfile"
        );
    }

    #[test]
    fn test_export_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let files = TranscriptFiles::new(temp.path());
        let first = files.export_at(42, "h", "u", "one").unwrap();
        let second = files.export_at(42, "h", "u", "two").unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("ssh_session_43.txt"));
    }

    #[test]
    fn test_list_read_delete() {
        let temp = TempDir::new().unwrap();
        let files = TranscriptFiles::new(temp.path());
        assert!(files.list().unwrap().is_empty());

        files.export_at(1, "h", "u", "text").unwrap();
        fs::write(temp.path().join("other.txt"), "ignored").unwrap();

        let listed = files.list().unwrap();
        assert_eq!(listed.len(), 1);
        let name = listed[0].name.clone();
        assert!(files.read(&name).unwrap().ends_with("text"));

        files.delete(&name).unwrap();
        assert!(matches!(files.read(&name), Err(TranscriptError::NotFound(_))));
        assert!(matches!(files.delete(&name), Err(TranscriptError::NotFound(_))));
        assert!(matches!(
            files.read("../other.txt"),
            Err(TranscriptError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_directory_lists_empty() {
        let temp = TempDir::new().unwrap();
        let files = TranscriptFiles::new(temp.path().join("absent"));
        assert!(files.list().unwrap().is_empty());
    }
}
