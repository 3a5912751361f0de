//! # Audit Log
//!
//! Timestamped plain-text record of one upload run. The file is created
//! up front so that pre-flight failures land in it too, and every line is
//! flushed as it is written.

use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: File,
}

impl AuditLog {
    /// Create `upload_<YYYYmmdd_HHMMSS>.log` in `dir`
    ///
    /// # Errors
    /// Returns the I/O error if the directory or file cannot be created
    pub fn create(dir: &Path) -> io::Result<Self> {
        Self::create_at(dir, Utc::now())
    }

    /// Same as `create` with an explicit timestamp
    ///
    /// # Errors
    /// Returns the I/O error if the directory or file cannot be created
    pub fn create_at(dir: &Path, now: DateTime<Utc>) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(file_name(now));
        // Two runs within the same second share a file
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line prefixed with an RFC 3339 timestamp
    ///
    /// # Errors
    /// Returns the I/O error if the write fails
    pub fn line(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        writeln!(
            self.file,
            "{} {}",
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            message.as_ref()
        )?;
        self.file.flush()
    }
}

fn file_name(now: DateTime<Utc>) -> String {
    format!("upload_{}.log", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_format() {
        let now = Utc.with_ymd_and_hms(2024, 11, 20, 9, 5, 7).unwrap();
        assert_eq!(file_name(now), "upload_20241120_090507.log");
    }

    #[test]
    fn test_lines_are_written_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = AuditLog::create(&dir.path().join("logs")).unwrap();
        log.line("container 'master-data' found").unwrap();
        log.line("UPLOADED a.tsv.gz (1.00 KB)").unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("container 'master-data' found"));
        assert!(lines[1].ends_with("UPLOADED a.tsv.gz (1.00 KB)"));
    }
}
