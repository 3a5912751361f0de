//! # Upload Report
//!
//! Per-file outcomes and the aggregate summary of one upload run.

use crate::error::TransferError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    Uploaded,
    Skipped,
    Simulated,
    Failed,
}

impl UploadStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::Skipped => "SKIPPED",
            Self::Simulated => "SIMULATED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run mode flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadMode {
    /// Decide and report, never write remotely
    pub dry_run: bool,
    /// Re-transfer objects that already exist remotely
    pub overwrite: bool,
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.dry_run { "DRY-RUN" } else { "REAL" })?;
        if self.overwrite {
            f.write_str(" + OVERWRITE")?;
        }
        Ok(())
    }
}

/// Outcome for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub blob_path: String,
    pub size: u64,
    pub content_hash: Option<String>,
    pub status: UploadStatus,
    pub error: Option<TransferError>,
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.status,
            self.blob_path,
            format_bytes(self.size)
        )?;
        if let Some(hash) = &self.content_hash {
            write!(f, " {hash}")?;
        }
        if let Some(error) = &self.error {
            write!(f, ": {}", error.message)?;
        }
        Ok(())
    }
}

/// Aggregate of one upload invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub container: String,
    pub mode: UploadMode,
    pub outcomes: Vec<FileOutcome>,
}

impl UploadReport {
    #[must_use]
    pub fn new(container: impl Into<String>, mode: UploadMode) -> Self {
        Self {
            container: container.into(),
            mode,
            outcomes: Vec::new(),
        }
    }

    #[must_use]
    pub fn count(&self, status: UploadStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    #[must_use]
    pub fn uploaded(&self) -> usize {
        self.count(UploadStatus::Uploaded)
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(UploadStatus::Skipped)
    }

    #[must_use]
    pub fn simulated(&self) -> usize {
        self.count(UploadStatus::Simulated)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(UploadStatus::Failed)
    }

    #[must_use]
    pub fn total_files(&self) -> usize {
        self.outcomes.len()
    }

    /// Bytes actually transferred (Uploaded outcomes only)
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| o.status == UploadStatus::Uploaded)
            .map(|o| o.size)
            .sum()
    }

    /// True when no candidate failed
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Summary block, one line per entry
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Mode:              {}", self.mode),
            format!("Container:         {}", self.container),
            format!("Total files:       {}", self.total_files()),
            format!("Uploaded:          {}", self.uploaded()),
            format!("Skipped:           {}", self.skipped()),
            format!("Simulated:         {}", self.simulated()),
            format!("Failed:            {}", self.failed()),
            format!("Total transferred: {}", format_bytes(self.total_bytes())),
        ]
    }
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "  {outcome}")?;
        }
        writeln!(f, "UPLOAD SUMMARY")?;
        for line in self.summary_lines() {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

/// Human-readable size in 1024 steps, two decimals
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    #[allow(clippy::cast_precision_loss, reason = "sizes are only displayed")]
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}
