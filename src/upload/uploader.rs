//! # Uploader
//!
//! Synchronizes local data files into a remote container.
//!
//! 1. Check the container exists (never created here).
//! 2. Enumerate local `*.tsv.gz` files.
//! 3. Skip candidates already present remotely unless overwriting.
//! 4. Transfer the rest, or simulate them in dry-run mode. A failed file is
//!    recorded and the batch continues.
//! 5. Report every decision as it is made and summarize at the end.

use crate::error::{TransferError, UploadError};
use crate::upload::audit::AuditLog;
use crate::upload::candidates::{enumerate, UploadCandidate};
use crate::upload::report::{FileOutcome, UploadMode, UploadReport, UploadStatus};
use crate::upload::store::BlobStore;
use std::path::Path;
use tracing::{error, info, info_span, warn, Instrument};

pub struct Uploader<'a, S: BlobStore + ?Sized> {
    store: &'a S,
    mode: UploadMode,
    checksum: bool,
}

impl<S: BlobStore + ?Sized> std::fmt::Debug for Uploader<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("container", &self.store.container())
            .field("mode", &self.mode)
            .field("checksum", &self.checksum)
            .finish_non_exhaustive()
    }
}

impl<'a, S: BlobStore + ?Sized> Uploader<'a, S> {
    pub fn new(store: &'a S, mode: UploadMode) -> Self {
        Self {
            store,
            mode,
            checksum: false,
        }
    }

    /// Compute a content hash for every candidate
    #[must_use]
    pub fn with_checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }

    /// Upload every data file under `root`
    ///
    /// # Errors
    /// Returns an error for pre-flight failures only: missing container,
    /// unreachable store, unreadable data root, or an audit log write
    /// failure. Per-file failures are recorded in the report.
    pub async fn run(
        &self,
        root: &Path,
        audit: &mut AuditLog,
    ) -> Result<UploadReport, UploadError> {
        let container = self.store.container().to_string();
        let span = info_span!("upload", container = %container, mode = %self.mode);

        async move {
            audit_line(
                audit,
                format!("upload to '{container}' from {} ({})", root.display(), self.mode),
            )?;

            self.check_container(&container, audit).await?;

            let candidates = match enumerate(root, self.checksum) {
                Ok(candidates) => candidates,
                Err(e) => {
                    error!(error = %e, "Enumeration failed");
                    audit_line(audit, format!("ERROR {e}"))?;
                    return Err(e);
                }
            };

            let mut report = UploadReport::new(&container, self.mode);
            if candidates.is_empty() {
                warn!(root = %root.display(), "No data files found");
                audit_line(audit, format!("WARNING no data files under {}", root.display()))?;
            } else {
                let total: u64 = candidates.iter().map(|c| c.size).sum();
                info!(
                    files = candidates.len(),
                    bytes = total,
                    "Data files found"
                );
            }

            for candidate in candidates {
                let outcome = self.process(candidate).await;
                match outcome.status {
                    UploadStatus::Failed => error!(blob.path = %outcome.blob_path, "{outcome}"),
                    _ => info!(blob.path = %outcome.blob_path, "{outcome}"),
                }
                audit_line(audit, outcome.to_string())?;
                report.outcomes.push(outcome);
            }

            for line in report.summary_lines() {
                audit_line(audit, line)?;
            }
            if report.succeeded() {
                info!(
                    uploaded = report.uploaded(),
                    skipped = report.skipped(),
                    simulated = report.simulated(),
                    "Upload finished"
                );
            } else {
                warn!(failed = report.failed(), "Upload finished with failures");
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn check_container(
        &self,
        container: &str,
        audit: &mut AuditLog,
    ) -> Result<(), UploadError> {
        match self.store.container_exists().await {
            Ok(true) => {
                info!("Container found");
                audit_line(audit, format!("container '{container}' found"))
            }
            Ok(false) => {
                let e = UploadError::ContainerNotFound {
                    container: container.to_string(),
                };
                error!(error = %e, "Pre-flight check failed");
                audit_line(audit, format!("ERROR {e}"))?;
                Err(e)
            }
            Err(source) => {
                let e = UploadError::Store(source);
                error!(error = %e, "Pre-flight check failed");
                audit_line(audit, format!("ERROR {e}"))?;
                Err(e)
            }
        }
    }

    async fn process(&self, candidate: UploadCandidate) -> FileOutcome {
        let mut outcome = FileOutcome {
            blob_path: candidate.blob_path.clone(),
            size: candidate.size,
            content_hash: candidate.content_hash.clone(),
            status: UploadStatus::Uploaded,
            error: None,
        };

        if let Some(reason) = &candidate.rejected {
            return failed(outcome, reason.clone());
        }

        if !self.mode.overwrite {
            match self.store.exists(&candidate.blob_path).await {
                Ok(true) => {
                    outcome.status = UploadStatus::Skipped;
                    return outcome;
                }
                Ok(false) => {}
                Err(e) => return failed(outcome, e.to_string()),
            }
        }

        if self.mode.dry_run {
            outcome.status = UploadStatus::Simulated;
            return outcome;
        }

        let data = match tokio::fs::read(&candidate.local_path).await {
            Ok(data) => data,
            Err(e) => return failed(outcome, format!("cannot read local file: {e}")),
        };
        match self.store.put(&candidate.blob_path, data).await {
            Ok(()) => outcome,
            Err(e) => failed(outcome, e.to_string()),
        }
    }
}

fn failed(mut outcome: FileOutcome, message: String) -> FileOutcome {
    outcome.status = UploadStatus::Failed;
    outcome.error = Some(TransferError {
        path: outcome.blob_path.clone(),
        message,
    });
    outcome
}

fn audit_line(audit: &mut AuditLog, message: impl AsRef<str>) -> Result<(), UploadError> {
    audit.line(message).map_err(UploadError::AuditLog)
}
