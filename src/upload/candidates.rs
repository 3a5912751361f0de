//! # Upload Candidates
//!
//! Local file enumeration and the local-path to blob-path mapping.

use crate::constants::DATA_FILE_EXTENSION;
use crate::error::UploadError;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// One local data file and where it goes remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub local_path: PathBuf,
    /// Category-prefixed remote path, e.g. `products/products_master.tsv.gz`
    pub blob_path: String,
    pub size: u64,
    /// `sha256:<hex>` when requested
    pub content_hash: Option<String>,
    /// Why the file cannot be uploaded; reported as a failed file
    pub rejected: Option<String>,
}

/// Blob path for `path` under `root`: relative path joined with `/`
///
/// Pure: the same layout always maps to the same remote layout. `None` when
/// `path` is not under `root` or has no normal components.
#[must_use]
pub fn blob_path_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// `sha256:<hex>` of the file contents
///
/// # Errors
/// Returns the I/O error if the file cannot be read
pub fn content_hash(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

/// Collect every `*.tsv.gz` file under `root`, sorted by blob path
///
/// A file whose path is not valid UTF-8 has no blob path; it is still
/// returned, with `rejected` set, so it shows up as a failed file.
///
/// # Errors
/// Returns `UploadError::Enumeration` if `root` is missing or a directory
/// cannot be read
pub fn enumerate(root: &Path, with_hash: bool) -> Result<Vec<UploadCandidate>, UploadError> {
    let enumeration_error = |message: String| UploadError::Enumeration {
        root: root.to_path_buf(),
        message,
    };

    if !root.is_dir() {
        return Err(enumeration_error("data root is not a directory".to_string()));
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| enumeration_error(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        // Lossy so a non-UTF-8 name still matches and gets reported
        let is_data_file = entry
            .file_name()
            .to_string_lossy()
            .ends_with(DATA_FILE_EXTENSION);
        if !is_data_file {
            continue;
        }

        let (blob_path, rejected) = match blob_path_for(root, entry.path()) {
            Some(blob_path) => (blob_path, None),
            None => {
                warn!(path = %entry.path().display(), "Data file path is not valid UTF-8");
                let shown = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                (shown, Some("local path is not valid UTF-8".to_string()))
            }
        };
        let size = entry
            .metadata()
            .map_err(|e| enumeration_error(e.to_string()))?
            .len();
        let content_hash = if with_hash && rejected.is_none() {
            Some(content_hash(entry.path()).map_err(|e| {
                enumeration_error(format!("cannot hash {}: {e}", entry.path().display()))
            })?)
        } else {
            None
        };

        candidates.push(UploadCandidate {
            local_path: entry.path().to_path_buf(),
            blob_path,
            size,
            content_hash,
            rejected,
        });
    }

    candidates.sort_by(|a, b| a.blob_path.cmp(&b.blob_path));
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_blob_path_mapping() {
        let root = Path::new("/data/master_data");
        assert_eq!(
            blob_path_for(root, Path::new("/data/master_data/products/products_master.tsv.gz"))
                .as_deref(),
            Some("products/products_master.tsv.gz")
        );
        assert_eq!(
            blob_path_for(root, Path::new("/data/master_data/loose.tsv.gz")).as_deref(),
            Some("loose.tsv.gz")
        );
        assert_eq!(
            blob_path_for(root, Path::new("/data/master_data/a/b/c.tsv.gz")).as_deref(),
            Some("a/b/c.tsv.gz")
        );
        assert_eq!(blob_path_for(root, Path::new("/elsewhere/x.tsv.gz")), None);
        assert_eq!(blob_path_for(root, root), None);
    }

    #[test]
    fn test_enumerate_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("suppliers")).unwrap();
        fs::create_dir_all(root.join("products")).unwrap();
        fs::write(root.join("suppliers/suppliers_master.tsv.gz"), [0u8; 8]).unwrap();
        fs::write(root.join("products/products_master.tsv.gz"), [0u8; 12]).unwrap();
        fs::write(root.join("products/README.md"), b"ignored").unwrap();
        fs::write(root.join("products/upper.TSV.GZ"), b"ignored").unwrap();

        let candidates = enumerate(root, false).unwrap();
        let paths: Vec<&str> = candidates.iter().map(|c| c.blob_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["products/products_master.tsv.gz", "suppliers/suppliers_master.tsv.gz"]
        );
        assert_eq!(candidates[0].size, 12);
        assert_eq!(candidates[0].content_hash, None);
    }

    #[test]
    fn test_enumerate_with_hash() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tsv.gz"), b"abc").unwrap();

        let candidates = enumerate(dir.path(), true).unwrap();
        assert_eq!(
            candidates[0].content_hash.as_deref(),
            Some("sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            enumerate(&dir.path().join("missing"), false),
            Err(UploadError::Enumeration { .. })
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_path_is_kept_and_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.tsv.gz"), b"ok").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.tsv.gz")), b"bad").unwrap();

        let candidates = enumerate(dir.path(), true).unwrap();
        assert_eq!(candidates.len(), 2);

        let bad = candidates.iter().find(|c| c.rejected.is_some()).unwrap();
        assert_eq!(bad.blob_path, "bad\u{fffd}.tsv.gz");
        assert_eq!(bad.content_hash, None);
        let good = candidates.iter().find(|c| c.rejected.is_none()).unwrap();
        assert_eq!(good.blob_path, "good.tsv.gz");
    }
}
