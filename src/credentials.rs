//! # Credential Store
//!
//! Versioned, on-disk key/value record of everything a provisioning run
//! produced: resource names, connection strings and the SQL admin login.
//!
//! The store is loaded and saved explicitly and passed by reference into
//! both the provisioner and the uploader. On disk it is a dotenv file
//! (`KEY='value'`) with mode 0600, and a sibling `.gitignore` keeps it out
//! of version control.

use crate::resource::ResourceKind;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Format version written by this crate
pub const CREDENTIALS_VERSION: u32 = 1;

pub const VERSION_KEY: &str = "SCA_CREDENTIALS_VERSION";
pub const PROVISIONED_AT_KEY: &str = "PROVISIONED_AT";
pub const PROVISIONING_COMPLETE_KEY: &str = "PROVISIONING_COMPLETE";
pub const NAME_SUFFIX_KEY: &str = "NAME_SUFFIX";
pub const SUBSCRIPTION_ID_KEY: &str = "SUBSCRIPTION_ID";
pub const LOCATION_KEY: &str = "LOCATION";

/// Keys every downstream consumer relies on after a successful run
pub const REQUIRED_KEYS: &[&str] = &[
    VERSION_KEY,
    PROVISIONING_COMPLETE_KEY,
    SUBSCRIPTION_ID_KEY,
    "RESOURCE_GROUP",
    LOCATION_KEY,
    "STORAGE_ACCOUNT_NAME",
    "STORAGE_CONNECTION_STRING",
    "STORAGE_CONTAINER_NAME",
    "DATALAKE_ACCOUNT_NAME",
    "DATALAKE_CONNECTION_STRING",
    "DATALAKE_CONTAINERS",
    "SQL_SERVER_NAME",
    "SQL_SERVER_FQDN",
    "SQL_ADMIN_USERNAME",
    "SQL_ADMIN_PASSWORD",
    "SQL_DATABASE_NAME",
    "DATA_FACTORY_NAME",
    "RESOURCE_GROUP_STATUS",
    "STORAGE_STATUS",
    "DATALAKE_STATUS",
    "SQL_SERVER_STATUS",
    "SQL_DATABASE_STATUS",
    "DATA_FACTORY_STATUS",
];

const HEADER: &str = "# Azure resource credentials for the supply chain analytics platform.\n\
# Generated by sca-provision. Contains secrets: do not commit or share.\n";

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse credential store {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("credential store {path} has version {found}; this tool supports up to {supported}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },
}

/// Per-resource provisioning status recorded in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Complete,
    Failed,
    /// Not reached yet, or the run was interrupted
    Incomplete,
}

impl ResourceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Incomplete => "incomplete",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "complete" => Some(Self::Complete),
            "failed" => Some(Self::Failed),
            "incomplete" => Some(Self::Incomplete),
            _ => None,
        }
    }
}

pub struct CredentialStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

// Values include connection strings and the admin password
impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CredentialStore {
    /// Empty store that will be saved at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: BTreeMap::new(),
        }
    }

    /// Load the store at `path`; a missing file yields an empty store
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or was written
    /// by a newer version of this tool
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CredentialStoreError> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "No credential store yet");
            return Ok(Self::new(path));
        }

        let iter = dotenvy::from_path_iter(&path).map_err(|e| CredentialStoreError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let mut values = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| CredentialStoreError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            values.insert(key, value);
        }

        if let Some(raw) = values.get(VERSION_KEY) {
            let found = raw.parse::<u32>().map_err(|_| CredentialStoreError::Parse {
                path: path.clone(),
                message: format!("{VERSION_KEY} '{raw}' is not a number"),
            })?;
            if found > CREDENTIALS_VERSION {
                return Err(CredentialStoreError::UnsupportedVersion {
                    path,
                    found,
                    supported: CREDENTIALS_VERSION,
                });
            }
        }

        Ok(Self { path, values })
    }

    /// Write the store with owner-only permissions and keep it out of git
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// an interrupted save never leaves a truncated store behind.
    ///
    /// # Errors
    /// Returns an error if the directory, file or `.gitignore` cannot be written
    pub fn save(&mut self) -> Result<(), CredentialStoreError> {
        self.values
            .insert(VERSION_KEY.to_string(), CREDENTIALS_VERSION.to_string());

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CredentialStoreError::Io { path, source }
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(io_err(dir))?;

        let mut contents = String::from(HEADER);
        for (key, value) in &self.values {
            contents.push_str(key);
            contents.push('=');
            contents.push_str(&quote_value(value));
            contents.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, contents.as_bytes()).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;

        if let Some(file_name) = self.path.file_name().and_then(|n| n.to_str()) {
            ensure_gitignored(dir, file_name).map_err(io_err(&dir.join(".gitignore")))?;
        }

        debug!(path = %self.path.display(), keys = self.values.len(), "Saved credential store");
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Drop every entry (keeps the path)
    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn status(&self, kind: ResourceKind) -> Option<ResourceStatus> {
        self.get(kind.status_key()).and_then(ResourceStatus::parse)
    }

    pub fn set_status(&mut self, kind: ResourceKind, status: ResourceStatus) {
        self.set(kind.status_key(), status.as_str());
    }

    /// Keep only the name key of `kind` and flag it with `status`
    ///
    /// Used for resources that failed or were not reached, so the store never
    /// carries stale connection material for them.
    pub fn retain_name_only(&mut self, kind: ResourceKind, status: ResourceStatus) {
        for key in kind.material_keys() {
            self.values.remove(*key);
        }
        self.set_status(kind, status);
    }

    /// Required keys that are absent or empty
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| self.get(key).is_none())
            .collect()
    }
}

/// Quote a value so `dotenvy` reads it back verbatim
///
/// Single quotes are literal. Values that contain a single quote or a
/// newline use double quotes with `\\`, `\"`, `\$` and `\n` escaped.
fn quote_value(value: &str) -> String {
    if !value.contains('\'') && !value.contains('\n') {
        return format!("'{value}'");
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '$' => quoted.push_str("\\$"),
            '\n' => quoted.push_str("\\n"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn ensure_gitignored(dir: &Path, file_name: &str) -> std::io::Result<()> {
    let gitignore = dir.join(".gitignore");
    let existing = match fs::read_to_string(&gitignore) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    if existing.lines().any(|line| line.trim() == file_name) {
        return Ok(());
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&gitignore)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{file_name}")?;
    warn!(gitignore = %gitignore.display(), "Added credential store to .gitignore");
    Ok(())
}
