//! # Environment Config
//!
//! Strongly typed provisioning configuration.
//!
//! Values come from a [`ConfigSource`]: an optional dotenv file overlaid by
//! the process environment. Every field is validated up front and all
//! issues are reported together, before any network call is made.

use crate::config::validation::{
    normalize_subscription_id, parse_firewall_rules, validate_container_name,
    validate_database_name, validate_dns_prefix, validate_location, validate_name_suffix,
    validate_resource_group, validate_storage_prefix,
};
use crate::constants::{
    DEFAULT_ARM_ENDPOINT, DEFAULT_CREDENTIAL_STORE_PATH, DEFAULT_DATALAKE_ACCOUNT_PREFIX,
    DEFAULT_DATALAKE_CONTAINERS, DEFAULT_DATA_FACTORY_PREFIX, DEFAULT_LOCATION,
    DEFAULT_MASTER_DATA_CONTAINER, DEFAULT_RESOURCE_GROUP, DEFAULT_SQL_ADMIN_LOGIN,
    DEFAULT_SQL_DATABASE_CAPACITY, DEFAULT_SQL_DATABASE_NAME, DEFAULT_SQL_DATABASE_SKU,
    DEFAULT_SQL_DATABASE_TIER, DEFAULT_SQL_FIREWALL_ALLOW, DEFAULT_SQL_SERVER_PREFIX, DEFAULT_STORAGE_ACCOUNT_PREFIX,
    DEFAULT_STORAGE_SKU,
};
use crate::error::{ConfigError, FieldIssue};
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Layered key/value source: config file first, process environment on top
#[derive(Clone, Default)]
pub struct ConfigSource {
    values: HashMap<String, String>,
}

// Values may hold secrets (SQL_ADMIN_PASSWORD); only keys are shown
impl fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("ConfigSource")
            .field("keys", &keys)
            .finish()
    }
}

impl ConfigSource {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Snapshot of the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Parse a dotenv-format file without touching the process environment
    ///
    /// # Errors
    /// Returns a `ConfigError` naming the file when it cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let field = path.display().to_string();
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::single(field.clone(), format!("cannot read config file: {e}")))?;

        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| {
                ConfigError::single(field.clone(), format!("cannot parse config file: {e}"))
            })?;
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Config file (when present) overlaid by the process environment
    ///
    /// An explicitly named file must exist; the default file is optional.
    ///
    /// # Errors
    /// Returns a `ConfigError` when the file cannot be read or parsed
    pub fn layered(config_file: &Path, required: bool) -> Result<Self, ConfigError> {
        let mut source = if config_file.exists() {
            debug!(path = %config_file.display(), "Loading config file");
            Self::from_file(config_file)?
        } else if required {
            return Err(ConfigError::single(
                config_file.display().to_string(),
                "config file does not exist",
            ));
        } else {
            Self::default()
        };
        source.overlay(Self::from_env());
        Ok(source)
    }

    /// Entries in `other` replace entries in `self`
    pub fn overlay(&mut self, other: Self) {
        self.values.extend(other.values);
    }

    /// Trimmed, non-empty value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// How tokens for Azure Resource Manager are obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// `az login` session of the operator
    AzureCli,
    ManagedIdentity,
    WorkloadIdentity { client_id: String },
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AzureCli => write!(f, "cli"),
            Self::ManagedIdentity => write!(f, "managed-identity"),
            Self::WorkloadIdentity { .. } => write!(f, "workload-identity"),
        }
    }
}

/// One SQL server firewall rule (inclusive IPv4 range)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    pub name: String,
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlDatabaseSku {
    pub name: String,
    pub tier: String,
    pub capacity: u32,
}

/// Validated provisioning configuration; immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    pub storage_account_prefix: String,
    pub datalake_account_prefix: String,
    pub sql_server_prefix: String,
    pub data_factory_prefix: String,
    /// Operator pinned suffix; `None` means generate (or reuse the stored one)
    pub name_suffix: Option<String>,
    pub storage_sku: String,
    pub sql_admin_login: String,
    pub sql_database_name: String,
    pub sql_database_sku: SqlDatabaseSku,
    pub firewall_rules: Vec<FirewallRule>,
    pub master_data_container: String,
    pub datalake_containers: Vec<String>,
    pub auth: AuthMethod,
    pub arm_endpoint: String,
    pub credential_store_path: PathBuf,
}

/// Collects field issues while reading values
struct Reader<'a> {
    source: &'a ConfigSource,
    issues: Vec<FieldIssue>,
}

impl Reader<'_> {
    fn or_default(&self, key: &str, default: &str) -> String {
        self.source.get(key).unwrap_or(default).to_string()
    }

    /// Read `key` with a default and run a validator over it
    fn checked(
        &mut self,
        key: &str,
        default: &str,
        check: fn(&str, &str) -> Result<(), FieldIssue>,
    ) -> String {
        let value = self.or_default(key, default);
        if let Err(issue) = check(&value, key) {
            self.issues.push(issue);
        }
        value
    }
}

impl EnvironmentConfig {
    /// Build and validate a config from a layered source
    ///
    /// # Errors
    /// Returns a `ConfigError` listing every missing or invalid field
    pub fn from_source(source: &ConfigSource) -> Result<Self, ConfigError> {
        let mut r = Reader {
            source,
            issues: Vec::new(),
        };

        let subscription_id = match source
            .get("AZURE_SUBSCRIPTION_ID")
            .map(|v| ("AZURE_SUBSCRIPTION_ID", v))
            .or_else(|| source.get("SUBSCRIPTION_ID").map(|v| ("SUBSCRIPTION_ID", v)))
        {
            Some((key, raw)) => normalize_subscription_id(raw, key).unwrap_or_else(|issue| {
                r.issues.push(issue);
                String::new()
            }),
            None => {
                r.issues.push(FieldIssue::new(
                    "AZURE_SUBSCRIPTION_ID",
                    "is required (or set SUBSCRIPTION_ID)",
                ));
                String::new()
            }
        };

        let resource_group = r.checked(
            "RESOURCE_GROUP",
            DEFAULT_RESOURCE_GROUP,
            validate_resource_group,
        );
        let location = r.checked("LOCATION", DEFAULT_LOCATION, validate_location);
        let storage_account_prefix = r.checked(
            "STORAGE_ACCOUNT_PREFIX",
            DEFAULT_STORAGE_ACCOUNT_PREFIX,
            validate_storage_prefix,
        );
        let datalake_account_prefix = r.checked(
            "DATALAKE_ACCOUNT_PREFIX",
            DEFAULT_DATALAKE_ACCOUNT_PREFIX,
            validate_storage_prefix,
        );
        let sql_server_prefix = r.checked(
            "SQL_SERVER_PREFIX",
            DEFAULT_SQL_SERVER_PREFIX,
            validate_dns_prefix,
        );
        let data_factory_prefix = r.checked(
            "DATA_FACTORY_PREFIX",
            DEFAULT_DATA_FACTORY_PREFIX,
            validate_dns_prefix,
        );

        let name_suffix = source.get("NAME_SUFFIX").map(str::to_string);
        if let Some(suffix) = &name_suffix {
            if let Err(issue) = validate_name_suffix(suffix, "NAME_SUFFIX") {
                r.issues.push(issue);
            }
        }

        let storage_sku = r.or_default("STORAGE_SKU", DEFAULT_STORAGE_SKU);
        let sql_admin_login = r.or_default("SQL_ADMIN_LOGIN", DEFAULT_SQL_ADMIN_LOGIN);
        if matches!(
            sql_admin_login.to_lowercase().as_str(),
            "admin" | "administrator" | "sa" | "root" | "dbmanager" | "loginmanager" | "public"
        ) {
            r.issues.push(FieldIssue::new(
                "SQL_ADMIN_LOGIN",
                format!("'{sql_admin_login}' is a reserved SQL login name"),
            ));
        }
        let sql_database_name = r.checked(
            "SQL_DATABASE_NAME",
            DEFAULT_SQL_DATABASE_NAME,
            validate_database_name,
        );

        let capacity = match source.get("SQL_DATABASE_CAPACITY") {
            None => DEFAULT_SQL_DATABASE_CAPACITY,
            Some(raw) => match raw.parse::<u32>() {
                Ok(value) if value > 0 => value,
                _ => {
                    r.issues.push(FieldIssue::new(
                        "SQL_DATABASE_CAPACITY",
                        format!("'{raw}' must be a positive integer"),
                    ));
                    DEFAULT_SQL_DATABASE_CAPACITY
                }
            },
        };
        let sql_database_sku = SqlDatabaseSku {
            name: r.or_default("SQL_DATABASE_SKU", DEFAULT_SQL_DATABASE_SKU),
            tier: r.or_default("SQL_DATABASE_TIER", DEFAULT_SQL_DATABASE_TIER),
            capacity,
        };

        let firewall_raw = r.or_default("SQL_FIREWALL_ALLOW", DEFAULT_SQL_FIREWALL_ALLOW);
        let firewall_rules = parse_firewall_rules(&firewall_raw, "SQL_FIREWALL_ALLOW")
            .unwrap_or_else(|issue| {
                r.issues.push(issue);
                Vec::new()
            });

        let master_data_container = r.checked(
            "MASTER_DATA_CONTAINER",
            DEFAULT_MASTER_DATA_CONTAINER,
            validate_container_name,
        );

        let datalake_containers: Vec<String> = r
            .or_default("DATALAKE_CONTAINERS", DEFAULT_DATALAKE_CONTAINERS)
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if datalake_containers.is_empty() {
            r.issues.push(FieldIssue::new(
                "DATALAKE_CONTAINERS",
                "at least one container is required",
            ));
        }
        for container in &datalake_containers {
            if let Err(issue) = validate_container_name(container, "DATALAKE_CONTAINERS") {
                r.issues.push(issue);
            }
        }

        let auth = match source.get("AZURE_AUTH").unwrap_or("cli") {
            "cli" | "azure-cli" => AuthMethod::AzureCli,
            "managed-identity" | "msi" => AuthMethod::ManagedIdentity,
            "workload-identity" => match source.get("AZURE_CLIENT_ID") {
                Some(client_id) => AuthMethod::WorkloadIdentity {
                    client_id: client_id.to_string(),
                },
                None => {
                    r.issues.push(FieldIssue::new(
                        "AZURE_CLIENT_ID",
                        "is required when AZURE_AUTH=workload-identity",
                    ));
                    AuthMethod::AzureCli
                }
            },
            other => {
                r.issues.push(FieldIssue::new(
                    "AZURE_AUTH",
                    format!("'{other}' must be one of cli, managed-identity, workload-identity"),
                ));
                AuthMethod::AzureCli
            }
        };

        let arm_endpoint = r
            .or_default("ARM_ENDPOINT", DEFAULT_ARM_ENDPOINT)
            .trim_end_matches('/')
            .to_string();
        if !(arm_endpoint.starts_with("https://") || arm_endpoint.starts_with("http://")) {
            r.issues.push(FieldIssue::new(
                "ARM_ENDPOINT",
                format!("'{arm_endpoint}' must be an http(s) URL"),
            ));
        }

        let credential_store_path = PathBuf::from(
            r.or_default("CREDENTIAL_STORE_PATH", DEFAULT_CREDENTIAL_STORE_PATH),
        );

        if !r.issues.is_empty() {
            return Err(ConfigError { issues: r.issues });
        }

        Ok(Self {
            subscription_id,
            resource_group,
            location,
            storage_account_prefix,
            datalake_account_prefix,
            sql_server_prefix,
            data_factory_prefix,
            name_suffix,
            storage_sku,
            sql_admin_login,
            sql_database_name,
            sql_database_sku,
            firewall_rules,
            master_data_container,
            datalake_containers,
            auth,
            arm_endpoint,
            credential_store_path,
        })
    }

    /// Load from the process environment only
    ///
    /// # Errors
    /// Returns a `ConfigError` listing every missing or invalid field
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ConfigSource::from_env())
    }
}
