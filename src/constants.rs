//! # Constants
//!
//! Shared defaults for provisioning and uploading.
//!
//! Every value here can be overridden through the environment config or a
//! CLI flag where applicable.

/// Default Azure region
/// westus2 rather than eastus: SQL provisioning is restricted in eastus
pub const DEFAULT_LOCATION: &str = "westus2";

/// Default resource group name
pub const DEFAULT_RESOURCE_GROUP: &str = "sca-rg-dev";

/// Name prefixes for generated resource names
pub const DEFAULT_STORAGE_ACCOUNT_PREFIX: &str = "scasa";
pub const DEFAULT_DATALAKE_ACCOUNT_PREFIX: &str = "scadl";
pub const DEFAULT_SQL_SERVER_PREFIX: &str = "sca-sql-";
pub const DEFAULT_DATA_FACTORY_PREFIX: &str = "sca-adf-";

/// Length of a generated name suffix (hex characters)
pub const NAME_SUFFIX_LEN: usize = 8;

/// How many fresh suffixes are tried when a generated global name is taken
pub const MAX_NAME_ATTEMPTS: usize = 3;

/// Storage account names are globally unique, 3-24 lowercase alphanumerics
pub const STORAGE_ACCOUNT_NAME_MAX_LEN: usize = 24;

pub const DEFAULT_STORAGE_SKU: &str = "Standard_LRS";

pub const DEFAULT_SQL_ADMIN_LOGIN: &str = "sqladmin";
pub const DEFAULT_SQL_DATABASE_NAME: &str = "sca-dw";
pub const DEFAULT_SQL_DATABASE_SKU: &str = "Basic";
pub const DEFAULT_SQL_DATABASE_TIER: &str = "Basic";
pub const DEFAULT_SQL_DATABASE_CAPACITY: u32 = 5;
pub const SQL_SERVER_VERSION: &str = "12.0";

/// Firewall allow-list; 0.0.0.0-0.0.0.0 is Azure's "allow Azure services" rule
pub const DEFAULT_SQL_FIREWALL_ALLOW: &str = "AllowAzure:0.0.0.0-0.0.0.0";

/// Blob container holding master data
pub const DEFAULT_MASTER_DATA_CONTAINER: &str = "supply-chain-master-data";

/// Data lake stage containers
pub const DEFAULT_DATALAKE_CONTAINERS: &str = "raw,processed,output";

/// Azure Resource Manager endpoint; the token scope is derived from it
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// Default credential store location (excluded from version control)
pub const DEFAULT_CREDENTIAL_STORE_PATH: &str = "config/azure_resources.env";

/// Default environment config file
pub const DEFAULT_CONFIG_FILE: &str = ".env";

/// Poll interval for long-running ARM operations without a Retry-After header
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Give up on a long-running ARM operation after this long
pub const MAX_OPERATION_WAIT_SECS: u64 = 30 * 60;

/// Uploader defaults
pub const DEFAULT_DATA_ROOT: &str = "data/output/master_data";
pub const DATA_FILE_EXTENSION: &str = ".tsv.gz";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Environment variable holding the SQL admin password
pub const SQL_ADMIN_PASSWORD_ENV: &str = "SQL_ADMIN_PASSWORD";

/// Default tracing filter when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "sca_infra=info,sca_provision=info,sca_upload=info";
