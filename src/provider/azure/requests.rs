// ============================================================================
// Azure Resource Manager Request Structures
// ============================================================================
// PUT/POST bodies for the resources the provisioner creates. Field names
// follow the ARM REST reference for each namespace's api-version.
// ============================================================================

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ResourceGroupRequest<'a> {
    pub location: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Sku<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

/// Storage account (StorageV2); data lake accounts set `is_hns_enabled`
#[derive(Debug, Serialize)]
pub struct StorageAccountRequest<'a> {
    pub location: &'a str,
    pub kind: &'static str,
    pub sku: Sku<'a>,
    pub properties: StorageAccountProperties,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    pub supports_https_traffic_only: bool,
    pub minimum_tls_version: &'static str,
    pub allow_blob_public_access: bool,
    pub is_hns_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct BlobContainerRequest {
    pub properties: BlobContainerProperties,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobContainerProperties {
    pub public_access: &'static str,
}

#[derive(Serialize)]
pub struct SqlServerRequest<'a> {
    pub location: &'a str,
    pub properties: SqlServerProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlServerProperties<'a> {
    pub administrator_login: &'a str,
    pub administrator_login_password: &'a str,
    pub version: &'a str,
    pub minimal_tls_version: &'static str,
}

// Carries the admin password
impl std::fmt::Debug for SqlServerRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerRequest")
            .field("location", &self.location)
            .field("administrator_login", &self.properties.administrator_login)
            .field("version", &self.properties.version)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub struct FirewallRuleRequest {
    pub properties: FirewallRuleProperties,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRuleProperties {
    pub start_ip_address: String,
    pub end_ip_address: String,
}

#[derive(Debug, Serialize)]
pub struct SqlDatabaseRequest<'a> {
    pub location: &'a str,
    pub sku: Sku<'a>,
}

#[derive(Debug, Serialize)]
pub struct DataFactoryRequest<'a> {
    pub location: &'a str,
    pub identity: Identity,
}

#[derive(Debug, Serialize)]
pub struct Identity {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct NameAvailabilityRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub resource_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_storage_account_body() {
        let body = StorageAccountRequest {
            location: "westus2",
            kind: "StorageV2",
            sku: Sku {
                name: "Standard_LRS",
                tier: None,
                capacity: None,
            },
            properties: StorageAccountProperties {
                supports_https_traffic_only: true,
                minimum_tls_version: "TLS1_2",
                allow_blob_public_access: false,
                is_hns_enabled: true,
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "location": "westus2",
                "kind": "StorageV2",
                "sku": {"name": "Standard_LRS"},
                "properties": {
                    "supportsHttpsTrafficOnly": true,
                    "minimumTlsVersion": "TLS1_2",
                    "allowBlobPublicAccess": false,
                    "isHnsEnabled": true
                }
            })
        );
    }

    #[test]
    fn test_sql_server_debug_hides_password() {
        let body = SqlServerRequest {
            location: "westus2",
            properties: SqlServerProperties {
                administrator_login: "sqladmin",
                administrator_login_password: "Sup3r-Secret",
                version: "12.0",
                minimal_tls_version: "1.2",
            },
        };
        let rendered = format!("{body:?}");
        assert!(rendered.contains("sqladmin"));
        assert!(!rendered.contains("Sup3r"));
        assert_eq!(
            serde_json::to_value(&body).unwrap()["properties"]["administratorLoginPassword"],
            "Sup3r-Secret"
        );
    }
}
