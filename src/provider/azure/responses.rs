// ============================================================================
// Azure Resource Manager Response Structures
// ============================================================================
// Only the fields the provisioner reads are modelled; everything else in
// the ARM payloads is ignored.
// https://learn.microsoft.com/en-us/rest/api/azure/
// ============================================================================

use serde::Deserialize;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ArmErrorResponse {
    pub error: ArmErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArmErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Body of an `Azure-AsyncOperation` status URL
#[derive(Debug, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<ArmErrorDetail>,
}

/// Generic resource body; only `properties` is read
#[derive(Debug, Default, Deserialize)]
pub struct ResourceEnvelope {
    #[serde(default)]
    pub properties: ResourceProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    /// SQL servers
    #[serde(default)]
    pub fully_qualified_domain_name: Option<String>,
    /// Storage accounts
    #[serde(default)]
    pub primary_endpoints: Option<PrimaryEndpoints>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrimaryEndpoints {
    #[serde(default)]
    pub blob: Option<String>,
}

/// `POST .../listKeys`
#[derive(Deserialize)]
pub struct StorageAccountKeys {
    #[serde(default)]
    pub keys: Vec<StorageAccountKey>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountKey {
    #[serde(default)]
    pub key_name: String,
    pub value: String,
}

impl std::fmt::Debug for StorageAccountKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.keys.iter().map(|k| k.key_name.as_str()).collect();
        f.debug_struct("StorageAccountKeys")
            .field("keys", &names)
            .finish()
    }
}

/// Storage and Data Factory answer `nameAvailable`, SQL answers `available`
#[derive(Debug, Deserialize)]
pub struct NameAvailability {
    #[serde(rename = "nameAvailable", alias = "available")]
    pub name_available: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Terminal ARM provisioning states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Succeeded,
    Failed,
    Canceled,
}

/// `None` while the operation is still running
#[must_use]
pub fn terminal_state(state: &str) -> Option<TerminalState> {
    match state.to_ascii_lowercase().as_str() {
        "succeeded" => Some(TerminalState::Succeeded),
        "failed" => Some(TerminalState::Failed),
        "canceled" | "cancelled" => Some(TerminalState::Canceled),
        _ => None,
    }
}
