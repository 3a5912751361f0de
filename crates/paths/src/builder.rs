//! PathBuilder implementation
//!
//! Provides a type-safe builder pattern for constructing ARM request paths.

use crate::arm;
use crate::errors::PathBuilderError;
use crate::formats::PathFormat;
use crate::operations::ArmOperation;

/// Builder for constructing ARM paths with type safety
///
/// # Example
///
/// ```rust
/// use sca_paths::prelude::*;
///
/// let path = PathBuilder::new()
///     .operation(ArmOperation::CreateResourceGroup)
///     .subscription("sub")
///     .resource_group("sca-rg-dev")
///     .build(PathFormat::ResourceId)
///     .unwrap();
/// assert_eq!(path, "/subscriptions/sub/resourcegroups/sca-rg-dev");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    operation: Option<ArmOperation>,

    subscription: Option<String>,
    resource_group: Option<String>,
    location: Option<String>,

    // Resource name (account, server, factory)
    name: Option<String>,
    // Child resource name (container, firewall rule, database)
    child: Option<String>,
}

impl PathBuilder {
    /// Create a new PathBuilder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: ArmOperation) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscription = Some(subscription.into());
        self
    }

    pub fn resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = Some(resource_group.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn child(mut self, child: impl Into<String>) -> Self {
        self.child = Some(child.into());
        self
    }

    // Build methods
    pub fn build_resource_id(&self) -> Result<String, PathBuilderError> {
        self.build(PathFormat::ResourceId)
    }

    pub fn build_http_path(&self) -> Result<String, PathBuilderError> {
        self.build(PathFormat::HttpPath)
    }

    /// Generic build with format
    pub fn build(&self, format: PathFormat) -> Result<String, PathBuilderError> {
        let op = self
            .operation
            .ok_or_else(|| PathBuilderError::MissingRequiredParameter("operation".to_string()))?;
        let path = self.build_arm_path(op)?;

        match format {
            PathFormat::ResourceId => Ok(path),
            PathFormat::HttpPath => Ok(format!(
                "{path}?api-version={}",
                op.namespace().api_version()
            )),
        }
    }

    fn build_arm_path(&self, op: ArmOperation) -> Result<String, PathBuilderError> {
        let subscription = required("subscription", self.subscription.as_deref())?;

        match op {
            ArmOperation::GetSubscription => Ok(arm::subscriptions::subscription(subscription)),
            ArmOperation::GetResourceGroup | ArmOperation::CreateResourceGroup => {
                let rg = required("resource_group", self.resource_group.as_deref())?;
                Ok(arm::resources::resource_group(subscription, rg))
            }
            ArmOperation::GetStorageAccount | ArmOperation::CreateStorageAccount => {
                let rg = required("resource_group", self.resource_group.as_deref())?;
                let name = required("name", self.name.as_deref())?;
                Ok(arm::storage::storage_account(subscription, rg, name))
            }
            ArmOperation::ListStorageAccountKeys => {
                let rg = required("resource_group", self.resource_group.as_deref())?;
                let name = required("name", self.name.as_deref())?;
                Ok(arm::storage::list_keys(subscription, rg, name))
            }
            ArmOperation::GetBlobContainer | ArmOperation::CreateBlobContainer => {
                let rg = required("resource_group", self.resource_group.as_deref())?;
                let name = required("name", self.name.as_deref())?;
                let container = required("child", self.child.as_deref())?;
                Ok(arm::storage::blob_container(subscription, rg, name, container))
            }
            ArmOperation::CheckStorageNameAvailability => {
                Ok(arm::storage::check_name_availability(subscription))
            }
            ArmOperation::GetSqlServer | ArmOperation::CreateSqlServer => {
                let rg = required("resource_group", self.resource_group.as_deref())?;
                let name = required("name", self.name.as_deref())?;
                Ok(arm::sql::server(subscription, rg, name))
            }
            ArmOperation::GetFirewallRule | ArmOperation::CreateFirewallRule => {
                let rg = required("resource_group", self.resource_group.as_deref())?;
                let name = required("name", self.name.as_deref())?;
                let rule = required("child", self.child.as_deref())?;
                Ok(arm::sql::firewall_rule(subscription, rg, name, rule))
            }
            ArmOperation::GetSqlDatabase | ArmOperation::CreateSqlDatabase => {
                let rg = required("resource_group", self.resource_group.as_deref())?;
                let name = required("name", self.name.as_deref())?;
                let database = required("child", self.child.as_deref())?;
                Ok(arm::sql::database(subscription, rg, name, database))
            }
            ArmOperation::CheckSqlServerNameAvailability => {
                Ok(arm::sql::check_name_availability(subscription))
            }
            ArmOperation::GetDataFactory | ArmOperation::CreateDataFactory => {
                let rg = required("resource_group", self.resource_group.as_deref())?;
                let name = required("name", self.name.as_deref())?;
                Ok(arm::data_factory::factory(subscription, rg, name))
            }
            ArmOperation::CheckDataFactoryNameAvailability => {
                let location = required("location", self.location.as_deref())?;
                Ok(arm::data_factory::check_name_availability(
                    subscription,
                    location,
                ))
            }
        }
    }
}

// Path segments are interpolated verbatim, so reject anything that could
// escape the segment or start a query string.
fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, PathBuilderError> {
    let value =
        value.ok_or_else(|| PathBuilderError::MissingRequiredParameter(name.to_string()))?;
    if value.is_empty() || value.contains(['/', '?', '#', '&']) {
        return Err(PathBuilderError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}
