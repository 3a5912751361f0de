//! Operation type definitions for PathBuilder

use crate::namespace::Namespace;

/// ARM operations issued by the provisioner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmOperation {
    // Subscription
    GetSubscription,

    // Resource groups
    GetResourceGroup,
    CreateResourceGroup,

    // Storage accounts (flat and hierarchical namespace share these)
    GetStorageAccount,
    CreateStorageAccount,
    ListStorageAccountKeys,
    CheckStorageNameAvailability,
    GetBlobContainer,
    CreateBlobContainer,

    // SQL
    GetSqlServer,
    CreateSqlServer,
    CheckSqlServerNameAvailability,
    GetFirewallRule,
    CreateFirewallRule,
    GetSqlDatabase,
    CreateSqlDatabase,

    // Data Factory
    GetDataFactory,
    CreateDataFactory,
    CheckDataFactoryNameAvailability,
}

impl ArmOperation {
    /// Namespace (and therefore API version) of this operation
    #[must_use]
    pub fn namespace(self) -> Namespace {
        match self {
            ArmOperation::GetSubscription => Namespace::Subscriptions,
            ArmOperation::GetResourceGroup | ArmOperation::CreateResourceGroup => {
                Namespace::Resources
            }
            ArmOperation::GetStorageAccount
            | ArmOperation::CreateStorageAccount
            | ArmOperation::ListStorageAccountKeys
            | ArmOperation::CheckStorageNameAvailability
            | ArmOperation::GetBlobContainer
            | ArmOperation::CreateBlobContainer => Namespace::Storage,
            ArmOperation::GetSqlServer
            | ArmOperation::CreateSqlServer
            | ArmOperation::CheckSqlServerNameAvailability
            | ArmOperation::GetFirewallRule
            | ArmOperation::CreateFirewallRule
            | ArmOperation::GetSqlDatabase
            | ArmOperation::CreateSqlDatabase => Namespace::Sql,
            ArmOperation::GetDataFactory
            | ArmOperation::CreateDataFactory
            | ArmOperation::CheckDataFactoryNameAvailability => Namespace::DataFactory,
        }
    }
}
