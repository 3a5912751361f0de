//! Azure Resource Manager API Paths
//!
//! Resource ids for every resource kind the provisioner manages. These
//! follow the ARM REST reference: https://learn.microsoft.com/en-us/rest/api/resources/
//!
//! All functions return resource ids without the `api-version` query;
//! `PathBuilder` appends it for request paths.

/// Subscription scoped paths
pub mod subscriptions {
    /// GET /subscriptions/{subscription}
    pub fn subscription(subscription: &str) -> String {
        format!("/subscriptions/{subscription}")
    }
}

/// Microsoft.Resources paths
pub mod resources {
    /// GET | PUT /subscriptions/{subscription}/resourcegroups/{rg}
    pub fn resource_group(subscription: &str, resource_group: &str) -> String {
        format!("/subscriptions/{subscription}/resourcegroups/{resource_group}")
    }
}

/// Microsoft.Storage paths
pub mod storage {
    /// GET | PUT storage account
    pub fn storage_account(subscription: &str, resource_group: &str, account: &str) -> String {
        format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.Storage/storageAccounts/{account}"
        )
    }

    /// POST .../storageAccounts/{account}/listKeys
    pub fn list_keys(subscription: &str, resource_group: &str, account: &str) -> String {
        format!(
            "{}/listKeys",
            storage_account(subscription, resource_group, account)
        )
    }

    /// GET | PUT .../storageAccounts/{account}/blobServices/default/containers/{container}
    pub fn blob_container(
        subscription: &str,
        resource_group: &str,
        account: &str,
        container: &str,
    ) -> String {
        format!(
            "{}/blobServices/default/containers/{container}",
            storage_account(subscription, resource_group, account)
        )
    }

    /// POST /subscriptions/{subscription}/providers/Microsoft.Storage/checkNameAvailability
    pub fn check_name_availability(subscription: &str) -> String {
        format!("/subscriptions/{subscription}/providers/Microsoft.Storage/checkNameAvailability")
    }
}

/// Microsoft.Sql paths
pub mod sql {
    /// GET | PUT logical SQL server
    pub fn server(subscription: &str, resource_group: &str, server: &str) -> String {
        format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.Sql/servers/{server}"
        )
    }

    /// GET | PUT .../servers/{server}/firewallRules/{rule}
    pub fn firewall_rule(
        subscription: &str,
        resource_group: &str,
        server_name: &str,
        rule: &str,
    ) -> String {
        format!(
            "{}/firewallRules/{rule}",
            server(subscription, resource_group, server_name)
        )
    }

    /// GET | PUT .../servers/{server}/databases/{database}
    pub fn database(
        subscription: &str,
        resource_group: &str,
        server_name: &str,
        database: &str,
    ) -> String {
        format!(
            "{}/databases/{database}",
            server(subscription, resource_group, server_name)
        )
    }

    /// POST /subscriptions/{subscription}/providers/Microsoft.Sql/checkNameAvailability
    pub fn check_name_availability(subscription: &str) -> String {
        format!("/subscriptions/{subscription}/providers/Microsoft.Sql/checkNameAvailability")
    }
}

/// Microsoft.DataFactory paths
pub mod data_factory {
    /// GET | PUT factory
    pub fn factory(subscription: &str, resource_group: &str, factory: &str) -> String {
        format!(
            "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.DataFactory/factories/{factory}"
        )
    }

    /// POST .../locations/{location}/checkFactoryNameAvailability
    pub fn check_name_availability(subscription: &str, location: &str) -> String {
        format!(
            "/subscriptions/{subscription}/providers/Microsoft.DataFactory/locations/{location}/checkFactoryNameAvailability"
        )
    }
}
