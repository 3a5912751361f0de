//! ARM resource provider namespaces and their pinned API versions

/// Resource provider namespace an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Subscription-level calls (`/subscriptions/{id}`)
    Subscriptions,
    /// `Microsoft.Resources` (resource groups)
    Resources,
    /// `Microsoft.Storage`
    Storage,
    /// `Microsoft.Sql`
    Sql,
    /// `Microsoft.DataFactory`
    DataFactory,
}

impl Namespace {
    /// API version sent with every request in this namespace
    #[must_use]
    pub fn api_version(self) -> &'static str {
        match self {
            Namespace::Subscriptions => "2022-12-01",
            Namespace::Resources => "2022-09-01",
            Namespace::Storage => "2023-01-01",
            Namespace::Sql => "2021-11-01",
            Namespace::DataFactory => "2018-06-01",
        }
    }
}
