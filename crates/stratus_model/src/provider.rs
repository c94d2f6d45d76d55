//! Cloud provider, database engine and resource kind definitions.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Supported cloud providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
    OpenStack,
}

impl Default for CloudProvider {
    fn default() -> Self {
        Self::Aws
    }
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Gcp => "gcp",
            CloudProvider::OpenStack => "openstack",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "aws" | "amazon" => Some(CloudProvider::Aws),
            "azure" | "azurerm" => Some(CloudProvider::Azure),
            "gcp" | "google" => Some(CloudProvider::Gcp),
            "openstack" => Some(CloudProvider::OpenStack),
            _ => None,
        }
    }

    /// Parse a provider name, falling back to AWS for anything unrecognized.
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            warn!("Unrecognized provider '{}', falling back to aws", s);
            CloudProvider::Aws
        })
    }

    /// Providers in detection order.
    pub fn all() -> Vec<Self> {
        vec![
            CloudProvider::Aws,
            CloudProvider::Azure,
            CloudProvider::Gcp,
            CloudProvider::OpenStack,
        ]
    }

    /// Human-readable name used in section headers and reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Azure => "Azure",
            CloudProvider::Gcp => "GCP",
            CloudProvider::OpenStack => "OpenStack",
        }
    }

    /// Get the Terraform provider name.
    pub fn provider_name(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azurerm",
            CloudProvider::Gcp => "google",
            CloudProvider::OpenStack => "openstack",
        }
    }

    /// Registry source of the Terraform provider.
    pub fn provider_source(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "hashicorp/aws",
            CloudProvider::Azure => "hashicorp/azurerm",
            CloudProvider::Gcp => "hashicorp/google",
            CloudProvider::OpenStack => "terraform-provider-openstack/openstack",
        }
    }

    /// Substrings whose presence in Terraform text identifies this provider.
    pub fn declaration_markers(&self) -> [String; 2] {
        [
            format!("provider \"{}\"", self.provider_name()),
            self.provider_source().to_string(),
        ]
    }

    /// Terraform resource types that represent one resource of the given kind.
    pub fn resource_types(&self, kind: ResourceKind) -> &'static [&'static str] {
        use ResourceKind::*;
        match (self, kind) {
            (CloudProvider::Aws, Network) => &["aws_vpc"],
            (CloudProvider::Aws, SecurityBoundary) => &["aws_security_group"],
            (CloudProvider::Aws, Compute) => &["aws_instance"],
            (CloudProvider::Aws, LoadBalancer) => &["aws_lb"],
            (CloudProvider::Aws, Database) => &["aws_db_instance"],

            (CloudProvider::Azure, Network) => &["azurerm_virtual_network"],
            (CloudProvider::Azure, SecurityBoundary) => &["azurerm_network_security_group"],
            (CloudProvider::Azure, Compute) => &["azurerm_linux_virtual_machine"],
            (CloudProvider::Azure, LoadBalancer) => &["azurerm_lb"],
            (CloudProvider::Azure, Database) => &[
                "azurerm_mysql_server",
                "azurerm_postgresql_server",
                "azurerm_mariadb_server",
            ],

            (CloudProvider::Gcp, Network) => &["google_compute_network"],
            (CloudProvider::Gcp, SecurityBoundary) => &["google_compute_firewall"],
            (CloudProvider::Gcp, Compute) => &["google_compute_instance"],
            (CloudProvider::Gcp, LoadBalancer) => &["google_compute_url_map"],
            (CloudProvider::Gcp, Database) => &["google_sql_database_instance"],

            (CloudProvider::OpenStack, Network) => &["openstack_networking_network_v2"],
            (CloudProvider::OpenStack, SecurityBoundary) => &["openstack_networking_secgroup_v2"],
            (CloudProvider::OpenStack, Compute) => &["openstack_compute_instance_v2"],
            (CloudProvider::OpenStack, LoadBalancer) => &["openstack_lb_loadbalancer_v2"],
            (CloudProvider::OpenStack, Database) => &["openstack_db_instance_v1"],
        }
    }

    /// Classify a Terraform resource type for this provider.
    pub fn classify(&self, resource_type: &str) -> Option<ResourceKind> {
        ResourceKind::all()
            .into_iter()
            .find(|kind| self.resource_types(*kind).contains(&resource_type))
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Managed database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    MySql,
    PostgreSql,
    MariaDb,
    MongoDb,
}

impl Default for DatabaseEngine {
    fn default() -> Self {
        Self::MySql
    }
}

impl DatabaseEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::MySql => "mysql",
            DatabaseEngine::PostgreSql => "postgresql",
            DatabaseEngine::MariaDb => "mariadb",
            DatabaseEngine::MongoDb => "mongodb",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Some(DatabaseEngine::MySql),
            "postgresql" | "postgres" => Some(DatabaseEngine::PostgreSql),
            "mariadb" => Some(DatabaseEngine::MariaDb),
            "mongodb" | "mongo" => Some(DatabaseEngine::MongoDb),
            _ => None,
        }
    }

    /// Parse an engine name, falling back to MySQL for anything unrecognized.
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            warn!("Unrecognized database type '{}', falling back to mysql", s);
            DatabaseEngine::MySql
        })
    }

    pub fn all() -> Vec<Self> {
        vec![
            DatabaseEngine::MySql,
            DatabaseEngine::PostgreSql,
            DatabaseEngine::MariaDb,
            DatabaseEngine::MongoDb,
        ]
    }

    /// Default listening port.
    pub fn port(&self) -> u16 {
        match self {
            DatabaseEngine::MySql | DatabaseEngine::MariaDb => 3306,
            DatabaseEngine::PostgreSql => 5432,
            DatabaseEngine::MongoDb => 27017,
        }
    }
}

impl std::fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of resources the generator emits and the validator inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    SecurityBoundary,
    Compute,
    LoadBalancer,
    Database,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::SecurityBoundary => "security_boundary",
            ResourceKind::Compute => "compute",
            ResourceKind::LoadBalancer => "load_balancer",
            ResourceKind::Database => "database",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            ResourceKind::Network,
            ResourceKind::SecurityBoundary,
            ResourceKind::Compute,
            ResourceKind::LoadBalancer,
            ResourceKind::Database,
        ]
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_lenient_fallback() {
        assert_eq!(CloudProvider::parse_lenient("GCP"), CloudProvider::Gcp);
        assert_eq!(CloudProvider::parse_lenient("openstack"), CloudProvider::OpenStack);
        assert_eq!(CloudProvider::parse_lenient("digitalocean"), CloudProvider::Aws);
        assert_eq!(CloudProvider::parse_lenient(""), CloudProvider::Aws);
    }

    #[test]
    fn test_provider_serde_names() {
        let json = serde_json::to_string(&CloudProvider::OpenStack).unwrap();
        assert_eq!(json, "\"openstack\"");
        let parsed: CloudProvider = serde_json::from_str("\"azure\"").unwrap();
        assert_eq!(parsed, CloudProvider::Azure);
    }

    #[test]
    fn test_classify_resource_types() {
        assert_eq!(CloudProvider::Aws.classify("aws_db_instance"), Some(ResourceKind::Database));
        assert_eq!(
            CloudProvider::Azure.classify("azurerm_postgresql_server"),
            Some(ResourceKind::Database)
        );
        assert_eq!(CloudProvider::Gcp.classify("google_compute_firewall"), Some(ResourceKind::SecurityBoundary));
        assert_eq!(CloudProvider::Aws.classify("aws_subnet"), None);
        assert_eq!(CloudProvider::Aws.classify("google_compute_instance"), None);
    }

    #[test]
    fn test_database_engine_parsing() {
        assert_eq!(DatabaseEngine::parse_lenient("Postgres"), DatabaseEngine::PostgreSql);
        assert_eq!(DatabaseEngine::parse_lenient("oracle"), DatabaseEngine::MySql);
        assert_eq!(DatabaseEngine::MongoDb.port(), 27017);
    }
}
