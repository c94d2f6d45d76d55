//! Infrastructure request models.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::provider::{CloudProvider, DatabaseEngine, ResourceKind};
use crate::validator::SpecNormalizer;

/// Normalized configuration for one cloud target.
///
/// Instances only come out of [`SpecNormalizer`], so the network-dependency
/// invariant always holds: any compute, data or load-balancing resource implies
/// at least one network and one security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProviderInfraSpec {
    provider: CloudProvider,
    servers: u32,
    databases: u32,
    networks: u32,
    load_balancers: u32,
    security_groups: u32,
    database_type: DatabaseEngine,
}

impl ProviderInfraSpec {
    /// Start building a spec for the given provider. All counts default to zero.
    pub fn builder(provider: CloudProvider) -> ProviderInfraSpecBuilder {
        ProviderInfraSpecBuilder::new(provider)
    }

    /// The conservative spec used when extraction fails: one AWS server.
    pub fn fallback_default() -> Self {
        Self {
            provider: CloudProvider::Aws,
            servers: 1,
            databases: 0,
            networks: 1,
            load_balancers: 0,
            security_groups: 1,
            database_type: DatabaseEngine::MySql,
        }
    }

    pub(crate) fn from_normalized(counts: ResourceCounts, provider: CloudProvider, engine: DatabaseEngine) -> Self {
        Self {
            provider,
            servers: counts.servers,
            databases: counts.databases,
            networks: counts.networks,
            load_balancers: counts.load_balancers,
            security_groups: counts.security_groups,
            database_type: engine,
        }
    }

    pub fn provider(&self) -> CloudProvider {
        self.provider
    }

    pub fn servers(&self) -> u32 {
        self.servers
    }

    pub fn databases(&self) -> u32 {
        self.databases
    }

    pub fn networks(&self) -> u32 {
        self.networks
    }

    pub fn load_balancers(&self) -> u32 {
        self.load_balancers
    }

    pub fn security_groups(&self) -> u32 {
        self.security_groups
    }

    pub fn database_type(&self) -> DatabaseEngine {
        self.database_type
    }

    /// Requested number of resources of the given kind.
    pub fn count(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Network => self.networks,
            ResourceKind::SecurityBoundary => self.security_groups,
            ResourceKind::Compute => self.servers,
            ResourceKind::LoadBalancer => self.load_balancers,
            ResourceKind::Database => self.databases,
        }
    }

    /// Convert back to the untrusted wire form.
    pub fn to_raw(&self) -> RawProviderSpec {
        RawProviderSpec {
            provider: Some(self.provider.as_str().to_string()),
            servers: Some(self.servers.into()),
            databases: Some(self.databases.into()),
            networks: Some(self.networks.into()),
            load_balancers: Some(self.load_balancers.into()),
            security_groups: Some(self.security_groups.into()),
            database_type: Some(self.database_type.as_str().to_string()),
        }
    }
}

/// Resource counts prior to normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub servers: u32,
    pub databases: u32,
    pub networks: u32,
    pub load_balancers: u32,
    pub security_groups: u32,
}

/// Builder for [`ProviderInfraSpec`]; `build` runs normalization.
#[derive(Debug, Clone)]
pub struct ProviderInfraSpecBuilder {
    provider: CloudProvider,
    counts: ResourceCounts,
    database_type: DatabaseEngine,
}

impl ProviderInfraSpecBuilder {
    fn new(provider: CloudProvider) -> Self {
        Self {
            provider,
            counts: ResourceCounts::default(),
            database_type: DatabaseEngine::default(),
        }
    }

    pub fn servers(mut self, n: u32) -> Self {
        self.counts.servers = n;
        self
    }

    pub fn databases(mut self, n: u32) -> Self {
        self.counts.databases = n;
        self
    }

    pub fn networks(mut self, n: u32) -> Self {
        self.counts.networks = n;
        self
    }

    pub fn load_balancers(mut self, n: u32) -> Self {
        self.counts.load_balancers = n;
        self
    }

    pub fn security_groups(mut self, n: u32) -> Self {
        self.counts.security_groups = n;
        self
    }

    pub fn database_type(mut self, engine: DatabaseEngine) -> Self {
        self.database_type = engine;
        self
    }

    pub fn build(self) -> ModelResult<ProviderInfraSpec> {
        SpecNormalizer::normalize_counts(0, self.provider, self.counts, self.database_type)
    }
}

/// Ordered, non-empty list of provider configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfrastructureRequest {
    providers: Vec<ProviderInfraSpec>,
}

impl InfrastructureRequest {
    pub fn new(providers: Vec<ProviderInfraSpec>) -> ModelResult<Self> {
        if providers.is_empty() {
            return Err(ModelError::EmptyRequest);
        }
        Ok(Self { providers })
    }

    pub fn single(spec: ProviderInfraSpec) -> Self {
        Self { providers: vec![spec] }
    }

    /// Minimal single-server AWS request used when extraction fails.
    pub fn fallback_default() -> Self {
        Self::single(ProviderInfraSpec::fallback_default())
    }

    /// Validate and normalize untrusted input.
    pub fn from_raw(raw: &RawInfrastructure) -> ModelResult<Self> {
        SpecNormalizer::normalize(raw)
    }

    pub fn providers(&self) -> &[ProviderInfraSpec] {
        &self.providers
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderInfraSpec> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Never true for a constructed request.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn is_multi_provider(&self) -> bool {
        self.providers.len() > 1
    }

    pub fn to_raw(&self) -> RawInfrastructure {
        RawInfrastructure {
            providers: self.providers.iter().map(ProviderInfraSpec::to_raw).collect(),
        }
    }
}

/// Untrusted provider entry as produced by extraction or supplied by a caller.
///
/// Counts are signed so that negative input can be rejected instead of wrapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProviderSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub databases: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networks: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_type: Option<String>,
}

impl RawProviderSpec {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            ..Default::default()
        }
    }

    pub fn with_servers(mut self, n: i64) -> Self {
        self.servers = Some(n);
        self
    }

    pub fn with_databases(mut self, n: i64) -> Self {
        self.databases = Some(n);
        self
    }

    pub fn with_networks(mut self, n: i64) -> Self {
        self.networks = Some(n);
        self
    }

    pub fn with_load_balancers(mut self, n: i64) -> Self {
        self.load_balancers = Some(n);
        self
    }

    pub fn with_security_groups(mut self, n: i64) -> Self {
        self.security_groups = Some(n);
        self
    }

    pub fn with_database_type(mut self, engine: impl Into<String>) -> Self {
        self.database_type = Some(engine.into());
        self
    }
}

/// Untrusted infrastructure description.
///
/// Accepts either `{"providers": [...]}` or a single flat provider object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawInfrastructureRepr")]
pub struct RawInfrastructure {
    pub providers: Vec<RawProviderSpec>,
}

impl RawInfrastructure {
    pub fn new(providers: Vec<RawProviderSpec>) -> Self {
        Self { providers }
    }

    pub fn single(spec: RawProviderSpec) -> Self {
        Self { providers: vec![spec] }
    }

    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInfrastructureRepr {
    Multi { providers: Vec<RawProviderSpec> },
    Single(RawProviderSpec),
}

impl From<RawInfrastructureRepr> for RawInfrastructure {
    fn from(repr: RawInfrastructureRepr) -> Self {
        match repr {
            RawInfrastructureRepr::Multi { providers } => Self { providers },
            RawInfrastructureRepr::Single(spec) => Self::single(spec),
        }
    }
}
