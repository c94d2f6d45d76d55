//! Provider renderers.
//!
//! Each cloud gets one [`ProviderRenderer`] implementation with a method per
//! resource capability. The generator walks the provider spec and asks the renderer for
//! blocks; it never branches on the provider itself.

use stratus_model::{CloudProvider, DatabaseEngine, ProviderInfraSpec, ResourceKind};
use stratus_policy::{PolicyRegistry, SecureDefaults};

use crate::hcl::{HclBlock, HclValue};
use crate::providers::{AwsRenderer, AzureRenderer, GcpRenderer, OpenStackRenderer};

/// Sizing and placement defaults for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderProfile {
    pub region: &'static str,
    pub zone: Option<&'static str>,
    pub version_constraint: &'static str,
    pub instance_size: &'static str,
    pub database_size: &'static str,
    pub image: &'static str,
}

/// Everything a renderer needs beyond the resource index.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub spec: ProviderInfraSpec,
    pub compute_defaults: SecureDefaults,
    pub database_defaults: SecureDefaults,
}

impl RenderContext {
    pub fn new(spec: &ProviderInfraSpec, registry: &PolicyRegistry) -> Self {
        Self {
            spec: spec.clone(),
            compute_defaults: registry.secure_defaults_for(spec.provider(), ResourceKind::Compute),
            database_defaults: registry.secure_defaults_for(spec.provider(), ResourceKind::Database),
        }
    }

    pub fn has_network(&self) -> bool {
        self.spec.networks() > 0
    }
}

/// Renders Terraform blocks for one cloud provider.
pub trait ProviderRenderer: Send + Sync {
    fn provider(&self) -> CloudProvider;

    fn profile(&self) -> ProviderProfile;

    /// The `provider "<name>" { ... }` block.
    fn provider_block(&self) -> HclBlock;

    /// Shared resources every section needs, such as a resource group.
    fn foundation(&self, _ctx: &RenderContext) -> Vec<HclBlock> {
        Vec::new()
    }

    /// One isolated network with its private subnet.
    fn network(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock>;

    /// One least-privilege security boundary: HTTPS in, everything out.
    fn security_boundary(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock>;

    /// One compute instance attached to the first network and security boundary.
    fn compute(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock>;

    /// One load balancer group: balancer, listener, health check and backend pool.
    fn load_balancer(&self, index: u32, ctx: &RenderContext) -> Vec<HclBlock>;

    /// One managed database with every recommended database setting applied.
    fn database(&self, index: u32, engine: DatabaseEngine, ctx: &RenderContext) -> Vec<HclBlock>;

    /// Whether the managed database service can host the engine.
    fn supports_engine(&self, engine: DatabaseEngine) -> bool;

    /// Engine actually rendered; unsupported engines fall back to MySQL.
    fn effective_engine(&self, engine: DatabaseEngine) -> DatabaseEngine {
        if self.supports_engine(engine) {
            engine
        } else {
            tracing::warn!(
                "{} managed databases do not support {}; using {}",
                self.provider().display_name(),
                engine,
                DatabaseEngine::MySql
            );
            DatabaseEngine::MySql
        }
    }
}

static AWS: AwsRenderer = AwsRenderer;
static AZURE: AzureRenderer = AzureRenderer;
static GCP: GcpRenderer = GcpRenderer;
static OPENSTACK: OpenStackRenderer = OpenStackRenderer;

/// The renderer for a provider.
pub fn renderer_for(provider: CloudProvider) -> &'static dyn ProviderRenderer {
    match provider {
        CloudProvider::Aws => &AWS,
        CloudProvider::Azure => &AZURE,
        CloudProvider::Gcp => &GCP,
        CloudProvider::OpenStack => &OPENSTACK,
    }
}

/// Common tags for taggable resources.
pub(crate) fn tags(name: &str) -> HclValue {
    HclValue::map([("Name", name), ("ManagedBy", "stratus")])
}
