//! Normalization and validation of raw infrastructure input.

use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::models::{InfrastructureRequest, ProviderInfraSpec, RawInfrastructure, RawProviderSpec, ResourceCounts};
use crate::provider::{CloudProvider, DatabaseEngine};

/// Upper bound for any single resource count.
pub const MAX_RESOURCE_COUNT: u32 = 100;

/// Counts used when a raw entry omits a field.
pub const DEFAULT_COUNTS: ResourceCounts = ResourceCounts {
    servers: 0,
    databases: 0,
    networks: 1,
    load_balancers: 0,
    security_groups: 1,
};

/// Turns untrusted input into normalized [`ProviderInfraSpec`]s.
pub struct SpecNormalizer;

impl SpecNormalizer {
    /// Validate and normalize a full request.
    pub fn normalize(raw: &RawInfrastructure) -> ModelResult<InfrastructureRequest> {
        if raw.providers.is_empty() {
            return Err(ModelError::EmptyRequest);
        }

        let specs = raw
            .providers
            .iter()
            .enumerate()
            .map(|(index, entry)| Self::normalize_entry(index, entry))
            .collect::<ModelResult<Vec<_>>>()?;

        InfrastructureRequest::new(specs)
    }

    /// Validate and normalize one provider entry.
    pub fn normalize_entry(index: usize, entry: &RawProviderSpec) -> ModelResult<ProviderInfraSpec> {
        let provider = entry
            .provider
            .as_deref()
            .map(CloudProvider::parse_lenient)
            .unwrap_or_default();

        let engine = entry
            .database_type
            .as_deref()
            .map(DatabaseEngine::parse_lenient)
            .unwrap_or_default();

        let counts = ResourceCounts {
            servers: Self::check_count(index, "servers", entry.servers, DEFAULT_COUNTS.servers)?,
            databases: Self::check_count(index, "databases", entry.databases, DEFAULT_COUNTS.databases)?,
            networks: Self::check_count(index, "networks", entry.networks, DEFAULT_COUNTS.networks)?,
            load_balancers: Self::check_count(
                index,
                "load_balancers",
                entry.load_balancers,
                DEFAULT_COUNTS.load_balancers,
            )?,
            security_groups: Self::check_count(
                index,
                "security_groups",
                entry.security_groups,
                DEFAULT_COUNTS.security_groups,
            )?,
        };

        Self::normalize_counts(index, provider, counts, engine)
    }

    /// Enforce range limits and the network-dependency invariant.
    pub fn normalize_counts(
        index: usize,
        provider: CloudProvider,
        mut counts: ResourceCounts,
        engine: DatabaseEngine,
    ) -> ModelResult<ProviderInfraSpec> {
        for (field, value) in [
            ("servers", counts.servers),
            ("databases", counts.databases),
            ("networks", counts.networks),
            ("load_balancers", counts.load_balancers),
            ("security_groups", counts.security_groups),
        ] {
            if value > MAX_RESOURCE_COUNT {
                return Err(ModelError::CountOutOfRange {
                    index,
                    field,
                    value: value.into(),
                    max: MAX_RESOURCE_COUNT,
                });
            }
        }

        let needs_isolation = counts.servers > 0 || counts.databases > 0 || counts.load_balancers > 0;
        if needs_isolation {
            if counts.networks == 0 {
                debug!("Provider entry {} ({}): raising networks from 0 to 1", index, provider);
                counts.networks = 1;
            }
            if counts.security_groups == 0 {
                debug!("Provider entry {} ({}): raising security_groups from 0 to 1", index, provider);
                counts.security_groups = 1;
            }
        }

        Ok(ProviderInfraSpec::from_normalized(counts, provider, engine))
    }

    fn check_count(index: usize, field: &'static str, value: Option<i64>, default: u32) -> ModelResult<u32> {
        match value {
            None => Ok(default),
            Some(v) if v < 0 => Err(ModelError::NegativeCount { index, field, value: v }),
            Some(v) => u32::try_from(v)
                .ok()
                .filter(|n| *n <= MAX_RESOURCE_COUNT)
                .ok_or(ModelError::CountOutOfRange {
                    index,
                    field,
                    value: v,
                    max: MAX_RESOURCE_COUNT,
                }),
        }
    }
}
