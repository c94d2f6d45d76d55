//! The security policy registry.
//!
//! One table holds every policy together with its per-provider settings. The
//! generator reads recommended defaults from it and the validator evaluates the
//! same policies against the rendered code.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use stratus_model::{CloudProvider, ResourceKind};
use tracing::debug;

use crate::error::{PolicyError, PolicyResult};
use crate::policy::{PolicyCategory, PolicySetting, SecurityPolicy, SettingValue, Severity};
use crate::rules::NoHardcodedCredentials;

/// Ordered collection of security policies.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: Vec<SecurityPolicy>,
}

/// Merged recommended settings.
///
/// Keys keep the position of their first write and the value of their last,
/// so later policies override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecureDefaults {
    entries: Vec<(String, SettingValue)>,
}

impl SecureDefaults {
    pub fn insert(&mut self, key: impl Into<String>, value: SettingValue) -> Option<SettingValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, SettingValue> {
        self.entries.iter().cloned().collect()
    }
}

/// A setting key written by more than one policy for the same provider and kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingConflict {
    pub provider: CloudProvider,
    pub target: ResourceKind,
    pub key: String,
    /// Policies writing the key, in registry order. The last one wins.
    pub policies: Vec<String>,
}

impl SettingConflict {
    pub fn winner(&self) -> Option<&str> {
        self.policies.last().map(String::as_str)
    }
}

static SHARED: OnceLock<Arc<PolicyRegistry>> = OnceLock::new();

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registry, created once per process.
    pub fn shared() -> Arc<PolicyRegistry> {
        SHARED.get_or_init(|| Arc::new(Self::builtin())).clone()
    }

    /// Register a policy. Ids must be unique.
    pub fn register(&mut self, policy: SecurityPolicy) -> PolicyResult<()> {
        if self.get(&policy.id).is_some() {
            return Err(PolicyError::DuplicatePolicy(policy.id));
        }
        self.policies.push(policy);
        Ok(())
    }

    pub fn list_policies(&self) -> &[SecurityPolicy] {
        &self.policies
    }

    pub fn get(&self, id: &str) -> Option<&SecurityPolicy> {
        self.policies.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Recommended settings for a provider across all resource kinds.
    pub fn secure_defaults(&self, provider: CloudProvider) -> SecureDefaults {
        self.merge(provider, |_| true)
    }

    /// Recommended settings for one resource kind.
    pub fn secure_defaults_for(&self, provider: CloudProvider, kind: ResourceKind) -> SecureDefaults {
        self.merge(provider, |s| s.target == kind)
    }

    fn merge(&self, provider: CloudProvider, include: impl Fn(&PolicySetting) -> bool) -> SecureDefaults {
        let mut defaults = SecureDefaults::default();
        for policy in &self.policies {
            for setting in policy.settings_for(provider).filter(|s| include(s)) {
                if let Some(previous) = defaults.insert(setting.key.clone(), setting.value.clone()) {
                    debug!(
                        "Policy {} overrides {} for {} ({} -> {})",
                        policy.id, setting.key, provider, previous, setting.value
                    );
                }
            }
        }
        defaults
    }

    /// Keys written by more than one policy for the given provider.
    pub fn setting_conflicts(&self, provider: CloudProvider) -> Vec<SettingConflict> {
        let mut writers: Vec<SettingConflict> = Vec::new();
        for policy in &self.policies {
            for setting in policy.settings_for(provider) {
                match writers
                    .iter_mut()
                    .find(|c| c.target == setting.target && c.key == setting.key)
                {
                    Some(entry) => entry.policies.push(policy.id.clone()),
                    None => writers.push(SettingConflict {
                        provider,
                        target: setting.target,
                        key: setting.key.clone(),
                        policies: vec![policy.id.clone()],
                    }),
                }
            }
        }
        writers.retain(|c| c.policies.len() > 1);
        writers
    }

    /// The six built-in policies.
    pub fn builtin() -> Self {
        use CloudProvider::{Aws, Azure, Gcp, OpenStack};
        use ResourceKind::{Compute, Database};
        use SettingValue::{Bool, Int};

        let set = |provider, target, key: &str, value| PolicySetting::new(provider, target, key, value);
        let mut registry = Self::new();

        let policies = vec![
            SecurityPolicy::enforcing(
                "db_no_public_ip",
                "Database not publicly accessible",
                Severity::High,
                PolicyCategory::NetworkAccess,
                vec![
                    set(Aws, Database, "publicly_accessible", Bool(false)),
                    set(Azure, Database, "public_network_access_enabled", Bool(false)),
                    set(Gcp, Database, "settings.ip_configuration.ipv4_enabled", Bool(false)),
                    set(OpenStack, Database, "public", Bool(false)),
                ],
                &[Aws, OpenStack],
            )
            .with_description("Databases must not expose a public endpoint"),
            SecurityPolicy::enforcing(
                "encryption_at_rest",
                "Encryption at rest",
                Severity::High,
                PolicyCategory::Encryption,
                vec![
                    set(Aws, Compute, "root_block_device.encrypted", Bool(true)),
                    set(Aws, Database, "storage_encrypted", Bool(true)),
                    set(Azure, Compute, "encryption_at_host_enabled", Bool(true)),
                    set(Azure, Database, "infrastructure_encryption_enabled", Bool(true)),
                    set(Gcp, Compute, "boot_disk.kms_key_self_link", SettingValue::reference("var.gcp_kms_key_self_link")),
                    set(Gcp, Database, "encryption_key_name", SettingValue::reference("var.gcp_kms_key_self_link")),
                    set(OpenStack, Compute, "block_device.volume_type", SettingValue::text("encrypted")),
                    set(OpenStack, Database, "encrypted", Bool(true)),
                ],
                &[Azure, Gcp],
            )
            .with_description("Disks and database storage must be encrypted at rest"),
            SecurityPolicy::enforcing(
                "ssl_required",
                "TLS required for data in transit",
                Severity::High,
                PolicyCategory::Encryption,
                vec![
                    set(Aws, Database, "ca_cert_identifier", SettingValue::text("rds-ca-rsa2048-g1")),
                    set(Azure, Database, "ssl_enforcement_enabled", Bool(true)),
                    set(Azure, Database, "ssl_minimal_tls_version_enforced", SettingValue::text("TLS1_2")),
                    set(Gcp, Database, "settings.ip_configuration.require_ssl", Bool(true)),
                    set(OpenStack, Database, "ssl_required", Bool(true)),
                ],
                &[],
            )
            .with_description("Database connections must use TLS"),
            SecurityPolicy::enforcing(
                "monitoring_enabled",
                "Monitoring and audit logging enabled",
                Severity::Medium,
                PolicyCategory::Monitoring,
                vec![
                    set(Aws, Compute, "monitoring", Bool(true)),
                    set(Aws, Database, "performance_insights_enabled", Bool(true)),
                    set(Azure, Compute, "provision_vm_agent", Bool(true)),
                    set(Azure, Database, "threat_detection_policy.enabled", Bool(true)),
                    set(Gcp, Compute, "shielded_instance_config.enable_integrity_monitoring", Bool(true)),
                    set(Gcp, Database, "settings.insights_config.query_insights_enabled", Bool(true)),
                    set(OpenStack, Compute, "metadata.monitoring", SettingValue::text("enabled")),
                    set(OpenStack, Database, "logging_enabled", Bool(true)),
                ],
                &[],
            )
            .with_description("Instances and databases must emit monitoring data"),
            SecurityPolicy::enforcing(
                "backup_enabled",
                "Automated backups enabled",
                Severity::Medium,
                PolicyCategory::BackupRecovery,
                vec![
                    set(Aws, Database, "backup_retention_period", Int(7)),
                    set(Azure, Database, "backup_retention_days", Int(7)),
                    set(Gcp, Database, "settings.backup_configuration.enabled", Bool(true)),
                    set(Gcp, Database, "settings.backup_configuration.start_time", SettingValue::text("03:00")),
                    set(
                        Gcp,
                        Database,
                        "settings.backup_configuration.backup_retention_settings.retained_backups",
                        Int(7),
                    ),
                    set(OpenStack, Database, "backup_enabled", Bool(true)),
                    set(OpenStack, Database, "backup_retention_days", Int(7)),
                ],
                &[],
            )
            .with_description("Databases must keep automated backups for at least 7 days"),
            SecurityPolicy::new(
                "no_hardcoded_credentials",
                "No hardcoded credentials",
                Severity::Critical,
                PolicyCategory::IdentityAccess,
                NoHardcodedCredentials,
            )
            .with_description("Credentials must come from variables or a secret manager, never literals"),
        ];

        for policy in policies {
            // Ids above are unique.
            if let Err(e) = registry.register(policy) {
                debug!("Skipping built-in policy: {}", e);
            }
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_six_policies_in_order() {
        let registry = PolicyRegistry::builtin();
        let ids: Vec<_> = registry.list_policies().iter().map(|p| p.id.as_str()).collect();

        assert_eq!(
            ids,
            vec![
                "db_no_public_ip",
                "encryption_at_rest",
                "ssl_required",
                "monitoring_enabled",
                "backup_enabled",
                "no_hardcoded_credentials"
            ]
        );
        assert_eq!(registry.get("no_hardcoded_credentials").unwrap().severity, Severity::Critical);
    }

    #[test]
    fn test_every_provider_has_database_defaults() {
        let registry = PolicyRegistry::builtin();
        for provider in CloudProvider::all() {
            let defaults = registry.secure_defaults_for(provider, ResourceKind::Database);
            assert!(defaults.len() >= 4, "{} has {} database defaults", provider, defaults.len());
        }
    }

    #[test]
    fn test_every_provider_monitors_compute() {
        let registry = PolicyRegistry::builtin();
        let monitoring = registry.get("monitoring_enabled").unwrap();
        for provider in CloudProvider::all() {
            assert!(
                monitoring.settings_for(provider).any(|s| s.target == ResourceKind::Compute),
                "{} has no compute monitoring setting",
                provider
            );
        }
    }

    #[test]
    fn test_secure_defaults_merge_all_kinds() {
        let registry = PolicyRegistry::builtin();
        let aws = registry.secure_defaults(CloudProvider::Aws);

        assert_eq!(aws.get("publicly_accessible"), Some(&SettingValue::Bool(false)));
        assert_eq!(aws.get("monitoring"), Some(&SettingValue::Bool(true)));
        assert_eq!(aws.get("backup_retention_period"), Some(&SettingValue::Int(7)));
        assert!(!aws.contains_key("ssl_enforcement_enabled"));
    }

    #[test]
    fn test_builtin_has_no_conflicts() {
        let registry = PolicyRegistry::builtin();
        for provider in CloudProvider::all() {
            assert!(registry.setting_conflicts(provider).is_empty());
        }
    }

    #[test]
    fn test_last_writer_wins() {
        let first = SecurityPolicy::enforcing(
            "first",
            "First",
            Severity::Medium,
            PolicyCategory::BackupRecovery,
            vec![
                PolicySetting::new(CloudProvider::Aws, ResourceKind::Database, "backup_retention_period", SettingValue::Int(7)),
                PolicySetting::new(CloudProvider::Aws, ResourceKind::Database, "storage_encrypted", SettingValue::Bool(true)),
            ],
            &[],
        );
        let second = SecurityPolicy::enforcing(
            "second",
            "Second",
            Severity::Medium,
            PolicyCategory::BackupRecovery,
            vec![PolicySetting::new(
                CloudProvider::Aws,
                ResourceKind::Database,
                "backup_retention_period",
                SettingValue::Int(30),
            )],
            &[],
        );

        let mut registry = PolicyRegistry::new();
        registry.register(first).unwrap();
        registry.register(second).unwrap();

        let defaults = registry.secure_defaults(CloudProvider::Aws);
        let keys: Vec<_> = defaults.iter().map(|(k, _)| k).collect();

        assert_eq!(defaults.get("backup_retention_period"), Some(&SettingValue::Int(30)));
        assert_eq!(keys, vec!["backup_retention_period", "storage_encrypted"]);

        let conflicts = registry.setting_conflicts(CloudProvider::Aws);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, "backup_retention_period");
        assert_eq!(conflicts[0].winner(), Some("second"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = PolicyRegistry::builtin();
        let dup = SecurityPolicy::new(
            "ssl_required",
            "Dup",
            Severity::High,
            PolicyCategory::Encryption,
            NoHardcodedCredentials,
        );

        assert!(matches!(registry.register(dup), Err(PolicyError::DuplicatePolicy(_))));
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_shared_registry_is_reused() {
        let a = PolicyRegistry::shared();
        let b = PolicyRegistry::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
