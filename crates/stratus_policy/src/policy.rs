//! Security policy definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stratus_model::{CloudProvider, ResourceKind};

use crate::error::PolicyResult;
use crate::rules::{CompliancePredicate, SettingsEnforced};

/// Policy severity. Each level carries a fixed score penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
        }
    }

    /// Points subtracted from the compliance score per violation.
    pub fn penalty(&self) -> u8 {
        match self {
            Severity::Critical => 30,
            Severity::High => 20,
            Severity::Medium => 10,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Policy category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCategory {
    NetworkAccess,
    Encryption,
    Monitoring,
    BackupRecovery,
    IdentityAccess,
}

impl PolicyCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            PolicyCategory::NetworkAccess => "Network Access",
            PolicyCategory::Encryption => "Encryption",
            PolicyCategory::Monitoring => "Monitoring",
            PolicyCategory::BackupRecovery => "Backup & Recovery",
            PolicyCategory::IdentityAccess => "Identity & Access",
        }
    }
}

impl fmt::Display for PolicyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Value of a recommended setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    Bool(bool),
    /// A minimum; larger values also satisfy the setting.
    Int(i64),
    Text(String),
    /// An unquoted Terraform expression, e.g. `var.kms_key`.
    Reference(String),
}

impl SettingValue {
    pub fn text(s: impl Into<String>) -> Self {
        SettingValue::Text(s.into())
    }

    pub fn reference(s: impl Into<String>) -> Self {
        SettingValue::Reference(s.into())
    }

    /// HCL source form of the value.
    pub fn to_hcl(&self) -> String {
        match self {
            SettingValue::Bool(b) => b.to_string(),
            SettingValue::Int(n) => n.to_string(),
            SettingValue::Text(s) => format!("\"{}\"", s),
            SettingValue::Reference(r) => r.clone(),
        }
    }

    /// Whether a raw HCL attribute value satisfies this setting.
    pub fn is_satisfied_by(&self, raw: &str) -> bool {
        let actual = raw.trim().trim_matches('"');
        match self {
            SettingValue::Bool(b) => actual.eq_ignore_ascii_case(&b.to_string()),
            SettingValue::Int(min) => actual.parse::<i64>().map(|n| n >= *min).unwrap_or(false),
            SettingValue::Text(s) => actual == s,
            SettingValue::Reference(r) => actual == r,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hcl())
    }
}

/// One recommended setting for one provider and resource kind.
///
/// `key` may be a dotted path addressing nested blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySetting {
    pub provider: CloudProvider,
    pub target: ResourceKind,
    pub key: String,
    pub value: SettingValue,
}

impl PolicySetting {
    pub fn new(provider: CloudProvider, target: ResourceKind, key: impl Into<String>, value: SettingValue) -> Self {
        Self {
            provider,
            target,
            key: key.into(),
            value,
        }
    }

    pub fn path(&self) -> Vec<&str> {
        self.key.split('.').collect()
    }
}

/// A security policy: metadata, per-provider settings and a compliance predicate.
#[derive(Clone)]
pub struct SecurityPolicy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub category: PolicyCategory,
    settings: Vec<PolicySetting>,
    predicate: Arc<dyn CompliancePredicate>,
}

impl SecurityPolicy {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        severity: Severity,
        category: PolicyCategory,
        predicate: impl CompliancePredicate + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            severity,
            category,
            settings: Vec::new(),
            predicate: Arc::new(predicate),
        }
    }

    /// A policy whose predicate checks that its own settings are present on
    /// every matching resource.
    ///
    /// For providers in `secure_by_default` a missing attribute is compliant;
    /// only an explicit insecure value is a violation.
    pub fn enforcing(
        id: impl Into<String>,
        name: impl Into<String>,
        severity: Severity,
        category: PolicyCategory,
        settings: Vec<PolicySetting>,
        secure_by_default: &[CloudProvider],
    ) -> Self {
        let predicate = SettingsEnforced::new(settings.clone()).with_secure_by_default(secure_by_default);
        let mut policy = Self::new(id, name, severity, category, predicate);
        policy.settings = settings;
        policy
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Add a recommended setting without changing the predicate.
    pub fn with_setting(mut self, setting: PolicySetting) -> Self {
        self.settings.push(setting);
        self
    }

    pub fn settings(&self) -> &[PolicySetting] {
        &self.settings
    }

    /// Settings for one provider, in declaration order.
    pub fn settings_for(&self, provider: CloudProvider) -> impl Iterator<Item = &PolicySetting> {
        self.settings.iter().filter(move |s| s.provider == provider)
    }

    /// Flat `setting -> value` map for one provider.
    pub fn provider_settings(&self, provider: CloudProvider) -> BTreeMap<String, SettingValue> {
        self.settings_for(provider)
            .map(|s| (s.key.clone(), s.value.clone()))
            .collect()
    }

    /// Run the predicate against rendered code.
    pub fn evaluate(&self, code: &str, provider: CloudProvider) -> PolicyResult<bool> {
        self.predicate.evaluate(code, provider)
    }

    pub fn summary(&self) -> PolicySummary {
        PolicySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            severity: self.severity,
            category: self.category,
            settings: self.settings.clone(),
        }
    }
}

impl fmt::Debug for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityPolicy")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .field("category", &self.category)
            .field("settings", &self.settings.len())
            .finish_non_exhaustive()
    }
}

/// Serializable view of a policy.
#[derive(Debug, Clone, Serialize)]
pub struct PolicySummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub category: PolicyCategory,
    pub settings: Vec<PolicySetting>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalties() {
        assert_eq!(Severity::Critical.penalty(), 30);
        assert_eq!(Severity::High.penalty(), 20);
        assert_eq!(Severity::Medium.penalty(), 10);
    }

    #[test]
    fn test_setting_value_hcl_forms() {
        assert_eq!(SettingValue::Bool(false).to_hcl(), "false");
        assert_eq!(SettingValue::Int(7).to_hcl(), "7");
        assert_eq!(SettingValue::text("TLS1_2").to_hcl(), "\"TLS1_2\"");
        assert_eq!(SettingValue::reference("var.key").to_hcl(), "var.key");
    }

    #[test]
    fn test_setting_value_satisfaction() {
        assert!(SettingValue::Bool(true).is_satisfied_by("true"));
        assert!(!SettingValue::Bool(true).is_satisfied_by("false"));
        assert!(SettingValue::Int(7).is_satisfied_by("14"));
        assert!(!SettingValue::Int(7).is_satisfied_by("0"));
        assert!(!SettingValue::Int(7).is_satisfied_by("var.days"));
        assert!(SettingValue::text("03:00").is_satisfied_by("\"03:00\""));
    }

    #[test]
    fn test_provider_settings_map() {
        let policy = SecurityPolicy::enforcing(
            "backup_enabled",
            "Backups",
            Severity::Medium,
            PolicyCategory::BackupRecovery,
            vec![
                PolicySetting::new(CloudProvider::Aws, ResourceKind::Database, "backup_retention_period", SettingValue::Int(7)),
                PolicySetting::new(CloudProvider::Azure, ResourceKind::Database, "backup_retention_days", SettingValue::Int(7)),
            ],
            &[],
        );

        let aws = policy.provider_settings(CloudProvider::Aws);
        assert_eq!(aws.len(), 1);
        assert_eq!(aws.get("backup_retention_period"), Some(&SettingValue::Int(7)));
        assert!(policy.provider_settings(CloudProvider::Gcp).is_empty());
    }
}
