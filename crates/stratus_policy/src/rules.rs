//! Compliance predicates.

use regex::Regex;
use stratus_model::CloudProvider;
use tracing::debug;

use crate::error::PolicyResult;
use crate::hcl::HclDocument;
use crate::policy::PolicySetting;

/// Decides whether rendered code complies with one policy.
///
/// Implementations must return `Ok(true)` when the concern does not apply to
/// the given text (for example a database rule on code without databases).
pub trait CompliancePredicate: Send + Sync {
    fn evaluate(&self, code: &str, provider: CloudProvider) -> PolicyResult<bool>;
}

impl<F> CompliancePredicate for F
where
    F: Fn(&str, CloudProvider) -> PolicyResult<bool> + Send + Sync,
{
    fn evaluate(&self, code: &str, provider: CloudProvider) -> PolicyResult<bool> {
        self(code, provider)
    }
}

/// Checks that every resource covered by a setting carries the recommended value.
///
/// Only resources of the kinds named by the settings for the given provider are
/// inspected; anything else is out of scope.
#[derive(Debug, Clone)]
pub struct SettingsEnforced {
    settings: Vec<PolicySetting>,
    secure_by_default: Vec<CloudProvider>,
}

impl SettingsEnforced {
    pub fn new(settings: Vec<PolicySetting>) -> Self {
        Self {
            settings,
            secure_by_default: Vec::new(),
        }
    }

    /// Providers whose platform default already satisfies the policy, so an
    /// absent attribute is compliant.
    pub fn with_secure_by_default(mut self, providers: &[CloudProvider]) -> Self {
        self.secure_by_default = providers.to_vec();
        self
    }
}

impl CompliancePredicate for SettingsEnforced {
    fn evaluate(&self, code: &str, provider: CloudProvider) -> PolicyResult<bool> {
        let relevant: Vec<&PolicySetting> = self.settings.iter().filter(|s| s.provider == provider).collect();
        if relevant.is_empty() {
            return Ok(true);
        }

        let absent_ok = self.secure_by_default.contains(&provider);
        let doc = HclDocument::parse(code)?;

        for resource in doc.resources() {
            let Some(kind) = provider.classify(resource.resource_type) else {
                continue;
            };

            for setting in relevant.iter().filter(|s| s.target == kind) {
                match resource.body.lookup(&setting.path()) {
                    Some(raw) if setting.value.is_satisfied_by(raw) => {}
                    Some(raw) => {
                        debug!(
                            "{}.{}: {} = {} (expected {})",
                            resource.resource_type, resource.name, setting.key, raw, setting.value
                        );
                        return Ok(false);
                    }
                    None if absent_ok => {}
                    None => {
                        debug!("{}.{}: missing {}", resource.resource_type, resource.name, setting.key);
                        return Ok(false);
                    }
                }
            }
        }

        Ok(true)
    }
}

/// Scans the whole text for literal credentials.
#[derive(Debug, Clone, Default)]
pub struct NoHardcodedCredentials;

const CREDENTIAL_ATTRIBUTE: &str =
    r#"(?i)\b[A-Za-z0-9_]*(?:password|passwd|secret|api_?key|access_key|private_key|token)\s*=\s*"([^"]*)""#;
const AWS_ACCESS_KEY: &str = r"AKIA[0-9A-Z]{16}";
const INTERPOLATION_ONLY: &str = r"^\$\{[^}]+\}$";

impl CompliancePredicate for NoHardcodedCredentials {
    fn evaluate(&self, code: &str, _provider: CloudProvider) -> PolicyResult<bool> {
        let attribute = Regex::new(CREDENTIAL_ATTRIBUTE)?;
        let access_key = Regex::new(AWS_ACCESS_KEY)?;
        let interpolation = Regex::new(INTERPOLATION_ONLY)?;

        if access_key.is_match(code) {
            return Ok(false);
        }

        let literal = attribute
            .captures_iter(code)
            .filter_map(|c| c.get(1))
            .any(|value| !interpolation.is_match(value.as_str()));

        Ok(!literal)
    }
}
