//! Compliance validation engine.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use stratus_model::CloudProvider;
use tracing::{debug, error, info};

use crate::error::{PolicyError, PolicyResult};
use crate::intent::{DangerousRequest, IntentScanner};
use crate::policy::SecurityPolicy;
use crate::registry::PolicyRegistry;
use crate::report::{ComplianceReport, Violation};

/// Outcome of evaluating one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Violated,
    /// The predicate failed; treated as a violation.
    Errored(String),
}

/// Audits provisioning code against every registered policy.
#[derive(Debug, Clone)]
pub struct ComplianceAuditor {
    registry: Arc<PolicyRegistry>,
}

impl Default for ComplianceAuditor {
    fn default() -> Self {
        Self::new(PolicyRegistry::shared())
    }
}

impl ComplianceAuditor {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Detect the provider from its declaration; first match wins, AWS otherwise.
    pub fn detect_provider(code: &str) -> CloudProvider {
        CloudProvider::all()
            .into_iter()
            .find(|p| p.declaration_markers().iter().any(|m| code.contains(m.as_str())))
            .unwrap_or(CloudProvider::Aws)
    }

    /// Evaluate all policies and score the result.
    pub fn audit(&self, code: &str, provider: Option<CloudProvider>) -> ComplianceReport {
        let provider = provider.unwrap_or_else(|| {
            let detected = Self::detect_provider(code);
            debug!("Detected provider: {}", detected);
            detected
        });

        let mut violations = Vec::new();
        let mut passed = Vec::new();

        for policy in self.registry.list_policies() {
            match Self::check(policy, code, provider) {
                CheckOutcome::Passed => passed.push(policy.id.clone()),
                CheckOutcome::Violated => violations.push(Self::violation(policy, provider, None)),
                CheckOutcome::Errored(message) => {
                    error!("Policy {} failed to evaluate: {}", policy.id, message);
                    violations.push(Self::violation(policy, provider, Some(message)));
                }
            }
        }

        let report = ComplianceReport::new(Some(provider), violations, passed);
        info!("Audit ({}): {}", provider, report.summary());
        report
    }

    /// Run one predicate, converting errors and panics into `Errored`.
    pub fn check(policy: &SecurityPolicy, code: &str, provider: CloudProvider) -> CheckOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| policy.evaluate(code, provider)));
        match result {
            Ok(Ok(true)) => CheckOutcome::Passed,
            Ok(Ok(false)) => CheckOutcome::Violated,
            Ok(Err(e)) => CheckOutcome::Errored(
                PolicyError::RuleEvaluationFailed {
                    rule: policy.id.clone(),
                    message: e.to_string(),
                }
                .to_string(),
            ),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "predicate panicked".to_string());
                CheckOutcome::Errored(
                    PolicyError::RuleEvaluationFailed {
                        rule: policy.id.clone(),
                        message,
                    }
                    .to_string(),
                )
            }
        }
    }

    fn violation(policy: &SecurityPolicy, provider: CloudProvider, error: Option<String>) -> Violation {
        let description = match &error {
            Some(message) => format!("Internal error while checking this policy (treated as a violation): {}", message),
            None => policy.description.clone(),
        };
        Violation {
            rule_id: policy.id.clone(),
            name: policy.name.clone(),
            severity: policy.severity,
            category: policy.category,
            description,
            provider: Some(provider),
            error,
        }
    }
}

/// Result of running both validation phases.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub dangerous_requests: Vec<DangerousRequest>,
    pub report: ComplianceReport,
}

/// Runs the intent scan and the code audit together.
#[derive(Debug, Clone, Default)]
pub struct ComplianceValidator {
    scanner: IntentScanner,
    auditor: ComplianceAuditor,
}

impl ComplianceValidator {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self {
            scanner: IntentScanner::standard(),
            auditor: ComplianceAuditor::new(registry),
        }
    }

    pub fn with_scanner(mut self, scanner: IntentScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn auditor(&self) -> &ComplianceAuditor {
        &self.auditor
    }

    /// Phase A: scan the request phrase.
    pub fn scan_intent(&self, phrase: &str) -> PolicyResult<Vec<DangerousRequest>> {
        self.scanner.scan(phrase)
    }

    /// Phase B: audit rendered code.
    pub fn audit(&self, code: &str, provider: Option<CloudProvider>) -> ComplianceReport {
        self.auditor.audit(code, provider)
    }

    /// Both phases over one phrase and one block of code.
    pub fn validate(&self, phrase: &str, code: &str, provider: Option<CloudProvider>) -> PolicyResult<ValidationOutcome> {
        let dangerous_requests = self.scan_intent(phrase)?;
        let report = self.audit(code, provider);
        Ok(ValidationOutcome {
            dangerous_requests,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyCategory, Severity};
    use crate::report::Grade;

    #[test]
    fn test_detect_provider() {
        assert_eq!(ComplianceAuditor::detect_provider("provider \"azurerm\" {}"), CloudProvider::Azure);
        assert_eq!(ComplianceAuditor::detect_provider("source = \"hashicorp/google\""), CloudProvider::Gcp);
        assert_eq!(ComplianceAuditor::detect_provider("provider \"openstack\" {"), CloudProvider::OpenStack);
        assert_eq!(ComplianceAuditor::detect_provider("resource \"x\" \"y\" {}"), CloudProvider::Aws);
    }

    #[test]
    fn test_detect_provider_checks_aws_first() {
        let code = "provider \"google\" {}\nprovider \"aws\" {}\n";
        assert_eq!(ComplianceAuditor::detect_provider(code), CloudProvider::Aws);
    }

    #[test]
    fn test_empty_code_is_fully_compliant() {
        let report = ComplianceAuditor::default().audit("", Some(CloudProvider::Aws));
        assert_eq!(report.score, 100);
        assert_eq!(report.grade, Grade::A);
        assert_eq!(report.passed_checks.len(), 6);
    }

    #[test]
    fn test_predicate_error_fails_closed() {
        let mut registry = PolicyRegistry::new();
        registry
            .register(SecurityPolicy::new(
                "broken",
                "Broken",
                Severity::High,
                PolicyCategory::Encryption,
                |_: &str, _: CloudProvider| -> PolicyResult<bool> {
                    Err(PolicyError::RuleEvaluationFailed {
                        rule: "broken".into(),
                        message: "boom".into(),
                    })
                },
            ))
            .unwrap();

        let report = ComplianceAuditor::new(Arc::new(registry)).audit("", None);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.score, 80);
        assert!(report.violations[0].error.as_deref().unwrap().contains("boom"));
        assert!(report.violations[0].description.contains("Internal error"));
    }

    #[test]
    fn test_predicate_panic_fails_closed() {
        let mut registry = PolicyRegistry::new();
        registry
            .register(SecurityPolicy::new(
                "panicky",
                "Panicky",
                Severity::Critical,
                PolicyCategory::IdentityAccess,
                |_: &str, _: CloudProvider| -> PolicyResult<bool> { panic!("predicate bug") },
            ))
            .unwrap();

        let report = ComplianceAuditor::new(Arc::new(registry)).audit("", None);
        assert_eq!(report.score, 70);
        assert!(report.violations[0].error.as_deref().unwrap().contains("predicate bug"));
    }

    #[test]
    fn test_validate_runs_both_phases() {
        let validator = ComplianceValidator::default();
        let outcome = validator
            .validate("base de données publique", "resource \"aws_vpc\" \"network_1\" {\n}\n", None)
            .unwrap();

        assert_eq!(outcome.dangerous_requests.len(), 1);
        assert_eq!(outcome.report.score, 100);
    }
}
