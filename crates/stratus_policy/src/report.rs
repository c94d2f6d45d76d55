//! Compliance reports, scores and grades.

use std::fmt;

use serde::{Deserialize, Serialize};
use stratus_model::CloudProvider;

use crate::policy::{PolicyCategory, Severity};

/// Letter grade derived from the compliance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Grade::A,
            75..=89 => Grade::B,
            60..=74 => Grade::C,
            _ => Grade::D,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::A => "Excellent",
            Grade::B => "Good",
            Grade::C => "Acceptable",
            Grade::D => "Insufficient",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub name: String,
    pub severity: Severity,
    pub category: PolicyCategory,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<CloudProvider>,
    /// Set when the check could not be evaluated and failed closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of auditing provisioning code against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<CloudProvider>,
    pub violations: Vec<Violation>,
    pub passed_checks: Vec<String>,
    pub total_checks: usize,
    pub score: u8,
    pub grade: Grade,
    pub status_label: String,
}

impl ComplianceReport {
    pub fn new(provider: Option<CloudProvider>, violations: Vec<Violation>, passed_checks: Vec<String>) -> Self {
        let score = Self::compute_score(&violations);
        let grade = Grade::from_score(score);
        Self {
            provider,
            total_checks: violations.len() + passed_checks.len(),
            violations,
            passed_checks,
            score,
            grade,
            status_label: grade.label().to_string(),
        }
    }

    /// 100 minus the severity penalties, floored at 0.
    pub fn compute_score(violations: &[Violation]) -> u8 {
        let penalty: u32 = violations.iter().map(|v| u32::from(v.severity.penalty())).sum();
        100u32.saturating_sub(penalty) as u8
    }

    /// Combine per-section reports: worst score wins, violations are
    /// concatenated and a check passes only if it passed everywhere.
    pub fn aggregate(reports: &[ComplianceReport]) -> Self {
        match reports {
            [] => Self::new(None, Vec::new(), Vec::new()),
            [only] => only.clone(),
            [first, rest @ ..] => {
                let violations: Vec<Violation> = reports.iter().flat_map(|r| r.violations.clone()).collect();
                let passed_checks: Vec<String> = first
                    .passed_checks
                    .iter()
                    .filter(|id| rest.iter().all(|r| r.passed_checks.contains(id)))
                    .cloned()
                    .collect();
                let score = reports.iter().map(|r| r.score).min().unwrap_or(100);
                let grade = Grade::from_score(score);

                Self {
                    provider: None,
                    total_checks: reports.iter().map(|r| r.total_checks).sum(),
                    violations,
                    passed_checks,
                    score,
                    grade,
                    status_label: grade.label().to_string(),
                }
            }
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_critical(&self) -> bool {
        self.violations.iter().any(|v| v.severity == Severity::Critical)
    }

    pub fn summary(&self) -> String {
        format!(
            "Score {}/100 ({} - {}), {} violation(s), {}/{} checks passed",
            self.score,
            self.grade,
            self.status_label,
            self.violations.len(),
            self.total_checks - self.violations.len(),
            self.total_checks
        )
    }

    /// Multi-line text report.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Compliance: {}\n", self.summary()));

        if self.violations.is_empty() {
            out.push_str("  No violations\n");
        }
        for v in &self.violations {
            let provider = v.provider.map(|p| format!(" [{}]", p)).unwrap_or_default();
            out.push_str(&format!(
                "  ✗ {} {}{}: {} (-{})\n",
                v.severity,
                v.rule_id,
                provider,
                v.description,
                v.severity.penalty()
            ));
        }
        for id in &self.passed_checks {
            out.push_str(&format!("  ✓ {}\n", id));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(rule_id: &str, severity: Severity) -> Violation {
        Violation {
            rule_id: rule_id.to_string(),
            name: rule_id.to_string(),
            severity,
            category: PolicyCategory::Encryption,
            description: String::new(),
            provider: Some(CloudProvider::Aws),
            error: None,
        }
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::from_score(100), Grade::A);
        assert_eq!(Grade::from_score(90), Grade::A);
        assert_eq!(Grade::from_score(89), Grade::B);
        assert_eq!(Grade::from_score(75), Grade::B);
        assert_eq!(Grade::from_score(74), Grade::C);
        assert_eq!(Grade::from_score(60), Grade::C);
        assert_eq!(Grade::from_score(59), Grade::D);
        assert_eq!(Grade::from_score(0), Grade::D);
    }

    #[test]
    fn test_score_floor() {
        let violations = vec![
            violation("a", Severity::Critical),
            violation("b", Severity::Critical),
            violation("c", Severity::Critical),
            violation("d", Severity::Critical),
        ];
        assert_eq!(ComplianceReport::compute_score(&violations), 0);
    }

    #[test]
    fn test_report_fields() {
        let report = ComplianceReport::new(
            Some(CloudProvider::Aws),
            vec![violation("ssl_required", Severity::High)],
            vec!["backup_enabled".to_string()],
        );

        assert_eq!(report.score, 80);
        assert_eq!(report.grade, Grade::B);
        assert_eq!(report.status_label, "Good");
        assert_eq!(report.total_checks, 2);
        assert!(!report.is_compliant());
        assert!(report.render_text().contains("ssl_required"));
    }

    #[test]
    fn test_aggregate_takes_worst_section() {
        let clean = ComplianceReport::new(
            Some(CloudProvider::Aws),
            Vec::new(),
            vec!["ssl_required".to_string(), "backup_enabled".to_string()],
        );
        let dirty = ComplianceReport::new(
            Some(CloudProvider::Gcp),
            vec![violation("backup_enabled", Severity::Medium)],
            vec!["ssl_required".to_string()],
        );

        let combined = ComplianceReport::aggregate(&[clean, dirty]);
        assert_eq!(combined.score, 90);
        assert_eq!(combined.grade, Grade::A);
        assert_eq!(combined.violations.len(), 1);
        assert_eq!(combined.passed_checks, vec!["ssl_required".to_string()]);
        assert_eq!(combined.provider, None);
    }
}
