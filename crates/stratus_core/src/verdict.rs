//! Admit/block decision.

use serde::{Deserialize, Serialize};
use stratus_policy::{ComplianceReport, DangerousRequest};

/// Replaces the provisioning code of a blocked request.
pub const BLOCKED_MARKER: &str = "BLOCKED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOT_OK")]
    NotOk,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::NotOk => "NOT_OK",
        }
    }

    pub fn is_ok(&self) -> bool {
        *self == Verdict::Ok
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a request was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    DangerousRequest,
    ScoreBelowThreshold,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::DangerousRequest => "DANGEROUS_REQUEST",
            BlockReason::ScoreBelowThreshold => "SCORE_BELOW_THRESHOLD",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Blocked when anything dangerous was asked for or the score is under the threshold.
pub fn decide(
    dangerous: &[DangerousRequest],
    report: &ComplianceReport,
    block_threshold: u8,
) -> (Verdict, Vec<BlockReason>) {
    let mut reasons = Vec::new();
    if !dangerous.is_empty() {
        reasons.push(BlockReason::DangerousRequest);
    }
    if report.score < block_threshold {
        reasons.push(BlockReason::ScoreBelowThreshold);
    }
    let verdict = if reasons.is_empty() { Verdict::Ok } else { Verdict::NotOk };
    (verdict, reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_policy::{DangerKind, PolicyCategory, Severity, Violation};

    fn report(violations: usize) -> ComplianceReport {
        let violations = (0..violations)
            .map(|i| Violation {
                rule_id: format!("rule_{}", i),
                name: "rule".to_string(),
                severity: Severity::High,
                category: PolicyCategory::Encryption,
                description: String::new(),
                provider: None,
                error: None,
            })
            .collect();
        ComplianceReport::new(None, violations, Vec::new())
    }

    fn danger() -> DangerousRequest {
        DangerousRequest {
            kind: DangerKind::PublicDatabase,
            requested: "public".to_string(),
            applied: "private".to_string(),
            reason: "exposed".to_string(),
            policy_id: None,
        }
    }

    #[test]
    fn test_clean_request_is_ok() {
        assert_eq!(decide(&[], &report(0), 70), (Verdict::Ok, vec![]));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // one HIGH violation scores 80
        assert_eq!(decide(&[], &report(1), 80).0, Verdict::Ok);
        assert_eq!(
            decide(&[], &report(1), 81),
            (Verdict::NotOk, vec![BlockReason::ScoreBelowThreshold])
        );
    }

    #[test]
    fn test_dangerous_request_blocks_perfect_score() {
        assert_eq!(
            decide(&[danger()], &report(0), 70),
            (Verdict::NotOk, vec![BlockReason::DangerousRequest])
        );
    }

    #[test]
    fn test_both_reasons_reported() {
        let (verdict, reasons) = decide(&[danger()], &report(2), 70);
        assert_eq!(verdict, Verdict::NotOk);
        assert_eq!(reasons, vec![BlockReason::DangerousRequest, BlockReason::ScoreBelowThreshold]);
    }

    #[test]
    fn test_serialized_labels() {
        assert_eq!(serde_json::to_string(&Verdict::NotOk).unwrap(), "\"NOT_OK\"");
        assert_eq!(
            serde_json::to_string(&BlockReason::ScoreBelowThreshold).unwrap(),
            "\"SCORE_BELOW_THRESHOLD\""
        );
    }
}
