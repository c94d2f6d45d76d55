//! Pre-generation intent scan.
//!
//! Looks at the raw request phrase for explicit asks to weaken security. The
//! scan is independent of whatever code the generator produced.

use regex::Regex;
use serde::{Deserialize, Serialize};

use stratus_model::fold;

use crate::error::PolicyResult;

/// Kind of insecure configuration requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerKind {
    PublicDatabase,
    UnencryptedData,
    OpenSsh,
}

impl DangerKind {
    /// Registry policy the request would violate, if any.
    pub fn policy_id(&self) -> Option<&'static str> {
        match self {
            DangerKind::PublicDatabase => Some("db_no_public_ip"),
            DangerKind::UnencryptedData => Some("encryption_at_rest"),
            DangerKind::OpenSsh => None,
        }
    }
}

/// An insecure configuration requested in natural language, and what was done instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerousRequest {
    pub kind: DangerKind,
    pub requested: String,
    pub applied: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

/// A rule fires when every term group has at least one match.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub kind: DangerKind,
    pub term_groups: Vec<Vec<&'static str>>,
    pub requested: &'static str,
    pub applied: &'static str,
    pub reason: &'static str,
}

impl IntentRule {
    fn matches(&self, folded: &str) -> PolicyResult<bool> {
        for group in &self.term_groups {
            if !group_regex(group)?.is_match(folded) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn to_request(&self) -> DangerousRequest {
        DangerousRequest {
            kind: self.kind,
            requested: self.requested.to_string(),
            applied: self.applied.to_string(),
            reason: self.reason.to_string(),
            policy_id: self.kind.policy_id().map(str::to_string),
        }
    }
}

/// Keyword co-occurrence scanner over request phrases (French and English).
#[derive(Debug, Clone)]
pub struct IntentScanner {
    rules: Vec<IntentRule>,
}

impl Default for IntentScanner {
    fn default() -> Self {
        Self::standard()
    }
}

impl IntentScanner {
    pub fn new(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            IntentRule {
                kind: DangerKind::PublicDatabase,
                term_groups: vec![
                    vec![
                        "public",
                        "publique",
                        "publiquement",
                        "publicly",
                        "accessible internet",
                        "accessible depuis internet",
                        "accessible from the internet",
                        "internet facing",
                        "internet-facing",
                        "exposed to the internet",
                        "exposee sur internet",
                    ],
                    vec![
                        "database",
                        "databases",
                        "db",
                        "base",
                        "bases",
                        "base de donnees",
                        "mysql",
                        "postgresql",
                        "postgres",
                        "mariadb",
                        "mongodb",
                        "rds",
                    ],
                ],
                requested: "Publicly accessible database",
                applied: "Database kept private with public access disabled",
                reason: "A database reachable from the internet is exposed to direct attacks on its data",
            },
            IntentRule {
                kind: DangerKind::UnencryptedData,
                term_groups: vec![vec![
                    "sans chiffrement",
                    "non chiffre",
                    "non chiffree",
                    "non chiffres",
                    "non chiffrees",
                    "pas de chiffrement",
                    "en clair",
                    "unencrypted",
                    "no encryption",
                    "without encryption",
                    "disable encryption",
                    "encryption disabled",
                    "plaintext",
                ]],
                requested: "Unencrypted data storage",
                applied: "Encryption at rest enforced on disks and databases",
                reason: "Unencrypted storage leaks data if a disk, snapshot or backup is exposed",
            },
            IntentRule {
                kind: DangerKind::OpenSsh,
                term_groups: vec![vec![
                    "ssh 0.0.0.0",
                    "ssh public",
                    "ssh publique",
                    "ssh ouvert",
                    "ssh open",
                    "open ssh",
                    "ssh from anywhere",
                    "ssh depuis partout",
                    "ssh to the world",
                    "ssh exposed",
                    "ssh expose",
                    "port 22 open",
                    "port 22 ouvert",
                ]],
                requested: "SSH open to 0.0.0.0/0",
                applied: "SSH restricted by the firewall with key-only authentication",
                reason: "SSH exposed to every address invites brute-force and credential-stuffing attacks",
            },
        ])
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Dangerous requests found in the phrase, in rule order.
    pub fn scan(&self, phrase: &str) -> PolicyResult<Vec<DangerousRequest>> {
        let folded = fold(phrase);
        let mut found = Vec::new();
        for rule in &self.rules {
            if rule.matches(&folded)? {
                found.push(rule.to_request());
            }
        }
        Ok(found)
    }
}

/// One case-insensitive, word-bounded alternation per term group.
fn group_regex(terms: &[&str]) -> PolicyResult<Regex> {
    let alternation = terms
        .iter()
        .map(|t| {
            fold(t)
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|");
    Ok(Regex::new(&format!(r"\b(?:{})\b", alternation))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(phrase: &str) -> Vec<DangerKind> {
        IntentScanner::standard()
            .scan(phrase)
            .unwrap()
            .into_iter()
            .map(|d| d.kind)
            .collect()
    }

    #[test]
    fn test_public_database_french() {
        assert_eq!(kinds("Je veux une base de données publique"), vec![DangerKind::PublicDatabase]);
    }

    #[test]
    fn test_public_database_english() {
        assert_eq!(
            kinds("A MySQL database publicly accessible"),
            vec![DangerKind::PublicDatabase]
        );
    }

    #[test]
    fn test_public_alone_is_not_dangerous() {
        assert!(kinds("A public web server on AWS").is_empty());
    }

    #[test]
    fn test_unencrypted_with_accents() {
        assert_eq!(kinds("Stockage non chiffré"), vec![DangerKind::UnencryptedData]);
        assert_eq!(kinds("Serveur sans chiffrement"), vec![DangerKind::UnencryptedData]);
    }

    #[test]
    fn test_open_ssh() {
        assert_eq!(kinds("Serveur avec SSH ouvert au public"), vec![DangerKind::OpenSsh]);
        assert_eq!(kinds("allow ssh 0.0.0.0/0"), vec![DangerKind::OpenSsh]);
    }

    #[test]
    fn test_multiple_findings_in_rule_order() {
        let found = kinds("ssh open and a public unencrypted postgres db");
        assert_eq!(
            found,
            vec![DangerKind::PublicDatabase, DangerKind::UnencryptedData, DangerKind::OpenSsh]
        );
    }

    #[test]
    fn test_words_not_substrings() {
        assert!(kinds("publication of a dbx report").is_empty());
    }

    #[test]
    fn test_request_triple_populated() {
        let found = IntentScanner::standard().scan("base de données publique").unwrap();
        let request = &found[0];

        assert_eq!(request.policy_id.as_deref(), Some("db_no_public_ip"));
        assert!(!request.requested.is_empty());
        assert!(!request.applied.is_empty());
        assert!(!request.reason.is_empty());
    }
}
