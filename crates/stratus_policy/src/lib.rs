//! # stratus_policy
//!
//! Security policies and compliance validation for generated infrastructure code.
//!
//! This crate provides:
//! - **Policy Registry**: one table of policies with per-provider recommended settings
//! - **Secure Defaults**: merged settings consumed by the code generator
//! - **Intent Scan**: detection of insecure asks in the request phrase
//! - **Compliance Audit**: scoring of rendered code, failing closed on predicate errors
//!
//! ## Example
//!
//! ```rust
//! use stratus_model::CloudProvider;
//! use stratus_policy::{ComplianceValidator, Grade};
//!
//! let validator = ComplianceValidator::default();
//! let outcome = validator
//!     .validate("a public database", "provider \"aws\" {\n}\n", None)
//!     .unwrap();
//!
//! assert_eq!(outcome.dangerous_requests.len(), 1);
//! assert_eq!(outcome.report.provider, Some(CloudProvider::Aws));
//! assert_eq!(outcome.report.grade, Grade::A);
//! ```

pub mod engine;
pub mod error;
pub mod hcl;
pub mod intent;
pub mod policy;
pub mod registry;
pub mod report;
pub mod rules;

pub use engine::{CheckOutcome, ComplianceAuditor, ComplianceValidator, ValidationOutcome};
pub use error::{PolicyError, PolicyResult};
pub use hcl::{HclBlockNode, HclBody, HclDocument, Resource};
pub use intent::{DangerKind, DangerousRequest, IntentRule, IntentScanner};
pub use policy::{PolicyCategory, PolicySetting, PolicySummary, SecurityPolicy, SettingValue, Severity};
pub use registry::{PolicyRegistry, SecureDefaults, SettingConflict};
pub use report::{ComplianceReport, Grade, Violation};
pub use rules::{CompliancePredicate, NoHardcodedCredentials, SettingsEnforced};
