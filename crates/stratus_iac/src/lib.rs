//! # stratus_iac
//!
//! Policy-driven Terraform and Ansible generation.
//!
//! ## Features
//!
//! - Terraform for AWS, Azure, GCP and OpenStack through one renderer per provider
//! - Security defaults read from the policy registry and injected into every resource
//! - Multi-provider fan-out into numbered sections
//! - Engine-aware hardening playbooks
//! - Bundle writing (`main.tf`, `playbook.yml`, `terraform.tfvars.example`)
//!
//! ## Example
//!
//! ```rust
//! use stratus_iac::Generator;
//! use stratus_model::{CloudProvider, ProviderInfraSpec};
//!
//! let spec = ProviderInfraSpec::builder(CloudProvider::Aws)
//!     .servers(1)
//!     .databases(1)
//!     .build()
//!     .unwrap();
//!
//! let code = Generator::default().render(&spec);
//! assert!(code.contains("resource \"aws_db_instance\" \"db_1\""));
//! assert!(code.contains("sensitive   = true"));
//! ```

pub mod error;
pub mod hcl;
pub mod playbook;
pub mod provider;
pub mod providers;
pub mod scaffold;
pub mod terraform;

pub use error::{IacError, IacResult};
pub use hcl::{HclBlock, HclValue};
pub use playbook::{Play, PlaybookBuilder, Task};
pub use provider::{renderer_for, ProviderProfile, ProviderRenderer, RenderContext};
pub use scaffold::BundleWriter;
pub use terraform::{referenced_variables, GeneratedArtifact, Generator, RenderedSection, TerraformVariable};
