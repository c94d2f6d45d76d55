//! # stratus_model
//!
//! The normalized infrastructure model shared by extraction, generation and
//! validation.
//!
//! Raw input arrives as [`RawInfrastructure`] (untrusted, signed counts, free-form
//! provider names) and is turned into an immutable [`InfrastructureRequest`] by
//! [`SpecNormalizer`]. Normalization rejects negative or out-of-range counts and
//! guarantees that any compute, data or load-balancing resource comes with at least
//! one network and one security boundary.
//!
//! ## Example
//!
//! ```rust
//! use stratus_model::{CloudProvider, InfrastructureRequest, RawInfrastructure, RawProviderSpec};
//!
//! let raw = RawInfrastructure::single(RawProviderSpec::new("gcp").with_servers(2).with_networks(0));
//! let request = InfrastructureRequest::from_raw(&raw).unwrap();
//!
//! let spec = &request.providers()[0];
//! assert_eq!(spec.provider(), CloudProvider::Gcp);
//! assert_eq!(spec.networks(), 1);
//! ```

pub mod error;
pub mod models;
pub mod provider;
pub mod text;
pub mod validator;

pub use error::{ModelError, ModelResult};
pub use models::{
    InfrastructureRequest, ProviderInfraSpec, ProviderInfraSpecBuilder, RawInfrastructure, RawProviderSpec,
    ResourceCounts,
};
pub use provider::{CloudProvider, DatabaseEngine, ResourceKind};
pub use text::fold;
pub use validator::{SpecNormalizer, DEFAULT_COUNTS, MAX_RESOURCE_COUNT};
