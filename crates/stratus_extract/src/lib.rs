//! # stratus_extract
//!
//! Turns a natural-language infrastructure request into an untrusted
//! [`RawInfrastructure`](stratus_model::RawInfrastructure).
//!
//! Two extractors implement [`Extractor`]:
//!
//! - [`KeywordExtractor`]: offline, deterministic keyword matching (French and English)
//! - [`LlmExtractor`]: an OpenAI-compatible chat-completions client
//!
//! Extractors never validate. The caller normalizes the output and decides what
//! to do when extraction fails or times out.
//!
//! ## Example
//!
//! ```rust
//! use stratus_extract::KeywordExtractor;
//!
//! let raw = KeywordExtractor::new().parse("Je veux 2 serveurs GCP avec MySQL");
//! assert_eq!(raw.providers[0].provider.as_deref(), Some("gcp"));
//! assert_eq!(raw.providers[0].servers, Some(2));
//! assert_eq!(raw.providers[0].databases, Some(1));
//! ```

pub mod error;
pub mod extractor;
pub mod keyword;
pub mod llm;

pub use error::{ExtractError, ExtractResult};
pub use extractor::{ExtractionMode, Extractor};
pub use keyword::KeywordExtractor;
pub use llm::{parse_reply, LlmExtractor, DEFAULT_ENDPOINT, DEFAULT_MODEL};
