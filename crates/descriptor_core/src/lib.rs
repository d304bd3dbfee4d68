//! Deployment descriptor domain primitives.
//!
//! This crate owns the typed model of a serverless deployment descriptor
//! (`serverless.yml`), loading it from a raw key-value document, validating
//! cross-field rules and normalizing it into an effective descriptor. It
//! intentionally excludes CLI, logging setup and process exit concerns; those
//! live in `descriptor_check`.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use descriptor_core::{load_path, normalize, validate};
//!
//! let descriptor = load_path(Path::new("serverless.yml")).unwrap();
//! validate(&descriptor).unwrap();
//! let effective = normalize(&descriptor);
//! for warning in &effective.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! ```

pub mod error;
pub mod loader;
pub mod normalize;
pub mod schema;
pub mod validation;
mod yaml;

pub use error::{LoadError, ParseError, ValidationError, ValidationErrors};
pub use loader::{load, load_path, load_str, to_document, to_yaml_string, DocumentFormat};
pub use normalize::{normalize, EffectiveDescriptor, EffectiveRoute, NormalizationWarning};
pub use schema::{
    Descriptor, FunctionConfig, FunctionEvent, HttpApiEvent, HttpMethod, PluginConfig,
    ProviderConfig, Route,
};
pub use validation::validate;
