//! Error types for descriptor loading and validation.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::HttpMethod;

/// Structural failure while interpreting a raw document.
///
/// Fatal: no partial descriptor is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid `{field}`: {reason}")]
pub struct ParseError {
    /// Dotted path of the offending key, e.g. `functions.api.events[0].httpApi`.
    pub field: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "required key is missing")
    }

    pub(crate) fn expected(field: impl Into<String>, shape: &str) -> Self {
        Self::new(field, format!("expected {shape}"))
    }
}

/// Failure to turn a file or text into a [`crate::Descriptor`].
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A single rule violation. Collected, never thrown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{field}` is {value}, expected a value within [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("`{field}` value `{value}` is not a valid {expected}")]
    MalformedReference {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("route #{second} ({method} {path}) duplicates route #{first}")]
    DuplicateRoute {
        first: usize,
        second: usize,
        method: HttpMethod,
        path: String,
    },

    #[error("runtime `{runtime}` is not supported")]
    UnsupportedRuntime { runtime: String },

    #[error("`{field}` {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    /// Dotted path of the field the violation is reported against.
    pub fn field(&self) -> &str {
        match self {
            Self::OutOfRange { field, .. }
            | Self::MalformedReference { field, .. }
            | Self::InvalidValue { field, .. } => field,
            Self::DuplicateRoute { .. } => "functions",
            Self::UnsupportedRuntime { .. } => "provider.runtime",
        }
    }
}

/// Every violation found in one pass, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.0
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
