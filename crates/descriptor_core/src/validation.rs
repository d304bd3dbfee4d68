//! Cross-field rules over a loaded [`Descriptor`].
//!
//! Every rule runs independently and every violation is collected, so a single
//! pass reports everything that needs fixing. Errors follow declaration order:
//! service, provider fields, then functions and their routes.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{ValidationError, ValidationErrors};
use crate::schema::{
    Descriptor, HttpMethod, MAX_MEMORY_MB, MAX_TIMEOUT_SECS, MIN_MEMORY_MB, MIN_TIMEOUT_SECS,
    SUPPORTED_RUNTIMES,
};

static ROLE_ARN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws(?:-cn|-us-gov)?:iam::\d{12}:role/(?:[\w+=,.@-]+/)*[\w+=,.@-]{1,64}$")
        .expect("role ARN pattern is valid")
});

// Optional directory prefix (`src/handler.main`), then `module.function`.
static HANDLER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\w.-]+/)*[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*$")
        .expect("handler pattern is valid")
});

pub fn validate(descriptor: &Descriptor) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if descriptor.service.trim().is_empty() {
        errors.push(ValidationError::InvalidValue {
            field: "service".to_string(),
            reason: "must be a non-empty name".to_string(),
        });
    }

    let provider = &descriptor.provider;
    if let Some(runtime) = &provider.runtime {
        if !SUPPORTED_RUNTIMES.contains(&runtime.as_str()) {
            errors.push(ValidationError::UnsupportedRuntime {
                runtime: runtime.clone(),
            });
        }
    }
    if let Some(memory_size) = provider.memory_size {
        check_range(
            &mut errors,
            "provider.memorySize",
            memory_size,
            MIN_MEMORY_MB,
            MAX_MEMORY_MB,
        );
    }
    if let Some(timeout) = provider.timeout {
        check_range(
            &mut errors,
            "provider.timeout",
            timeout,
            MIN_TIMEOUT_SECS,
            MAX_TIMEOUT_SECS,
        );
    }
    if let Some(role) = &provider.role {
        if !is_role_arn(role) {
            errors.push(ValidationError::MalformedReference {
                field: "provider.role".to_string(),
                value: role.clone(),
                expected: "IAM role ARN (arn:aws:iam::<account>:role/<name>)",
            });
        }
    }

    let routes = descriptor.routes();
    let mut first_seen: HashMap<(HttpMethod, &str), usize> = HashMap::new();
    let mut next_route = routes.iter().peekable();

    for function in &descriptor.functions {
        if !is_handler_reference(&function.handler) {
            errors.push(ValidationError::MalformedReference {
                field: format!("functions.{}.handler", function.name),
                value: function.handler.clone(),
                expected: "handler reference (module.function)",
            });
        }

        while let Some(route) = next_route.next_if(|route| route.function == function.name) {
            if !route.path().starts_with('/') {
                errors.push(ValidationError::InvalidValue {
                    field: format!("{}.path", route.field()),
                    reason: format!("`{}` must start with `/`", route.path()),
                });
            }

            match first_seen.get(&(route.method(), route.path())) {
                Some(&first) => errors.push(ValidationError::DuplicateRoute {
                    first,
                    second: route.index,
                    method: route.method(),
                    path: route.path().to_string(),
                }),
                None => {
                    first_seen.insert((route.method(), route.path()), route.index);
                }
            }
        }
    }

    debug!(
        service = %descriptor.service,
        routes = routes.len(),
        errors = errors.len(),
        "validated descriptor"
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors::new(errors))
    }
}

pub fn is_role_arn(value: &str) -> bool {
    ROLE_ARN_PATTERN.is_match(value)
}

pub fn is_handler_reference(value: &str) -> bool {
    HANDLER_PATTERN.is_match(value)
}

fn check_range(errors: &mut Vec<ValidationError>, field: &str, value: i64, min: i64, max: i64) {
    if !(min..=max).contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
}
