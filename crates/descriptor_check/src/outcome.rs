use std::path::Path;

use descriptor_core::{
    load_path, normalize, validate, EffectiveDescriptor, LoadError, NormalizationWarning,
    ValidationErrors,
};

use crate::{EXIT_INVALID, EXIT_LOAD_FAILED, EXIT_OK};

#[derive(Debug)]
pub enum CheckOutcome {
    Clean,
    Warnings(Vec<NormalizationWarning>),
    Invalid(ValidationErrors),
    LoadFailed(LoadError),
}

impl CheckOutcome {
    pub fn exit_code(&self, deny_warnings: bool) -> i32 {
        match self {
            Self::Clean => EXIT_OK,
            Self::Warnings(_) if deny_warnings => EXIT_INVALID,
            Self::Warnings(_) => EXIT_OK,
            Self::Invalid(_) => EXIT_INVALID,
            Self::LoadFailed(_) => EXIT_LOAD_FAILED,
        }
    }
}

#[derive(Debug)]
pub struct CheckReport {
    pub outcome: CheckOutcome,
    /// Present whenever validation passed.
    pub effective: Option<EffectiveDescriptor>,
}

/// Load, validate and normalize the descriptor at `path`.
pub fn check_path(path: &Path) -> CheckReport {
    let descriptor = match load_path(path) {
        Ok(value) => value,
        Err(error) => {
            return CheckReport {
                outcome: CheckOutcome::LoadFailed(error),
                effective: None,
            };
        }
    };

    if let Err(errors) = validate(&descriptor) {
        return CheckReport {
            outcome: CheckOutcome::Invalid(errors),
            effective: None,
        };
    }

    let effective = normalize(&descriptor);
    let outcome = if effective.has_warnings() {
        CheckOutcome::Warnings(effective.warnings.clone())
    } else {
        CheckOutcome::Clean
    };
    CheckReport {
        outcome,
        effective: Some(effective),
    }
}

#[cfg(test)]
mod tests {
    use descriptor_core::ParseError;

    use super::*;

    #[test]
    fn exit_codes_follow_outcome_severity() {
        assert_eq!(CheckOutcome::Clean.exit_code(true), EXIT_OK);
        assert_eq!(CheckOutcome::Warnings(Vec::new()).exit_code(false), EXIT_OK);
        assert_eq!(CheckOutcome::Warnings(Vec::new()).exit_code(true), EXIT_INVALID);
        assert_eq!(
            CheckOutcome::LoadFailed(LoadError::Parse(ParseError::new("service", "missing")))
                .exit_code(false),
            EXIT_LOAD_FAILED
        );
    }
}
