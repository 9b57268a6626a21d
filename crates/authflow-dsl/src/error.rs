use authflow_core::ValidationError;
use std::fmt;
use thiserror::Error;

/// All possible errors that can occur while loading flow documents
#[derive(Error, Debug)]
pub enum DslError {
    /// Errors that occur during YAML parsing
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A document file could not be read
    #[error("I/O error reading '{path}': {message}")]
    IoError {
        /// File or directory path
        path: String,
        /// Underlying error
        message: String,
    },

    /// A single validation error
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    /// Multiple validation errors
    #[error("{}", MultipleErrorsFormat(.0))]
    MultipleValidationErrors(Vec<ValidationError>),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

// Helper struct to format multiple errors
struct MultipleErrorsFormat<'a>(&'a [ValidationError]);

impl fmt::Display for MultipleErrorsFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiple validation errors ({} issues):", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, err)?;
        }
        Ok(())
    }
}

impl DslError {
    /// Create a DslError from one or more validation errors
    pub fn from_validation_errors(mut errors: Vec<ValidationError>) -> Self {
        match errors.len() {
            0 => DslError::InternalError(
                "Called from_validation_errors with empty vector".to_string(),
            ),
            1 => match errors.pop() {
                Some(error) => DslError::ValidationError(error),
                None => DslError::InternalError("validation error vanished".to_string()),
            },
            _ => DslError::MultipleValidationErrors(errors),
        }
    }

    /// All validation errors carried by this error
    pub fn validation_errors(&self) -> Vec<&ValidationError> {
        match self {
            DslError::ValidationError(err) => vec![err],
            DslError::MultipleValidationErrors(errs) => errs.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DslError::YamlError(_) => "ERR_DSL_YAML_PARSE",
            DslError::IoError { .. } => "ERR_DSL_IO",
            DslError::ValidationError(err) => err.code,
            DslError::MultipleValidationErrors(_) => "ERR_DSL_VALIDATION_MULTIPLE",
            DslError::MissingRequiredField(_) => "ERR_DSL_MISSING_FIELD",
            DslError::InternalError(_) => "ERR_DSL_INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(code: &'static str, message: &str) -> ValidationError {
        ValidationError {
            code,
            message: message.to_string(),
            path: None,
        }
    }

    #[test]
    fn test_single_error_is_unwrapped() {
        let err = DslError::from_validation_errors(vec![error("ERR_FLOW_EMPTY", "flow has no nodes")]);

        assert_eq!(err.error_code(), "ERR_FLOW_EMPTY");
        assert_eq!(err.validation_errors().len(), 1);
    }

    #[test]
    fn test_multiple_errors_are_listed() {
        let err = DslError::from_validation_errors(vec![
            error("ERR_FLOW_DANGLING_EDGE", "first"),
            error("ERR_FLOW_UNKNOWN_STEP_TYPE", "second"),
        ]);

        assert_eq!(err.error_code(), "ERR_DSL_VALIDATION_MULTIPLE");
        let text = err.to_string();
        assert!(text.starts_with("Multiple validation errors (2 issues):"));
        assert!(text.contains("1. ERR_FLOW_DANGLING_EDGE: first"));
        assert!(text.contains("2. ERR_FLOW_UNKNOWN_STEP_TYPE: second"));
    }

    #[test]
    fn test_empty_error_list_is_internal() {
        let err = DslError::from_validation_errors(Vec::new());
        assert_eq!(err.error_code(), "ERR_DSL_INTERNAL");
    }
}
