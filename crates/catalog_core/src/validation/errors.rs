use std::error::Error;
use std::fmt::{Display, Formatter};

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field path, e.g. `website` or `maintainers[].email`.
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to validate {} due to {}", self.path, self.reason)
    }
}

impl Error for ValidationError {}

/// All field errors collected during one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedValidationError {
    errors: Vec<ValidationError>,
}

impl AggregatedValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(ValidationError::new(path, reason));
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for AggregatedValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let paths = self
            .errors
            .iter()
            .map(|err| err.path.as_str())
            .collect::<Vec<_>>();
        write!(f, "invalid fields: {}", paths.join(", "))
    }
}

impl Error for AggregatedValidationError {}

impl From<ValidationError> for AggregatedValidationError {
    fn from(value: ValidationError) -> Self {
        Self {
            errors: vec![value],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AggregatedValidationError, ValidationError};

    #[test]
    fn empty_aggregate_is_ok() {
        assert!(AggregatedValidationError::new().into_result().is_ok());
    }

    #[test]
    fn aggregate_lists_every_path() {
        let mut errors = AggregatedValidationError::new();
        errors.push("title", "empty value");
        errors.push("website", "url not properly formed");

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.to_string(), "invalid fields: title, website");
        assert_eq!(
            err.errors()[1].to_string(),
            "failed to validate website due to url not properly formed"
        );
    }

    #[test]
    fn single_error_converts() {
        let err = AggregatedValidationError::from(ValidationError::new(".", "bad payload"));
        assert_eq!(err.errors()[0].path, ".");
    }
}
