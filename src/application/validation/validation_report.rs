use serde::Serialize;

/// Outcome of validating one configuration. Never partially applied: a
/// configuration is either accepted whole or rejected with every error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn merge(mut self, other: ValidationReport) -> Self {
        self.errors.extend(other.errors);
        self.valid = self.errors.is_empty();
        self
    }

    pub fn into_result(self) -> Result<(), Vec<String>> {
        if self.valid {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::ok()
    }
}
