//! Input validation shared by the repository DTOs.
//!
//! DTOs derive [`validator::Validate`]; [`validate_input`] turns a failure
//! into [`CoreError::Validation`] so every layer reports it the same way.

use validator::Validate;

use crate::error::CoreError;

/// Run the derived validations of `input`.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|errors| CoreError::Validation(errors.to_string()))
}
