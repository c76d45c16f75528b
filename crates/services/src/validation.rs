//! Request-input validation. Collects every failing field before reporting.

use domains::{is_alpha_dash, is_email, DomainError, DomainResult, ValidationErrors};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

#[derive(Default)]
pub(crate) struct Validator {
    errors: ValidationErrors,
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present and not blank. Returns the trimmed value for further rules.
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v),
            None => {
                self.errors
                    .add(field, format!("The {} field is required.", label(field)));
                None
            }
        }
    }

    /// Like [`Validator::required`] but hands back the value untouched, for
    /// secrets where surrounding whitespace is significant.
    pub fn present<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => Some(v),
            None => {
                self.errors
                    .add(field, format!("The {} field is required.", label(field)));
                None
            }
        }
    }

    pub fn alpha_dash(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_alpha_dash(v) {
                self.errors.add(
                    field,
                    format!(
                        "The {} may only contain letters, numbers, dashes and underscores.",
                        label(field)
                    ),
                );
            }
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_email(v) {
                self.errors.add(
                    field,
                    format!("The {} must be a valid email address.", label(field)),
                );
            }
        }
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.errors.add(
                    field,
                    format!("The {} may not be greater than {} characters.", label(field), max),
                );
            }
        }
    }

    pub fn min_len(&mut self, field: &str, value: Option<&str>, min: usize) {
        if let Some(v) = value {
            if v.chars().count() < min {
                self.errors.add(
                    field,
                    format!("The {} must be at least {} characters.", label(field), min),
                );
            }
        }
    }

    pub fn confirmed(&mut self, field: &str, value: Option<&str>, confirmation: Option<&str>) {
        if value.is_some() && value != confirmation {
            self.errors.add(
                field,
                format!("The {} confirmation does not match.", label(field)),
            );
        }
    }

    pub fn taken(&mut self, field: &str) {
        self.errors
            .add(field, format!("The {} has already been taken.", label(field)));
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn finish(self) -> DomainResult<()> {
        self.errors.into_result().map_err(DomainError::Validation)
    }
}

/// Maps a storage-level uniqueness conflict onto a field error.
pub(crate) fn conflict_as_taken(err: DomainError, field: &str) -> DomainError {
    match err {
        DomainError::Conflict(_) => DomainError::Validation(ValidationErrors::single(
            field,
            format!("The {} has already been taken.", label(field)),
        )),
        other => other,
    }
}
