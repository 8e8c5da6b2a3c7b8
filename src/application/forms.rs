//! Form state shared by the HTML handlers.

use crate::domain::error::DomainError;

/// Validation messages keyed by form field. `__all__` holds form-wide errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(&'static str, String)>,
}

impl FieldErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push((field, message.into()));
    }

    pub fn push_domain(&mut self, error: &DomainError) {
        match error {
            DomainError::Validation { field, message } => self.push(field, message.clone()),
            other => self.push(Self::NON_FIELD, other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_field(&self, field: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(name, _)| *name == field)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn non_field(&self) -> Vec<String> {
        self.for_field(Self::NON_FIELD)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }
}
