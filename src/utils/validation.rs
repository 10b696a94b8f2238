use crate::utils::error::{MockLocationError, Result};
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(MockLocationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MockLocationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Rejects empty lists and lists with repeated entries.
pub fn validate_unique_non_empty<T: Eq + Hash + Display>(field_name: &str, items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(MockLocationError::ConfigValidationError {
            field: field_name.to_string(),
            message: "At least one entry is required".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item) {
            return Err(MockLocationError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: item.to_string(),
                reason: "Duplicate entry".to_string(),
            });
        }
    }
    Ok(())
}
