//! Service naming primitives.
//!
//! Service names are the unique identifiers of catalog entries and double as
//! their on-disk file names, so the format is restricted to a DNS-style slug.
//!
//! # Example
//!
//! ```rust
//! use dashops_core::name::{normalize_name, ServiceName};
//!
//! let name = ServiceName::new("payment-api").unwrap();
//! assert_eq!(name.as_str(), "payment-api");
//! assert_eq!(normalize_name("Payment API"), "payment-api");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Minimum service name length.
pub const MIN_NAME_LEN: usize = 3;

/// Maximum service name length.
pub const MAX_NAME_LEN: usize = 100;

/// A validated service name.
///
/// Service names must be:
/// - Lowercase alphanumeric with hyphens (`[a-z0-9]([-a-z0-9]*[a-z0-9])?`)
/// - Between 3 and 100 characters
/// - Unique across the catalog (enforced by the controller, case-insensitively)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// Creates a new service name after validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid slug.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Creates a service name without validation.
    ///
    /// Intended for names that have already been validated (e.g., read back
    /// from storage, where the file name was derived from a valid slug).
    #[must_use]
    pub fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the storage file name for this service: `<name>.yaml`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.0)
    }

    /// Validates a service name string.
    fn validate(name: &str) -> Result<()> {
        if name.len() < MIN_NAME_LEN {
            return Err(Error::InvalidName {
                message: format!(
                    "service name '{name}' is too short (minimum {MIN_NAME_LEN} characters)"
                ),
            });
        }

        if name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidName {
                message: format!(
                    "service name '{name}' is too long (maximum {MAX_NAME_LEN} characters)"
                ),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::InvalidName {
                message: format!(
                    "service name '{name}' contains invalid characters (only lowercase letters, digits, and hyphens allowed)"
                ),
            });
        }

        if name.starts_with('-') || name.ends_with('-') {
            return Err(Error::InvalidName {
                message: format!("service name '{name}' cannot start or end with a hyphen"),
            });
        }

        Ok(())
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes arbitrary input into slug form.
///
/// Lower-cases the input, maps runs of whitespace, underscores, and any other
/// non-alphanumeric characters to single hyphens, and trims leading and
/// trailing hyphens. Empty input yields empty output; the result still has to
/// pass [`ServiceName::new`] (length bounds) before use.
#[must_use]
pub fn normalize_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_service_names() {
        assert!(ServiceName::new("payment-api").is_ok());
        assert!(ServiceName::new("cart").is_ok());
        assert!(ServiceName::new("svc2").is_ok());
        assert!(ServiceName::new("a1b").is_ok());
    }

    #[test]
    fn invalid_service_names() {
        assert!(ServiceName::new("").is_err());
        assert!(ServiceName::new("ab").is_err());
        assert!(ServiceName::new("UPPER").is_err());
        assert!(ServiceName::new("-leading").is_err());
        assert!(ServiceName::new("trailing-").is_err());
        assert!(ServiceName::new("has spaces").is_err());
        assert!(ServiceName::new("has_underscore").is_err());
        assert!(ServiceName::new(&"x".repeat(101)).is_err());
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize_name("Payment API"), "payment-api");
        assert_eq!(normalize_name("my__cool  service"), "my-cool-service");
        assert_eq!(normalize_name("--edge--"), "edge");
        assert_eq!(normalize_name("Already-Normal"), "already-normal");
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("!!!"), "");
    }

    #[test]
    fn file_name_appends_extension() {
        let name = ServiceName::new("cart").unwrap();
        assert_eq!(name.file_name(), "cart.yaml");
    }
}
