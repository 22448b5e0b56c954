//! Newtype identifiers.
//!
//! Using newtypes prevents accidentally mixing up different identifier
//! kinds, e.g., passing a destination's transport id where a catalog
//! identifier is expected.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate newtype identifier structs.
macro_rules! define_id {
    ($name:ident) => {
        /// An opaque identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(DestinationId);
define_id!(MessageHandle);

/// The catalog's stable item identifier.
///
/// Always exactly 10 ASCII characters, uppercase letters or digits.
/// Construction validates the format; markup that yields anything else is
/// treated as not carrying an identifier at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asin(String);

impl Asin {
    /// Validate and wrap a catalog identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if Self::is_valid(&id) {
            Ok(Self(id))
        } else {
            Err(CoreError::InvalidIdentifier(id))
        }
    }

    /// Check whether a string matches the catalog identifier format.
    pub fn is_valid(s: &str) -> bool {
        s.len() == 10
            && s.bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
    }

    /// Extract an identifier from an item URL's `/dp/<id>` path segment.
    pub fn from_url(url: &str) -> Option<Self> {
        let start = url.find("/dp/")? + 4;
        let candidate = url.get(start..start + 10)?;
        Self::new(candidate).ok()
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Asin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Asin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asin_valid() {
        let asin = Asin::new("B0ABCD1234").unwrap();
        assert_eq!(asin.as_str(), "B0ABCD1234");
    }

    #[test]
    fn test_asin_rejects_bad_format() {
        assert!(Asin::new("").is_err());
        assert!(Asin::new("short").is_err());
        assert!(Asin::new("b0abcd1234").is_err()); // lowercase
        assert!(Asin::new("B0ABCD12345").is_err()); // too long
        assert!(Asin::new("B0ABCD-234").is_err()); // punctuation
    }

    #[test]
    fn test_asin_from_url() {
        let asin = Asin::from_url("https://example.com/dp/B0XYZ12345?ref=sr").unwrap();
        assert_eq!(asin.as_str(), "B0XYZ12345");

        assert!(Asin::from_url("https://example.com/gp/help").is_none());
        assert!(Asin::from_url("https://example.com/dp/short").is_none());
    }

    #[test]
    fn test_destination_id() {
        let id = DestinationId::new("-100123456");
        assert_eq!(id.as_str(), "-100123456");
        assert_eq!(format!("{}", id), "-100123456");
    }
}
