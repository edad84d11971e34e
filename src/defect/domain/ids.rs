//! Identifier types for the defect domain.
//!
//! All entity identifiers are positive integers assigned by the relational
//! store. Raw identifiers arriving from the request layer are parsed here so
//! that malformed input is rejected before any transaction is opened.

use super::DefectDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Field name used when reporting validation failures.
            pub const FIELD: &'static str = $field;

            /// Creates a validated identifier.
            ///
            /// # Errors
            ///
            /// Returns [`DefectDomainError::NonPositiveIdentifier`] when the
            /// value is zero or negative.
            pub const fn new(value: i64) -> Result<Self, DefectDomainError> {
                if value <= 0 {
                    return Err(DefectDomainError::NonPositiveIdentifier {
                        field: $field,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Parses an identifier supplied as free text by the caller.
            ///
            /// # Errors
            ///
            /// Returns [`DefectDomainError::MissingIdentifier`] for blank
            /// input, [`DefectDomainError::MalformedIdentifier`] for
            /// non-numeric input, and
            /// [`DefectDomainError::NonPositiveIdentifier`] for values below
            /// one.
            pub fn parse(raw: &str) -> Result<Self, DefectDomainError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(DefectDomainError::MissingIdentifier($field));
                }
                let value = trimmed.parse::<i64>().map_err(|_| {
                    DefectDomainError::MalformedIdentifier {
                        field: $field,
                        value: raw.to_owned(),
                    }
                })?;
                Self::new(value)
            }

            /// Parses an optional raw identifier, treating `None` as missing.
            ///
            /// # Errors
            ///
            /// Returns the same errors as [`Self::parse`], plus
            /// [`DefectDomainError::MissingIdentifier`] for `None`.
            pub fn parse_required(raw: Option<&str>) -> Result<Self, DefectDomainError> {
                raw.map_or(Err(DefectDomainError::MissingIdentifier($field)), Self::parse)
            }

            /// Returns the underlying numeric value.
            #[must_use]
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id!(
    /// Identifier of a reported defect.
    DefectId,
    "defect_id"
);

integer_id!(
    /// Identifier of a user who acts on or is assigned to defects.
    UserId,
    "user_id"
);

integer_id!(
    /// Identifier of a contracting company.
    ContractorId,
    "contractor_id"
);

integer_id!(
    /// Identifier of the project a defect belongs to.
    ProjectId,
    "project_id"
);
