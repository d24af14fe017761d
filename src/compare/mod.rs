//! Equivalence between a desired and an observed configuration.
//!
//! Configuration-style bucket settings have no status enum to wait on; the
//! only way to know a change has landed is to fetch the configuration back
//! and compare it with what was submitted. The remote is free to reorder
//! lists, re-encode JSON and drop formatting, so comparisons go through
//! [`Equivalent`] rather than `==` on the raw values.
//!
//! | Setting    | Type                                | Equivalence                          |
//! |------------|-------------------------------------|--------------------------------------|
//! | Versioning | [`VersioningStatus`]                | plain equality                       |
//! | Policy     | [`policy::PolicyDocument`]          | parsed and normalized                |
//! | Lifecycle  | [`lifecycle::LifecycleConfiguration`] | rules sorted by id, nil-safe fields |

pub mod lifecycle;
pub mod policy;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use lifecycle::LifecycleConfiguration;
pub use policy::PolicyDocument;

/// Structural equivalence that ignores differences with no meaning to the remote.
///
/// Implementations must be reflexive and symmetric.
pub trait Equivalent {
    /// Whether `self` and `other` describe the same configuration.
    fn equivalent(&self, other: &Self) -> bool;
}

/// Bucket versioning state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersioningStatus {
    /// Versioning has never been enabled.
    Unversioned,
    /// New objects get a version id.
    Enabled,
    /// Versioning was enabled and is now paused.
    Suspended,
}

impl VersioningStatus {
    /// The label the remote uses for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            VersioningStatus::Unversioned => "Unversioned",
            VersioningStatus::Enabled => "Enabled",
            VersioningStatus::Suspended => "Suspended",
        }
    }

    /// Parse a remote label. An empty label means the bucket was never versioned.
    pub fn parse(label: &str) -> Result<Self, ProviderError> {
        match label {
            "" | "Unversioned" => Ok(VersioningStatus::Unversioned),
            "Enabled" => Ok(VersioningStatus::Enabled),
            "Suspended" => Ok(VersioningStatus::Suspended),
            other => Err(ProviderError::InvalidRequest(format!(
                "unknown versioning status {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for VersioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Equivalent for VersioningStatus {
    fn equivalent(&self, other: &Self) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioning_equivalence_is_equality() {
        assert!(VersioningStatus::Enabled.equivalent(&VersioningStatus::Enabled));
        assert!(!VersioningStatus::Enabled.equivalent(&VersioningStatus::Suspended));
    }

    #[test]
    fn test_versioning_labels() {
        assert_eq!(VersioningStatus::parse("").unwrap(), VersioningStatus::Unversioned);
        assert_eq!(VersioningStatus::parse("Suspended").unwrap(), VersioningStatus::Suspended);
        assert_eq!(VersioningStatus::Enabled.to_string(), "Enabled");
        assert!(matches!(
            VersioningStatus::parse("enabled"),
            Err(ProviderError::InvalidRequest(_))
        ));
    }
}
