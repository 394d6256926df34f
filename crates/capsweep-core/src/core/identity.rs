use super::combination::CombinationName;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Number of decimal places a capacity carries into a run identity.
pub const CAPACITY_PRECISION: usize = 2;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum IdentityError {
    #[error("Mode cannot be empty")]
    EmptyMode,

    #[error("Mode '{0}' contains a path separator or whitespace")]
    InvalidMode(String),

    #[error("Capacity must be finite and non-negative, got {0}")]
    InvalidCapacity(String),
}

/// Deterministic name of a sweep point: `MOD_<mode>_<combination>_<bandwidth>M_<capacity>`.
///
/// Used verbatim as the output directory name, the archive base name, and the
/// identity field of the materialized run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunIdentity(String);

impl RunIdentity {
    pub fn new(
        mode: &str,
        combination: CombinationName,
        bandwidth_mhz: u32,
        capacity: f64,
    ) -> Result<Self, IdentityError> {
        validate_mode(mode)?;
        if !capacity.is_finite() || capacity < 0.0 {
            return Err(IdentityError::InvalidCapacity(capacity.to_string()));
        }
        Ok(Self(format!(
            "MOD_{}_{}_{}M_{}",
            mode,
            combination,
            bandwidth_mhz,
            format_capacity(capacity)
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}.tar", self.0)
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for RunIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for RunIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

pub fn format_capacity(capacity: f64) -> String {
    format!("{:.*}", CAPACITY_PRECISION, capacity)
}

pub fn validate_mode(mode: &str) -> Result<(), IdentityError> {
    if mode.is_empty() {
        return Err(IdentityError::EmptyMode);
    }
    if mode.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace()) {
        return Err(IdentityError::InvalidMode(mode.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identity_follows_naming_template() {
        let id = RunIdentity::new("DL_UPandLowSep", CombinationName::CuPlane, 20, 55.14).unwrap();
        assert_eq!(id.as_str(), "MOD_DL_UPandLowSep_CU-plane_20M_55.14");
        assert_eq!(
            id.archive_file_name(),
            "MOD_DL_UPandLowSep_CU-plane_20M_55.14.tar"
        );
    }

    #[test]
    fn capacity_is_rounded_to_two_decimals() {
        let id = RunIdentity::new("DL", CombinationName::CPlane, 20, 55.18000000000001).unwrap();
        assert_eq!(id.as_str(), "MOD_DL_C-plane_20M_55.18");
        assert_eq!(format_capacity(7.0), "7.00");
    }

    #[test]
    fn identities_differ_when_any_component_differs() {
        let ids = [
            RunIdentity::new("DL", CombinationName::CuPlane, 20, 55.14),
            RunIdentity::new("UL", CombinationName::CuPlane, 20, 55.14),
            RunIdentity::new("DL", CombinationName::CPlane, 20, 55.14),
            RunIdentity::new("DL", CombinationName::CuPlane, 40, 55.14),
            RunIdentity::new("DL", CombinationName::CuPlane, 20, 55.15),
            RunIdentity::new("DL_CU", CombinationName::CPlane, 20, 55.14),
        ];
        let unique: HashSet<_> = ids.iter().map(|id| id.clone().unwrap()).collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn capacities_below_precision_collapse() {
        let a = RunIdentity::new("DL", CombinationName::CuPlane, 20, 55.141).unwrap();
        let b = RunIdentity::new("DL", CombinationName::CuPlane, 20, 55.142).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_components_are_rejected() {
        assert_eq!(
            RunIdentity::new("", CombinationName::CuPlane, 20, 1.0),
            Err(IdentityError::EmptyMode)
        );
        assert_eq!(
            RunIdentity::new("../etc", CombinationName::CuPlane, 20, 1.0),
            Err(IdentityError::InvalidMode("../etc".to_string()))
        );
        assert!(matches!(
            RunIdentity::new("DL", CombinationName::CuPlane, 20, f64::NAN),
            Err(IdentityError::InvalidCapacity(_))
        ));
        assert!(matches!(
            RunIdentity::new("DL", CombinationName::CuPlane, 20, -1.0),
            Err(IdentityError::InvalidCapacity(_))
        ));
    }
}
