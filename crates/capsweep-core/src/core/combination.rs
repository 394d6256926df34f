use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ProfileParseError {
    #[error("Unknown combination name '{0}'. Expected 'CU-plane' or 'C-plane'.")]
    UnknownCombination(String),

    #[error("Invalid number '{token}' in {profile} profile")]
    InvalidNumber {
        profile: &'static str,
        token: String,
    },

    #[error("Marking/port profile must contain (port, value) pairs, found {0} token(s)")]
    UnpairedMarking(usize),

    #[error("{0} profile cannot be empty")]
    Empty(&'static str),
}

/// Stable names of the configuration combinations a sweep can run under.
///
/// The canonical names never contain `_`, which keeps run identities unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CombinationName {
    #[serde(rename = "CU-plane", alias = "cu-plane")]
    CuPlane,
    #[serde(rename = "C-plane", alias = "c-plane")]
    CPlane,
}

impl CombinationName {
    pub const ALL: [CombinationName; 2] = [CombinationName::CuPlane, CombinationName::CPlane];

    pub fn as_str(&self) -> &'static str {
        match self {
            CombinationName::CuPlane => "CU-plane",
            CombinationName::CPlane => "C-plane",
        }
    }
}

impl fmt::Display for CombinationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CombinationName {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ProfileParseError::UnknownCombination(trimmed.to_string()))
    }
}

/// Ordered traffic-class shares, e.g. `73 9 18`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightProfile(Vec<u32>);

impl WeightProfile {
    pub fn new(weights: Vec<u32>) -> Result<Self, ProfileParseError> {
        if weights.is_empty() {
            return Err(ProfileParseError::Empty("Weight"));
        }
        Ok(Self(weights))
    }

    pub fn weights(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for WeightProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for weight in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}", weight)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for WeightProfile {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let weights = s
            .split_whitespace()
            .map(|token| {
                token.parse().map_err(|_| ProfileParseError::InvalidNumber {
                    profile: "weight",
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<u32>, _>>()?;
        Self::new(weights)
    }
}

/// Ordered `(port, marking)` pairs, e.g. `8080 46 9090 46`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkingProfile(Vec<(u16, u8)>);

impl MarkingProfile {
    pub fn new(pairs: Vec<(u16, u8)>) -> Result<Self, ProfileParseError> {
        if pairs.is_empty() {
            return Err(ProfileParseError::Empty("Marking/port"));
        }
        Ok(Self(pairs))
    }

    pub fn pairs(&self) -> &[(u16, u8)] {
        &self.0
    }

    pub fn marking_for(&self, port: u16) -> Option<u8> {
        self.0.iter().find(|(p, _)| *p == port).map(|(_, m)| *m)
    }
}

impl fmt::Display for MarkingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (port, marking) in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{} {}", port, marking)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for MarkingProfile {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            return Err(ProfileParseError::UnpairedMarking(tokens.len()));
        }
        let invalid = |token: &str| ProfileParseError::InvalidNumber {
            profile: "marking/port",
            token: token.to_string(),
        };
        let pairs = tokens
            .chunks_exact(2)
            .map(|pair| {
                let port = pair[0].parse().map_err(|_| invalid(pair[0]))?;
                let marking = pair[1].parse().map_err(|_| invalid(pair[1]))?;
                Ok((port, marking))
            })
            .collect::<Result<Vec<_>, ProfileParseError>>()?;
        Self::new(pairs)
    }
}

/// A named bundle of non-swept configuration, selected once per sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Combination {
    pub name: CombinationName,
    pub weights: WeightProfile,
    pub marking: MarkingProfile,
}

impl Combination {
    pub fn new(name: CombinationName, weights: WeightProfile, marking: MarkingProfile) -> Self {
        Self {
            name,
            weights,
            marking,
        }
    }

    /// The built-in profile for a combination name.
    pub fn builtin(name: CombinationName) -> Self {
        let (weights, marking) = match name {
            CombinationName::CuPlane => (
                vec![73, 9, 18],
                vec![(8080, 46), (9090, 46), (10800, 8), (10900, 16), (11000, 24)],
            ),
            CombinationName::CPlane => (
                vec![25, 70, 5],
                vec![(8080, 8), (9090, 46), (10800, 8), (10900, 16), (11000, 24)],
            ),
        };
        Self {
            name,
            weights: WeightProfile(weights),
            marking: MarkingProfile(marking),
        }
    }
}
