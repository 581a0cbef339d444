//! Version parsing and constraint handling.
//!
//! Versions are dot-separated token sequences, not semver: the scientific
//! software corpus uses calendar versions (`2021.05`), letter suffixes
//! (`1.2.3b1`) and short forms (`1.3`) freely. Each segment is broken into
//! numeric and alphabetic runs; numeric runs compare numerically, alphabetic
//! runs lexicographically, and a numeric run orders after an alphabetic one
//! at the same position. A version that extends another with equal prefix
//! orders after it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{QuarryError, Result};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Component {
    // Declaration order matters: derived Ord sorts Alpha below Num.
    Alpha(String),
    Num(u64),
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Alpha(s) => write!(f, "{s}"),
            Component::Num(n) => write!(f, "{n}"),
        }
    }
}

/// An immutable, ordered package version.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<Component>,
    raw: String,
}

impl Version {
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(QuarryError::Version("empty version string".to_string()));
        }

        let mut components = Vec::new();
        for piece in raw.split(['.', '-', '_']) {
            if piece.is_empty() {
                return Err(QuarryError::Version(format!(
                    "invalid version '{raw}': empty segment"
                )));
            }
            let mut rest = piece;
            while !rest.is_empty() {
                let first = rest.chars().next().unwrap();
                if first.is_ascii_digit() {
                    let end = rest
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(rest.len());
                    let (run, tail) = rest.split_at(end);
                    let value: u64 = run.parse().map_err(|_| {
                        QuarryError::Version(format!(
                            "invalid version '{raw}': numeric segment '{run}' out of range"
                        ))
                    })?;
                    components.push(Component::Num(value));
                    rest = tail;
                } else if first.is_ascii_alphabetic() {
                    let end = rest
                        .find(|c: char| !c.is_ascii_alphabetic())
                        .unwrap_or(rest.len());
                    let (run, tail) = rest.split_at(end);
                    components.push(Component::Alpha(run.to_ascii_lowercase()));
                    rest = tail;
                } else {
                    return Err(QuarryError::Version(format!(
                        "invalid version '{raw}': unexpected character '{first}'"
                    )));
                }
            }
        }

        Ok(Self {
            components,
            raw: raw.to_string(),
        })
    }

    /// The version string exactly as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Version {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// Equality and ordering are semantic (over components), not textual:
// "1.02" and "1.2" denote the same version.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.components.iter().zip(other.components.iter()) {
            match a.cmp(b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        self.components.len().cmp(&other.components.len())
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Version constraint operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Any version satisfies
    Any,
    /// Exactly equal to version
    Exact(Version),
    /// Greater than or equal to version
    AtLeast(Version),
    /// Less than or equal to version
    AtMost(Version),
    /// Inclusive range
    Range(Version, Version),
}

impl Default for VersionConstraint {
    fn default() -> Self {
        VersionConstraint::Any
    }
}

impl VersionConstraint {
    /// Check if a version satisfies this constraint.
    pub fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Any => true,
            VersionConstraint::Exact(v) => version == v,
            VersionConstraint::AtLeast(v) => version >= v,
            VersionConstraint::AtMost(v) => version <= v,
            VersionConstraint::Range(lo, hi) => version >= lo && version <= hi,
        }
    }

    /// Parse a constraint from a string like ">=1.2.3", "=0.4.0",
    /// "<=2.0" or ">=1.0,<=2.0". Empty or "*" means any version.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(VersionConstraint::Any);
        }

        if s.contains(',') {
            let parts: Vec<&str> = s.split(',').collect();
            if parts.len() != 2 {
                return Err(QuarryError::Version(format!(
                    "invalid constraint '{s}': expected exactly two range bounds"
                )));
            }
            let a = Self::parse_simple(parts[0])?;
            let b = Self::parse_simple(parts[1])?;
            return match (a, b) {
                (VersionConstraint::AtLeast(lo), VersionConstraint::AtMost(hi))
                | (VersionConstraint::AtMost(hi), VersionConstraint::AtLeast(lo)) => {
                    if lo > hi {
                        Err(QuarryError::Version(format!(
                            "invalid constraint '{s}': empty range"
                        )))
                    } else {
                        Ok(VersionConstraint::Range(lo, hi))
                    }
                }
                _ => Err(QuarryError::Version(format!(
                    "invalid constraint '{s}': a range needs one '>=' and one '<=' bound"
                ))),
            };
        }

        Self::parse_simple(s)
    }

    fn parse_simple(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix(">=") {
            return Ok(VersionConstraint::AtLeast(Version::parse(rest)?));
        }
        if let Some(rest) = s.strip_prefix("<=") {
            return Ok(VersionConstraint::AtMost(Version::parse(rest)?));
        }
        if let Some(rest) = s.strip_prefix('=') {
            return Ok(VersionConstraint::Exact(Version::parse(rest)?));
        }
        // No operator, just a version: exact match
        Ok(VersionConstraint::Exact(Version::parse(s)?))
    }

    fn low(&self) -> Option<&Version> {
        match self {
            VersionConstraint::AtLeast(v) | VersionConstraint::Range(v, _) => Some(v),
            _ => None,
        }
    }

    fn high(&self) -> Option<&Version> {
        match self {
            VersionConstraint::AtMost(v) | VersionConstraint::Range(_, v) => Some(v),
            _ => None,
        }
    }

    /// The implied floor, if this constraint has one.
    pub fn floor(&self) -> Option<&Version> {
        self.low()
    }

    /// Intersect two constraints into the constraint satisfied by exactly
    /// the versions both accept, or `None` when they are disjoint.
    pub fn intersect(&self, other: &VersionConstraint) -> Option<VersionConstraint> {
        match (self, other) {
            (VersionConstraint::Any, c) | (c, VersionConstraint::Any) => Some(c.clone()),
            (VersionConstraint::Exact(a), VersionConstraint::Exact(b)) => {
                (a == b).then(|| VersionConstraint::Exact(a.clone()))
            }
            (VersionConstraint::Exact(a), c) | (c, VersionConstraint::Exact(a)) => {
                c.satisfies(a).then(|| VersionConstraint::Exact(a.clone()))
            }
            (a, b) => {
                let lo = match (a.low(), b.low()) {
                    (Some(x), Some(y)) => Some(x.max(y)),
                    (x, y) => x.or(y),
                };
                let hi = match (a.high(), b.high()) {
                    (Some(x), Some(y)) => Some(x.min(y)),
                    (x, y) => x.or(y),
                };
                match (lo, hi) {
                    (Some(l), Some(h)) if l > h => None,
                    (Some(l), Some(h)) if l == h => Some(VersionConstraint::Exact(l.clone())),
                    (Some(l), Some(h)) => Some(VersionConstraint::Range(l.clone(), h.clone())),
                    (Some(l), None) => Some(VersionConstraint::AtLeast(l.clone())),
                    (None, Some(h)) => Some(VersionConstraint::AtMost(h.clone())),
                    (None, None) => Some(VersionConstraint::Any),
                }
            }
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Any => write!(f, "*"),
            VersionConstraint::Exact(v) => write!(f, "={v}"),
            VersionConstraint::AtLeast(v) => write!(f, ">={v}"),
            VersionConstraint::AtMost(v) => write!(f, "<={v}"),
            VersionConstraint::Range(lo, hi) => write!(f, ">={lo},<={hi}"),
        }
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionConstraint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        VersionConstraint::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(v("1.2.3"), v("1.2.3"));
        assert_eq!(v("1.02"), v("1.2"));
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("1.2+x").is_err());
        // calendar and suffixed forms from the recipe corpus
        assert!(Version::parse("2021.05").is_ok());
        assert!(Version::parse("1.2.3b1").is_ok());
        assert!(Version::parse("2024-03-11").is_ok());
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("1.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.1"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("2.0") > v("1.99.99"));
        // alphabetic runs order below numeric ones at the same position
        assert!(v("1.2.rc1") < v("1.2.0"));
        // an extension with equal prefix orders after the base
        assert!(v("1.2.3") < v("1.2.3b1"));
        assert!(v("1.2.3a") < v("1.2.3b"));
    }

    #[test]
    fn test_constraint_parse() {
        assert_eq!(VersionConstraint::parse("").unwrap(), VersionConstraint::Any);
        assert_eq!(VersionConstraint::parse("*").unwrap(), VersionConstraint::Any);
        assert_eq!(
            VersionConstraint::parse(">=3.5.1").unwrap(),
            VersionConstraint::AtLeast(v("3.5.1"))
        );
        assert_eq!(
            VersionConstraint::parse("=0.4.0").unwrap(),
            VersionConstraint::Exact(v("0.4.0"))
        );
        assert_eq!(
            VersionConstraint::parse("1.14").unwrap(),
            VersionConstraint::Exact(v("1.14"))
        );
        assert_eq!(
            VersionConstraint::parse(">=1.0,<=2.0").unwrap(),
            VersionConstraint::Range(v("1.0"), v("2.0"))
        );
        assert!(VersionConstraint::parse(">=2.0,<=1.0").is_err());
        assert!(VersionConstraint::parse(">=1.0,>=2.0").is_err());
    }

    #[test]
    fn test_constraint_satisfies() {
        let c = VersionConstraint::parse(">=1.5").unwrap();
        assert!(c.satisfies(&v("1.5")));
        assert!(c.satisfies(&v("2.0")));
        assert!(!c.satisfies(&v("1.4.9")));

        let r = VersionConstraint::parse(">=1.0,<=2.0").unwrap();
        assert!(r.satisfies(&v("1.0")));
        assert!(r.satisfies(&v("2.0")));
        assert!(!r.satisfies(&v("2.0.1")));
    }

    #[test]
    fn test_constraint_intersect() {
        let ge10 = VersionConstraint::parse(">=1.0").unwrap();
        let eq12 = VersionConstraint::parse("=1.2").unwrap();
        let le20 = VersionConstraint::parse("<=2.0").unwrap();

        assert_eq!(ge10.intersect(&eq12), Some(eq12.clone()));
        assert_eq!(
            ge10.intersect(&le20),
            Some(VersionConstraint::Range(v("1.0"), v("2.0")))
        );
        assert_eq!(VersionConstraint::Any.intersect(&ge10), Some(ge10.clone()));

        // disjoint
        let eq09 = VersionConstraint::parse("=0.9").unwrap();
        assert_eq!(ge10.intersect(&eq09), None);
        let ge30 = VersionConstraint::parse(">=3.0").unwrap();
        assert_eq!(le20.intersect(&ge30), None);

        // touching bounds collapse to an exact pin
        let ge20 = VersionConstraint::parse(">=2.0").unwrap();
        assert_eq!(
            le20.intersect(&ge20),
            Some(VersionConstraint::Exact(v("2.0")))
        );

        // intersection is idempotent, which resolution restarts rely on
        assert_eq!(ge10.intersect(&ge10), Some(ge10.clone()));
    }
}
