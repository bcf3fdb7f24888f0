//! Semantic-version ranges for package filters
//!
//! Range syntax:
//!
//! - alternatives are joined with `||`; any alternative may match
//! - within an alternative, comparators separated by whitespace or commas
//!   must all match
//! - a comparator is an optional operator (`=`, `==`, `!=`, `>`, `>=`, `<`,
//!   `<=`, `~`, `^`) followed by a version; no operator means equality
//! - `x`, `X` or `*` in any version position, or a missing position, is a
//!   wildcard: `1.2.x` matches every `1.2` patch release
//!
//! Artifact versions are read leniently: a leading `v` is ignored and
//! missing minor/patch numbers count as zero.

use crate::error::VersionRangeError;
use semver::Version;
use std::fmt;
use std::str::FromStr;

const OPERATORS: [(&str, Op); 9] = [
    (">=", Op::Ge),
    ("<=", Op::Le),
    ("==", Op::Eq),
    ("!=", Op::Ne),
    (">", Op::Gt),
    ("<", Op::Lt),
    ("=", Op::Eq),
    ("~", Op::Tilde),
    ("^", Op::Caret),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Tilde,
    Caret,
}

/// One constraint of an alternative
#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Eq(Version),
    Ne(Version),
    Gt(Version),
    Ge(Version),
    Lt(Version),
    Le(Version),
    /// Below the first or at/above the second
    Outside(Version, Version),
    Never,
}

impl Bound {
    fn admits(&self, v: &Version) -> bool {
        match self {
            Bound::Eq(b) => v == b,
            Bound::Ne(b) => v != b,
            Bound::Gt(b) => v > b,
            Bound::Ge(b) => v >= b,
            Bound::Lt(b) => v < b,
            Bound::Le(b) => v <= b,
            Bound::Outside(lo, hi) => v < lo || v >= hi,
            Bound::Never => false,
        }
    }
}

/// Version as written in a range, possibly with wildcards
#[derive(Debug, Clone)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    /// Set when all three numbers are present
    exact: Option<Version>,
}

impl Partial {
    fn parse(raw: &str) -> Result<Self, VersionRangeError> {
        let invalid = || VersionRangeError::InvalidVersion(raw.to_string());
        let text = raw.strip_prefix(['v', 'V']).unwrap_or(raw);

        if text.contains(['-', '+']) {
            let exact = Version::parse(text).map_err(|_| invalid())?;
            return Ok(Self {
                major: Some(exact.major),
                minor: Some(exact.minor),
                patch: Some(exact.patch),
                exact: Some(exact),
            });
        }

        let parts: Vec<&str> = text.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }

        let mut numbers = [None; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = match *part {
                "x" | "X" | "*" => None,
                n => Some(n.parse::<u64>().map_err(|_| invalid())?),
            };
        }
        // Anything after the first wildcard is a wildcard too
        if let Some(first) = numbers.iter().position(Option::is_none) {
            for slot in &mut numbers[first..] {
                *slot = None;
            }
        }

        let [major, minor, patch] = numbers;
        let exact = match (major, minor, patch) {
            (Some(ma), Some(mi), Some(pa)) => Some(Version::new(ma, mi, pa)),
            _ => None,
        };
        Ok(Self {
            major,
            minor,
            patch,
            exact,
        })
    }

    /// Lowest version the partial covers
    fn floor(&self) -> Version {
        Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        )
    }

    /// First version past a wildcard partial; `None` for exact or fully
    /// wildcarded partials
    fn ceiling(&self, comparator: &str) -> Result<Option<Version>, VersionRangeError> {
        Ok(match (self.major, self.minor, self.patch) {
            (Some(ma), None, _) => Some(Version::new(bump(ma, comparator)?, 0, 0)),
            (Some(ma), Some(mi), None) => Some(Version::new(ma, bump(mi, comparator)?, 0)),
            _ => None,
        })
    }

    fn bounds(&self, op: Op, comparator: &str) -> Result<Vec<Bound>, VersionRangeError> {
        let Some(major) = self.major else {
            return match op {
                Op::Eq => Ok(Vec::new()),
                Op::Ne => Ok(vec![Bound::Never]),
                _ => Err(VersionRangeError::WildcardOperator(comparator.to_string())),
            };
        };

        let floor = self.exact.clone().unwrap_or_else(|| self.floor());
        let bounds = match (op, &self.exact, self.ceiling(comparator)?) {
            (Op::Eq, Some(v), _) => vec![Bound::Eq(v.clone())],
            (Op::Eq, None, Some(ceil)) => vec![Bound::Ge(floor), Bound::Lt(ceil)],
            (Op::Ne, Some(v), _) => vec![Bound::Ne(v.clone())],
            (Op::Ne, None, Some(ceil)) => vec![Bound::Outside(floor, ceil)],
            (Op::Gt, Some(v), _) => vec![Bound::Gt(v.clone())],
            (Op::Gt, None, Some(ceil)) => vec![Bound::Ge(ceil)],
            (Op::Ge, _, _) => vec![Bound::Ge(floor)],
            (Op::Lt, _, _) => vec![Bound::Lt(floor)],
            (Op::Le, Some(v), _) => vec![Bound::Le(v.clone())],
            (Op::Le, None, Some(ceil)) => vec![Bound::Lt(ceil)],
            (Op::Tilde, _, _) => {
                let upper = match self.minor {
                    Some(minor) => Version::new(major, bump(minor, comparator)?, 0),
                    None => Version::new(bump(major, comparator)?, 0, 0),
                };
                vec![Bound::Ge(floor), Bound::Lt(upper)]
            }
            (Op::Caret, _, _) => {
                let upper = match (self.minor, self.patch) {
                    _ if major > 0 => Version::new(bump(major, comparator)?, 0, 0),
                    (None, _) => Version::new(1, 0, 0),
                    (Some(minor), _) if minor > 0 => Version::new(0, bump(minor, comparator)?, 0),
                    (Some(_), None) => Version::new(0, 1, 0),
                    (Some(_), Some(patch)) => Version::new(0, 0, bump(patch, comparator)?),
                };
                vec![Bound::Ge(floor), Bound::Lt(upper)]
            }
            // exact is None with a major present always yields a ceiling
            (_, None, None) => {
                return Err(VersionRangeError::InvalidVersion(comparator.to_string()))
            }
        };
        Ok(bounds)
    }
}

/// Next component value; a component at `u64::MAX` has no successor
fn bump(component: u64, comparator: &str) -> Result<u64, VersionRangeError> {
    component
        .checked_add(1)
        .ok_or_else(|| VersionRangeError::InvalidVersion(comparator.to_string()))
}

/// Parsed version range expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    source: String,
    alternatives: Vec<Vec<Bound>>,
}

impl VersionRange {
    pub fn parse(expr: &str) -> Result<Self, VersionRangeError> {
        if expr.trim().is_empty() {
            return Err(VersionRangeError::Empty);
        }

        let alternatives = expr
            .split("||")
            .map(parse_alternative)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: expr.trim().to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|bounds| bounds.iter().all(|b| b.admits(version)))
    }

    /// Match a version string as recorded on an artifact; unreadable
    /// versions never match
    pub fn matches_str(&self, version: &str) -> bool {
        parse_version(version).is_some_and(|v| self.matches(&v))
    }
}

impl FromStr for VersionRange {
    type Err = VersionRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_alternative(alt: &str) -> Result<Vec<Bound>, VersionRangeError> {
    let tokens: Vec<&str> = alt
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(VersionRangeError::Empty);
    }

    let mut bounds = Vec::new();
    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        // `>= 1.2.0` is written with a space after the operator
        let comparator = if OPERATORS.iter().any(|(sym, _)| *sym == token) {
            match iter.next() {
                Some(version) => format!("{token}{version}"),
                None => return Err(VersionRangeError::InvalidVersion(token.to_string())),
            }
        } else {
            token.to_string()
        };
        bounds.extend(parse_comparator(&comparator)?);
    }
    Ok(bounds)
}

fn parse_comparator(comparator: &str) -> Result<Vec<Bound>, VersionRangeError> {
    let (op, version) = OPERATORS
        .iter()
        .find_map(|(sym, op)| comparator.strip_prefix(*sym).map(|rest| (*op, rest)))
        .unwrap_or((Op::Eq, comparator));

    Partial::parse(version)?.bounds(op, comparator)
}

/// Lenient artifact version parse: `v1.2` reads as `1.2.0`
pub fn parse_version(raw: &str) -> Option<Version> {
    let text = raw.trim();
    let text = text.strip_prefix(['v', 'V']).unwrap_or(text);
    if text.is_empty() {
        return None;
    }
    if let Ok(v) = Version::parse(text) {
        return Some(v);
    }

    let split = text.find(['-', '+']).unwrap_or(text.len());
    let (core, suffix) = text.split_at(split);
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.parse::<u64>().is_err()) {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&format!("{}{}", parts.join("."), suffix)).ok()
}
