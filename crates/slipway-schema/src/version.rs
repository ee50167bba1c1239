use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error(
        "invalid orderable version: '{0}' \
         (expected X.Y.Z, X.Y.Z-rcN, X.Y.Z-M-gHASH, or X.Y.Z-rcN-M-gHASH)"
    )]
    Malformed(String),
    #[error("invalid version matcher: '{0}' (expected X.Y.Z with optional 'x' wildcards)")]
    MalformedMatcher(String),
}

/// Pre-release / post-release qualifier of an [`OrderableVersion`].
///
/// Variant declaration order encodes the total order within an equal
/// `major.minor.patch` triple, ascending:
///
/// ```text
/// rc snapshot (X.Y.Z-rcN-M-gHASH)
///   < release candidate (X.Y.Z-rcN)
///   < release (X.Y.Z)
///   < snapshot (X.Y.Z-M-gHASH)
/// ```
///
/// Within a variant, ordering is numeric on the candidate number, then the
/// commit distance, with the commit hash text as a final deterministic
/// tie-break so that the relation stays total and antisymmetric.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Qualifier {
    RcSnapshot { rc: u64, ahead: u64, commit: String },
    ReleaseCandidate { rc: u64 },
    Release,
    Snapshot { ahead: u64, commit: String },
}

/// A parsed orderable version.
///
/// Two equal input strings always parse to equal values, and the derived
/// ordering (numeric triple, then [`Qualifier`]) is a pure total order, so
/// parsed versions are safe to use in cache keys and range comparisons.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderableVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub qualifier: Qualifier,
}

impl OrderableVersion {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        input.parse()
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl FromStr for OrderableVersion {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionError::Malformed(input.to_owned());

        let (triple, rest) = match input.split_once('-') {
            Some((triple, rest)) => (triple, Some(rest)),
            None => (input, None),
        };

        let mut parts = triple.split('.');
        let major = parse_number(parts.next()).ok_or_else(malformed)?;
        let minor = parse_number(parts.next()).ok_or_else(malformed)?;
        let patch = parse_number(parts.next()).ok_or_else(malformed)?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        let qualifier = match rest {
            None => Qualifier::Release,
            Some(rest) => {
                let tokens: Vec<&str> = rest.split('-').collect();
                match tokens.as_slice() {
                    [rc] => Qualifier::ReleaseCandidate {
                        rc: parse_rc(rc).ok_or_else(malformed)?,
                    },
                    [ahead, commit] => Qualifier::Snapshot {
                        ahead: parse_number(Some(*ahead)).ok_or_else(malformed)?,
                        commit: parse_commit(commit).ok_or_else(malformed)?,
                    },
                    [rc, ahead, commit] => Qualifier::RcSnapshot {
                        rc: parse_rc(rc).ok_or_else(malformed)?,
                        ahead: parse_number(Some(*ahead)).ok_or_else(malformed)?,
                        commit: parse_commit(commit).ok_or_else(malformed)?,
                    },
                    _ => return Err(malformed()),
                }
            }
        };

        Ok(OrderableVersion {
            major,
            minor,
            patch,
            qualifier,
        })
    }
}

impl fmt::Display for OrderableVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        match &self.qualifier {
            Qualifier::Release => Ok(()),
            Qualifier::ReleaseCandidate { rc } => write!(f, "-rc{rc}"),
            Qualifier::Snapshot { ahead, commit } => write!(f, "-{ahead}-g{commit}"),
            Qualifier::RcSnapshot { rc, ahead, commit } => {
                write!(f, "-rc{rc}-{ahead}-g{commit}")
            }
        }
    }
}

fn parse_number(token: Option<&str>) -> Option<u64> {
    let token = token?;
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn parse_rc(token: &str) -> Option<u64> {
    parse_number(token.strip_prefix("rc"))
}

fn parse_commit(token: &str) -> Option<String> {
    let hash = token.strip_prefix('g')?;
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
        return None;
    }
    Some(hash.to_owned())
}

/// One segment of a maximum-version matcher: a literal number or an `x`
/// wildcard covering every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum Segment {
    Literal(u64),
    Wildcard,
}

/// A maximum-version expression such as `2.0.0` or `1.x.x`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionMatcher {
    segments: [Segment; 3],
}

impl VersionMatcher {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        input.parse()
    }

    fn has_wildcard(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    fn upper_bound(&self) -> (u64, u64, u64) {
        let bound = |s: Segment| match s {
            Segment::Literal(n) => n,
            Segment::Wildcard => u64::MAX,
        };
        (
            bound(self.segments[0]),
            bound(self.segments[1]),
            bound(self.segments[2]),
        )
    }

    /// Whether a concrete version's numeric triple falls inside this pattern.
    pub fn matches(&self, version: &OrderableVersion) -> bool {
        let actual = [version.major, version.minor, version.patch];
        self.segments
            .iter()
            .zip(actual)
            .all(|(segment, value)| match segment {
                Segment::Literal(n) => *n == value,
                Segment::Wildcard => true,
            })
    }

    /// Whether this matcher, used as a maximum bound, admits versions at or
    /// above `minimum`. Wildcard segments are treated as unbounded; a fully
    /// concrete matcher is compared under the full version grammar order.
    pub fn permits_at_or_above(&self, minimum: &OrderableVersion) -> bool {
        if self.has_wildcard() {
            return minimum.triple() <= self.upper_bound();
        }
        let (major, minor, patch) = self.upper_bound();
        let ceiling = OrderableVersion {
            major,
            minor,
            patch,
            qualifier: Qualifier::Release,
        };
        *minimum <= ceiling
    }
}

impl FromStr for VersionMatcher {
    type Err = VersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionError::MalformedMatcher(input.to_owned());
        let mut segments = [Segment::Wildcard; 3];
        let mut parts = input.split('.');
        for slot in &mut segments {
            let token = parts.next().ok_or_else(malformed)?;
            *slot = if token == "x" {
                Segment::Wildcard
            } else {
                Segment::Literal(parse_number(Some(token)).ok_or_else(malformed)?)
            };
        }
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(VersionMatcher { segments })
    }
}

impl fmt::Display for VersionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |s: Segment| match s {
            Segment::Literal(n) => n.to_string(),
            Segment::Wildcard => "x".to_owned(),
        };
        write!(
            f,
            "{}.{}.{}",
            render(self.segments[0]),
            render(self.segments[1]),
            render(self.segments[2])
        )
    }
}

/// Derive the default maximum version for a dependency: the next major
/// release after `minimum` (`1.2.3` becomes `2.0.0`). Returns `None` when
/// the minimum does not start with a numeric major component.
pub fn next_major(minimum: &str) -> Option<String> {
    let digits: String = minimum.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let major: u64 = digits.parse().ok()?;
    Some(format!("{}.0.0", major + 1))
}
