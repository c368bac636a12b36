//! npm version range parsing, matching, and version selection.
//!
//! npm ranges differ from Cargo requirements in a few ways that matter here:
//! - a bare version (`1.2.3`) is an exact match, not a caret requirement
//! - comparators within a set are separated by whitespace, not commas
//! - `||` joins alternative comparator sets
//! - hyphen ranges (`1.0.0 - 2.3`) and x-ranges (`1.x`, `1.2.*`) are allowed
//!
//! Each comparator set is rewritten into a [`semver::VersionReq`] and a range
//! matches when any of its alternatives does.

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use pcs_util::errors::{PcsError, PcsResult};

/// A parsed npm version range such as `^1.2.0 || >=3.0.0 <4`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for VersionRange {}

impl VersionRange {
    /// Parse an npm range expression.
    ///
    /// Non-semver specifiers (git URLs, `file:` paths, dist-tags) are rejected
    /// with [`PcsError::InvalidRange`].
    pub fn parse(spec: &str) -> PcsResult<Self> {
        let mut alternatives = Vec::new();
        for set in spec.split("||") {
            let req = comparator_set_to_req(set).map_err(|message| PcsError::InvalidRange {
                range: spec.to_string(),
                message,
            })?;
            alternatives.push(req);
        }
        Ok(Self {
            raw: spec.trim().to_string(),
            alternatives,
        })
    }

    /// A range matching every version.
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            alternatives: vec![VersionReq::STAR],
        }
    }

    /// Check if a version satisfies this range.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Pick the version `policy` prefers among the candidates satisfying this range.
    pub fn select<'a, I>(&self, policy: VersionPolicy, candidates: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        let satisfying = candidates.into_iter().filter(|v| self.matches(v));
        match policy {
            VersionPolicy::Latest => satisfying.max(),
            VersionPolicy::Lowest => satisfying.min(),
        }
    }

    /// The range text as written in the manifest.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionRange {
    type Err = PcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = PcsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.raw
    }
}

/// Which satisfying version to pick for a dependency range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Highest version satisfying the range (what `npm install` picks).
    #[default]
    Latest,
    /// Lowest version satisfying the range.
    Lowest,
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPolicy::Latest => f.write_str("latest"),
            VersionPolicy::Lowest => f.write_str("lowest"),
        }
    }
}

impl FromStr for VersionPolicy {
    type Err = PcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest" => Ok(VersionPolicy::Latest),
            "lowest" => Ok(VersionPolicy::Lowest),
            other => Err(PcsError::Config {
                message: format!("unknown version policy `{other}` (expected latest or lowest)"),
            }),
        }
    }
}

const OPERATOR_CHARS: &[char] = &['<', '>', '=', '~', '^'];

/// Rewrite one whitespace-separated npm comparator set as a `VersionReq`.
fn comparator_set_to_req(set: &str) -> Result<VersionReq, String> {
    let tokens = join_detached_operators(set.split_whitespace());

    let mut comparators: Vec<String> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens.get(i + 1).map(String::as_str) == Some("-") {
            let upper = tokens
                .get(i + 2)
                .ok_or_else(|| "hyphen range is missing its upper bound".to_string())?;
            comparators.extend(convert_comparator(&format!(">={}", tokens[i]))?);
            comparators.extend(convert_comparator(&format!("<={upper}"))?);
            i += 3;
            continue;
        }
        comparators.extend(convert_comparator(&tokens[i])?);
        i += 1;
    }

    if comparators.is_empty() {
        return Ok(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).map_err(|e| e.to_string())
}

/// npm allows `>= 1.2.3`; glue a lone operator to the version after it.
fn join_detached_operators<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in tokens {
        if token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            pending_op = Some(token);
            continue;
        }
        match pending_op.take() {
            Some(op) => out.push(format!("{op}{token}")),
            None => out.push(token.to_string()),
        }
    }
    if let Some(op) = pending_op {
        out.push(op.to_string());
    }
    out
}

/// Convert a single npm comparator into zero or one semver comparator.
///
/// Returns `None` for wildcards, which constrain nothing.
fn convert_comparator(token: &str) -> Result<Option<String>, String> {
    let split = token
        .find(|c: char| !OPERATOR_CHARS.contains(&c))
        .unwrap_or(token.len());
    let (op, rest) = token.split_at(split);
    let op = match op {
        "" | "=" | "==" => "=",
        "~>" => "~",
        ">=" | "<=" | ">" | "<" | "^" | "~" => op,
        other => return Err(format!("unsupported operator `{other}`")),
    };

    let rest = rest.strip_prefix('v').unwrap_or(rest);
    if rest.is_empty() {
        return Ok(None);
    }

    let mut parts: Vec<&str> = rest.splitn(3, '.').collect();
    if let Some(pos) = parts.iter().position(|p| is_wildcard(p)) {
        parts.truncate(pos);
    }
    if parts.is_empty() {
        return Ok(None);
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(format!("empty version component in `{token}`"));
    }
    Ok(Some(format!("{op}{}", parts.join("."))))
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}
