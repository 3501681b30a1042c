use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BumpKind {
    #[default]
    Patch,
    Minor,
    Major,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a valid increment type, choose one of patch, minor, major")]
pub struct InvalidBumpKind(pub String);

impl FromStr for BumpKind {
    type Err = InvalidBumpKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patch" => Ok(Self::Patch),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            other => Err(InvalidBumpKind(other.to_string())),
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// Bumps a `MAJOR.MINOR.PATCH` string.
///
/// Each segment counts as its leading digits (0 without any). Missing
/// segments are filled with 0 and anything past the third is kept as is.
pub fn increment(version: &str, kind: BumpKind) -> String {
    let mut parts: Vec<String> = version.split('.').map(str::to_string).collect();
    while parts.len() < 3 {
        parts.push("0".to_string());
    }

    let (major, minor, patch) = (
        leading_number(&parts[0]),
        leading_number(&parts[1]),
        leading_number(&parts[2]),
    );

    let (major, minor, patch) = match kind {
        BumpKind::Patch => (major, minor, patch.saturating_add(1)),
        BumpKind::Minor => (major, minor.saturating_add(1), 0),
        BumpKind::Major => (major.saturating_add(1), 0, 0),
    };

    parts[0] = major.to_string();
    parts[1] = minor.to_string();
    parts[2] = patch.to_string();
    parts.join(".")
}

/// Value of the leading digit run (`3-rc1` is 3), 0 without one
fn leading_number(part: &str) -> u64 {
    let part = part.trim_start();
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    match &part[..end] {
        "" => 0,
        digits => digits.parse().unwrap_or(u64::MAX),
    }
}

/// String-typed front door used by the CLI: rejects unknown kinds
pub fn increment_str(version: &str, kind: &str) -> Result<String, InvalidBumpKind> {
    Ok(increment(version, kind.parse()?))
}
