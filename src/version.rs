use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// `uv X.Y.Z`, optionally followed by build metadata such as `(0b2357294 2025-07-17)`.
const VERSION_PATTERN: &str = r"^uv\s+(\d+)\.(\d+)\.(\d+)(?:\s+\([^()]*\))?$";

fn version_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(VERSION_PATTERN).expect("version pattern is valid"))
}

/// Version reported by `uv --version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UvVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl UvVersion {
    /// Parse the output of `uv --version`. Returns `None` when the output does
    /// not look like a uv version line.
    pub fn parse(output: &str) -> Option<Self> {
        let captures = version_regex().captures(output.trim())?;
        Some(Self {
            major: captures[1].parse().ok()?,
            minor: captures[2].parse().ok()?,
            patch: captures[3].parse().ok()?,
        })
    }
}

impl fmt::Display for UvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
