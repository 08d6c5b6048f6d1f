//! Tool version parsing and compatibility comparison.

use std::fmt;

/// Oldest tool version the extension can drive.
pub const MINIMUM_VERSION: ToolVersion = ToolVersion {
    major: 0,
    minor: 5,
    patch: 0,
};

/// Where to send the user when their tool is too old.
pub const DOWNLOAD_URL: &str = "https://www.chalet-work.space/download";

/// A semantic version triple. Field order gives derived ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ToolVersion {
    /// Parse a bare `X.Y.Z` triple. Pre-release/build suffixes after the
    /// patch number are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch_text = parts.next()?;
        let patch_end = patch_text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(patch_text.len());
        let patch = patch_text[..patch_end].parse().ok()?;
        Some(Self {
            major,
            minor,
            patch,
        })
    }

    /// Parse the tool's `--version` output. The third whitespace-separated
    /// token is the semantic version.
    pub fn from_version_output(output: &str) -> Option<Self> {
        Self::parse(output.split_whitespace().nth(2)?)
    }

    pub fn satisfies_minimum(&self) -> bool {
        *self >= MINIMUM_VERSION
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
