use std::fmt;
use std::str::FromStr;

use crate::error::BuildError;

/// The closed set of module variants a test can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKey {
    /// Default build, no optional features.
    Primary,
    /// Build with RUM injection compiled in.
    Extended,
}

impl VariantKey {
    pub const ALL: [VariantKey; 2] = [VariantKey::Primary, VariantKey::Extended];

    pub fn as_str(self) -> &'static str {
        match self {
            VariantKey::Primary => "primary",
            VariantKey::Extended => "extended",
        }
    }

    /// Human label used in build logs.
    pub fn label(self) -> &'static str {
        match self {
            VariantKey::Primary => "without RUM",
            VariantKey::Extended => "with RUM",
        }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantKey {
    type Err = BuildError;

    /// Accepts both the generic names and the `no_rum` / `rum` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "no_rum" => Ok(VariantKey::Primary),
            "extended" | "rum" => Ok(VariantKey::Extended),
            other => Err(BuildError::UnknownVariant(other.to_string())),
        }
    }
}
