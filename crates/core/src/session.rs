use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier scoping submitted traces to one test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Use a caller-supplied token verbatim.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Random token.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// `<test name>-<uuid>`, readable in agent logs while staying unique.
    pub fn for_test(test_name: &str) -> Self {
        Self(format!("{test_name}-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}
