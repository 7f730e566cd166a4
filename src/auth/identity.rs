use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable principal identifier (the directory's `uid`). Never
/// parsed, only compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Identity {
    fn from(uid: String) -> Self {
        Self(uid)
    }
}

impl From<&str> for Identity {
    fn from(uid: &str) -> Self {
        Self(uid.to_string())
    }
}
