use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::DEFAULT_NAMESPACE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("empty namespace in identifier `{0}`")]
    EmptyNamespace(String),
    #[error("empty path in identifier `{0}`")]
    EmptyPath(String),
    #[error("invalid character `{ch}` in namespace of `{id}`")]
    InvalidNamespace { id: String, ch: char },
    #[error("invalid character `{ch}` in path of `{id}`")]
    InvalidPath { id: String, ch: char },
}

/// Namespaced resource location, written `<namespace>:<path>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    namespace: String,
    path: String,
}

impl Identifier {
    pub fn new(namespace: &str, path: &str) -> Result<Self, IdentifierError> {
        let display = format!("{namespace}:{path}");
        if namespace.is_empty() {
            return Err(IdentifierError::EmptyNamespace(display));
        }
        if path.is_empty() {
            return Err(IdentifierError::EmptyPath(display));
        }
        if let Some(ch) = namespace.chars().find(|c| !is_namespace_char(*c)) {
            return Err(IdentifierError::InvalidNamespace { id: display, ch });
        }
        if let Some(ch) = path.chars().find(|c| !is_path_char(*c)) {
            return Err(IdentifierError::InvalidPath { id: display, ch });
        }
        Ok(Self::new_unchecked(namespace, path))
    }

    /// Builds an identifier from parts already known to be valid (crate constants).
    pub(crate) fn new_unchecked(namespace: &str, path: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn strip_extension(&self, extension: &str) -> Option<Self> {
        let path = self.path.strip_suffix(extension)?;
        if path.is_empty() {
            return None;
        }
        Some(Self::new_unchecked(&self.namespace, path))
    }

    /// Drops a leading directory, `textures/foo/bar.png` with `textures/foo` gives `bar.png`.
    pub fn strip_path_prefix(&self, prefix: &str) -> Option<Self> {
        let rest = self.path.strip_prefix(prefix)?;
        let rest = rest.strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }
        Some(Self::new_unchecked(&self.namespace, rest))
    }

    pub fn is_under(&self, prefix: &str) -> bool {
        prefix.is_empty()
            || self
                .path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn is_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
}

fn is_path_char(c: char) -> bool {
    is_namespace_char(c) || c == '/'
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, s),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({self})")
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
