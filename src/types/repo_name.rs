// ABOUTME: Source repository name validation.
// ABOUTME: Names double as working-copy directory names and image names.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoNameError {
    #[error("repository name cannot be empty")]
    Empty,

    #[error("repository name exceeds maximum length of 100 characters")]
    TooLong,

    #[error("repository name cannot start with '{0}'")]
    InvalidStart(char),

    #[error("repository name cannot end with '{0}'")]
    InvalidEnd(char),

    #[error("invalid character in repository name: '{0}'")]
    InvalidChar(char),

    #[error("invalid separator '{0}' in repository name")]
    InvalidSeparator(String),
}

/// A repository name as reported by the source host, e.g. `Shop-API`.
///
/// Lowercased, it must be a valid image path component: alphanumeric runs
/// joined by `.`, `_`, `__` or any number of `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoName(String);

impl RepoName {
    pub fn new(value: &str) -> Result<Self, RepoNameError> {
        let Some(first) = value.chars().next() else {
            return Err(RepoNameError::Empty);
        };

        if value.len() > 100 {
            return Err(RepoNameError::TooLong);
        }

        if matches!(first, '.' | '-' | '_') {
            return Err(RepoNameError::InvalidStart(first));
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_') {
                return Err(RepoNameError::InvalidChar(c));
            }
        }

        if let Some(last) = value.chars().last().filter(|c| !c.is_ascii_alphanumeric()) {
            return Err(RepoNameError::InvalidEnd(last));
        }

        let separators = value
            .split(|c: char| c.is_ascii_alphanumeric())
            .filter(|run| !run.is_empty());
        for run in separators {
            let allowed = matches!(run, "." | "_" | "__") || run.chars().all(|c| c == '-');
            if !allowed {
                return Err(RepoNameError::InvalidSeparator(run.to_string()));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Image repositories must be lowercase.
    pub fn image_name(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RepoName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
