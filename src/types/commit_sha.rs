// ABOUTME: Abbreviated git commit hash used as the image version tag.
// ABOUTME: Validated as lowercase hex so it is always a legal image tag.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitShaError {
    #[error("commit hash must be 4 to 40 characters, got {0}")]
    Length(usize),

    #[error("invalid character in commit hash: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitSha(String);

impl CommitSha {
    pub fn new(value: &str) -> Result<Self, CommitShaError> {
        let value = value.trim();
        if !(4..=40).contains(&value.len()) {
            return Err(CommitShaError::Length(value.len()));
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_digit() && !('a'..='f').contains(c))
        {
            return Err(CommitShaError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
