// ABOUTME: Image tag parsing in the `namespace/image:tag` form.
// ABOUTME: Splits on the first slash and the last colon; a missing colon means no tag.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

/// Reference to a container image, e.g. `acme/shop:1a2b3c4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    namespace: Option<String>,
    name: String,
    tag: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_') {
                return Err(ParseImageRefError::InvalidChar(c));
            }
        }

        let (namespace, rest) = match input.split_once('/') {
            Some((namespace, rest)) => (Some(namespace), rest),
            None => (None, input),
        };

        let (name, tag) = match rest.rsplit_once(':') {
            Some((name, tag)) => (name, Some(tag)),
            None => (rest, None),
        };

        if name.is_empty()
            || namespace.is_some_and(str::is_empty)
            || tag.is_some_and(str::is_empty)
        {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        Ok(Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            tag: tag.map(str::to_string),
        })
    }

    /// Build a reference from already-validated parts.
    pub fn new(namespace: Option<&str>, name: &str, tag: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
            tag: tag.map(str::to_string),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The reference without its tag (`namespace/name`).
    pub fn repository(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}/{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether `other` names the same repository, ignoring tags.
    pub fn same_repository(&self, other: &ImageRef) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref namespace) = self.namespace {
            write!(f, "{}/", namespace)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        Ok(())
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
