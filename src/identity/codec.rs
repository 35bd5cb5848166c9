//! Identity codec implementation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Reserved separator between identity components
pub const DELIMITER: char = '#';

/// Encodes and decodes delimiter-joined composite identities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityCodec {
    delimiter: char,
}

impl Default for IdentityCodec {
    fn default() -> Self {
        Self {
            delimiter: DELIMITER,
        }
    }
}

impl IdentityCodec {
    /// Create a codec using the default `#` delimiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec using a custom delimiter
    pub fn with_delimiter(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// The reserved delimiter
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Join components into one opaque id
    pub fn encode<S: AsRef<str>>(&self, components: &[S]) -> Result<String> {
        if components.is_empty() {
            return Err(Error::InvalidComponent {
                index: 0,
                component: String::new(),
                reason: "identity needs at least one component".to_string(),
            });
        }

        for (index, component) in components.iter().enumerate() {
            self.check_component(index, component.as_ref())?;
        }

        let mut id = String::new();
        for (index, component) in components.iter().enumerate() {
            if index > 0 {
                id.push(self.delimiter);
            }
            id.push_str(component.as_ref());
        }
        Ok(id)
    }

    /// Split an id into exactly `expected_arity` components
    pub fn decode(&self, id: &str, expected_arity: usize) -> Result<ResourceIdentity> {
        let parts: Vec<&str> = id.split(self.delimiter).collect();
        if parts.len() != expected_arity {
            return Err(Error::MalformedIdentity {
                id: id.to_string(),
                expected: expected_arity,
                found: parts.len(),
            });
        }

        for (index, part) in parts.iter().enumerate() {
            self.check_component(index, part)?;
        }

        Ok(ResourceIdentity {
            components: parts.into_iter().map(String::from).collect(),
        })
    }

    /// Validate a single component against the codec contract
    pub fn check_component(&self, index: usize, component: &str) -> Result<()> {
        if component.is_empty() {
            return Err(Error::InvalidComponent {
                index,
                component: String::new(),
                reason: "component is empty".to_string(),
            });
        }
        if component.contains(self.delimiter) {
            return Err(Error::InvalidComponent {
                index,
                component: component.to_string(),
                reason: format!("contains reserved delimiter '{}'", self.delimiter),
            });
        }
        Ok(())
    }
}

/// Ordered components addressing one remote object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentity {
    components: Vec<String>,
}

impl ResourceIdentity {
    /// Build an identity, validating every component
    pub fn new<S: Into<String>>(components: impl IntoIterator<Item = S>) -> Result<Self> {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        IdentityCodec::default().encode(&components)?;
        Ok(Self { components })
    }

    /// Decode an id with the default codec
    pub fn parse(id: &str, expected_arity: usize) -> Result<Self> {
        IdentityCodec::default().decode(id, expected_arity)
    }

    /// Components in order
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Component at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(String::as_str)
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always false for a constructed identity
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The opaque id string
    pub fn encode(&self) -> String {
        self.components.join(&DELIMITER.to_string())
    }
}

impl std::fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}
