use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A value known at plan time, or a key resolved by the apply-time
/// collaborator
///
/// Plans are produced without network access, so anything that lives in an
/// external system (an existing network, a secret value) is carried as an
/// [`Reference::ExternalLookup`] token and never resolved here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Reference {
    Literal(String),
    ExternalLookup(String),
}

impl Reference {
    #[inline]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    #[inline]
    pub fn lookup(key: impl Into<String>) -> Self {
        Self::ExternalLookup(key.into())
    }

    /// Whether the value is already known without consulting an external
    /// system
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Literal value or lookup key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Literal(value) | Self::ExternalLookup(value) => value,
        }
    }
}
