//! Container image sources

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Recipe file expected in a local build context when none is named
pub const DEFAULT_BUILD_RECIPE: &str = "Dockerfile";

static REGISTRY_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?(?::[0-9]{1,5})?$")
        .expect("valid registry host regex")
});
static PATH_COMPONENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").expect("valid path component regex")
});
static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("valid tag regex"));
static DIGEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^sha256:[a-f0-9]{64}$").expect("valid digest regex"));

/// Why an image reference was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageReferenceError {
    #[error("image reference is empty")]
    Empty,

    #[error("image reference contains whitespace")]
    Whitespace,

    #[error("invalid registry host: {0}")]
    InvalidRegistry(String),

    #[error("invalid repository path: {0}")]
    InvalidRepository(String),

    #[error("invalid tag: {0}")]
    InvalidTag(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}

/// A parsed `[registry/]repository[:tag][@digest]` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageReference {
    registry: Option<String>,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    #[inline]
    #[must_use]
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    #[inline]
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

impl FromStr for ImageReference {
    type Err = ImageReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ImageReferenceError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ImageReferenceError::Whitespace);
        }

        let (name_and_tag, digest) = match s.split_once('@') {
            Some((name, digest)) => {
                if !DIGEST.is_match(digest) {
                    return Err(ImageReferenceError::InvalidDigest(digest.to_string()));
                }
                (name, Some(digest.to_string()))
            }
            None => (s, None),
        };

        // A colon after the last slash separates the tag; earlier colons
        // belong to a registry port.
        let (name, tag) = match name_and_tag.rfind(':') {
            Some(idx) if !name_and_tag[idx..].contains('/') => {
                let tag = &name_and_tag[idx + 1..];
                if !TAG.is_match(tag) {
                    return Err(ImageReferenceError::InvalidTag(tag.to_string()));
                }
                (&name_and_tag[..idx], Some(tag.to_string()))
            }
            _ => (name_and_tag, None),
        };

        let mut components: Vec<&str> = name.split('/').collect();
        let registry = match components.first() {
            Some(first)
                if components.len() > 1
                    && (first.contains('.') || first.contains(':') || *first == "localhost") =>
            {
                if !REGISTRY_HOST.is_match(first) {
                    return Err(ImageReferenceError::InvalidRegistry((*first).to_string()));
                }
                let host = (*first).to_string();
                components.remove(0);
                Some(host)
            }
            _ => None,
        };

        if components.iter().any(|c| !PATH_COMPONENT.is_match(c)) {
            return Err(ImageReferenceError::InvalidRepository(name.to_string()));
        }

        Ok(Self {
            registry,
            repository: components.join("/"),
            tag,
            digest,
        })
    }
}

impl TryFrom<String> for ImageReference {
    type Error = ImageReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageReference> for String {
    fn from(value: ImageReference) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{registry}/")?;
        }
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl JsonSchema for ImageReference {
    fn schema_name() -> String {
        "ImageReference".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

/// A local directory holding a build recipe
///
/// Only its existence is checked at plan time; building and pushing the
/// image is the apply-time collaborator's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct BuildContext {
    pub directory: PathBuf,
    pub recipe: String,
}

/// Where a container image comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Registry { reference: ImageReference },
    LocalBuild(BuildContext),
}

impl ImageSource {
    #[inline]
    #[must_use]
    pub fn is_local_build(&self) -> bool {
        matches!(self, Self::LocalBuild(_))
    }
}
