//! IPv4 CIDR blocks

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// An IPv4 network address with a prefix length
///
/// Host bits must be zero: `10.0.0.1/24` is rejected rather than silently
/// truncated to `10.0.0.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Create a block from a network address and prefix length
    ///
    /// # Errors
    /// Returns [`ConfigError::MalformedCidr`] if the prefix exceeds 32 or the
    /// address has host bits set.
    pub fn new(network: Ipv4Addr, prefix: u8) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedCidr {
            value: format!("{network}/{prefix}"),
            reason: reason.to_string(),
        };

        if prefix > 32 {
            return Err(malformed("prefix length must be at most 32"));
        }
        if u32::from(network) & !Self::mask(prefix) != 0 {
            return Err(malformed("address has host bits set"));
        }
        Ok(Self { network, prefix })
    }

    #[inline]
    #[must_use]
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    #[inline]
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of addresses in the block
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix))
    }

    /// First address as an integer
    #[inline]
    #[must_use]
    pub fn first(&self) -> u64 {
        u64::from(u32::from(self.network))
    }

    /// One past the last address as an integer
    #[inline]
    #[must_use]
    pub fn end(&self) -> u64 {
        self.first() + self.size()
    }

    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.first() <= other.first() && other.end() <= self.end()
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.first() < other.end() && other.first() < self.end()
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        }
    }
}

impl FromStr for Ipv4Cidr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ConfigError::MalformedCidr {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| malformed("expected <address>/<prefix>"))?;
        let network: Ipv4Addr = addr
            .parse()
            .map_err(|_| malformed("invalid IPv4 address"))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| malformed("invalid prefix length"))?;

        Self::new(network, prefix).map_err(|e| match e {
            ConfigError::MalformedCidr { reason, .. } => malformed(&reason),
            other => other,
        })
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl JsonSchema for Ipv4Cidr {
    fn schema_name() -> String {
        "Ipv4Cidr".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}
