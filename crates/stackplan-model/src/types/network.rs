use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cidr::Ipv4Cidr;
use crate::id::ResourceId;
use crate::reference::Reference;

/// Whether a subnet routes directly to the internet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    Public,
    Private,
}

impl fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Private => f.write_str("private"),
        }
    }
}

/// One subnet group to carve out of an explicit network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SubnetGroupRequest {
    pub name: String,
    pub kind: SubnetKind,
    /// Prefix length of each subnet in the group; split evenly when unset
    #[serde(default)]
    pub cidr_mask: Option<u8>,
}

impl SubnetGroupRequest {
    pub fn new(name: impl Into<String>, kind: SubnetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            cidr_mask: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_mask(mut self, mask: u8) -> Self {
        self.cidr_mask = Some(mask);
        self
    }

    /// One public and one private group, evenly split
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("public", SubnetKind::Public),
            Self::new("private", SubnetKind::Private),
        ]
    }
}

/// Declarative network input
///
/// Exactly one of `cidr` and `lookup_key` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NetworkRequest {
    pub id: String,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub lookup_key: Option<String>,
    #[serde(default = "NetworkRequest::default_max_azs")]
    pub max_azs: u8,
    #[serde(default = "SubnetGroupRequest::defaults")]
    pub subnet_groups: Vec<SubnetGroupRequest>,
}

impl NetworkRequest {
    pub const DEFAULT_MAX_AZS: u8 = 2;

    fn default_max_azs() -> u8 {
        Self::DEFAULT_MAX_AZS
    }

    /// New network carved from an explicit CIDR block
    pub fn with_cidr(id: impl Into<String>, cidr: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cidr: Some(cidr.into()),
            lookup_key: None,
            max_azs: Self::DEFAULT_MAX_AZS,
            subnet_groups: SubnetGroupRequest::defaults(),
        }
    }

    /// Existing network resolved at apply time
    pub fn with_lookup(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cidr: None,
            lookup_key: Some(key.into()),
            max_azs: Self::DEFAULT_MAX_AZS,
            subnet_groups: SubnetGroupRequest::defaults(),
        }
    }

    #[inline]
    #[must_use]
    pub fn max_azs(mut self, count: u8) -> Self {
        self.max_azs = count;
        self
    }

    #[inline]
    #[must_use]
    pub fn subnet_groups(mut self, groups: Vec<SubnetGroupRequest>) -> Self {
        self.subnet_groups = groups;
        self
    }
}

/// A carved subnet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Subnet {
    pub group: String,
    pub kind: SubnetKind,
    pub az_index: u8,
    pub cidr: Ipv4Cidr,
}

/// Subnets of an explicit network, partitioned by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct SubnetLayout {
    pub public: Vec<Subnet>,
    pub private: Vec<Subnet>,
}

impl SubnetLayout {
    #[must_use]
    pub fn of_kind(&self, kind: SubnetKind) -> &[Subnet] {
        match kind {
            SubnetKind::Public => &self.public,
            SubnetKind::Private => &self.private,
        }
    }

    /// Whether a subnet of `kind` exists in availability zone `az_index`
    #[must_use]
    pub fn covers(&self, kind: SubnetKind, az_index: u8) -> bool {
        self.of_kind(kind).iter().any(|s| s.az_index == az_index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subnet> {
        self.public.iter().chain(self.private.iter())
    }
}

/// How the network comes into being
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NetworkSource {
    /// Created by the plan from an address block
    Explicit { cidr: Ipv4Cidr, subnets: SubnetLayout },
    /// Existing network, resolved by the apply-time collaborator
    Lookup { reference: Reference },
}

/// An isolated address space with public/private subnet partitions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Network {
    pub id: ResourceId,
    pub source: NetworkSource,
    pub max_azs: u8,
}

impl Network {
    /// Subnet layout, known only for explicit networks
    #[must_use]
    pub fn subnets(&self) -> Option<&SubnetLayout> {
        match &self.source {
            NetworkSource::Explicit { subnets, .. } => Some(subnets),
            NetworkSource::Lookup { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(self.source, NetworkSource::Lookup { .. })
    }
}
