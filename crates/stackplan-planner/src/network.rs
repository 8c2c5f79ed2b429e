//! Network Resolver
//!
//! Turns a [`NetworkRequest`] into a validated [`Network`]. Explicit networks
//! are carved into per-AZ subnets here; looked-up networks are left as an
//! unresolved [`Reference`] for the apply-time collaborator.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use stackplan_model::{
    ConfigError, Ipv4Cidr, Network, NetworkRequest, NetworkSource, Reference, ResourceId, Subnet,
    SubnetGroupRequest, SubnetKind, SubnetLayout,
};

/// Largest network the resolver carves (smallest prefix)
pub const MIN_NETWORK_PREFIX: u8 = 16;
/// Smallest block usable as a network or subnet
pub const MAX_SUBNET_PREFIX: u8 = 28;
/// Most availability zones a network may span
pub const MAX_AVAILABILITY_ZONES: u8 = 6;

/// Resolves network requests
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkResolver;

impl NetworkResolver {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate a request and produce a [`Network`]
    ///
    /// # Errors
    /// - [`ConfigError::AmbiguousNetworkSource`] unless exactly one of
    ///   `cidr` / `lookup_key` is set
    /// - [`ConfigError::MalformedCidr`] for unparsable or oversized blocks
    /// - [`ConfigError::CidrTooSmall`] when the subnets do not fit
    pub fn resolve(&self, request: &NetworkRequest) -> Result<Network, ConfigError> {
        let id = ResourceId::parse(&request.id)?;

        if request.max_azs == 0 || request.max_azs > MAX_AVAILABILITY_ZONES {
            return Err(ConfigError::InvalidAvailabilityZoneCount {
                network: request.id.clone(),
                count: request.max_azs,
            });
        }

        let lookup_key = request
            .lookup_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());

        let source = match (request.cidr.as_deref(), lookup_key) {
            (Some(cidr), None) => {
                let cidr: Ipv4Cidr = cidr.trim().parse()?;
                let subnets = carve(&request.id, cidr, request.max_azs, &request.subnet_groups)?;
                NetworkSource::Explicit { cidr, subnets }
            }
            (None, Some(key)) => NetworkSource::Lookup {
                reference: Reference::lookup(key),
            },
            _ => {
                return Err(ConfigError::AmbiguousNetworkSource {
                    network: request.id.clone(),
                })
            }
        };

        tracing::debug!(network = %id, lookup = matches!(source, NetworkSource::Lookup { .. }), "network resolved");

        Ok(Network {
            id,
            source,
            max_azs: request.max_azs,
        })
    }
}

/// Carve one subnet per group per availability zone
///
/// Groups without an explicit mask share the block evenly:
/// `prefix + ceil(log2(groups * azs))`. Blocks are handed out in request
/// order, each aligned to its own size, so no two subnets overlap.
fn carve(
    network: &str,
    cidr: Ipv4Cidr,
    max_azs: u8,
    groups: &[SubnetGroupRequest],
) -> Result<SubnetLayout, ConfigError> {
    if cidr.prefix() < MIN_NETWORK_PREFIX {
        return Err(ConfigError::MalformedCidr {
            value: cidr.to_string(),
            reason: format!("prefix must be /{MIN_NETWORK_PREFIX} or longer"),
        });
    }
    if cidr.prefix() > MAX_SUBNET_PREFIX {
        return Err(ConfigError::CidrTooSmall {
            cidr: cidr.to_string(),
            reason: format!("prefix must be /{MAX_SUBNET_PREFIX} or shorter"),
        });
    }
    if groups.is_empty() {
        return Err(ConfigError::EmptySubnetLayout {
            network: network.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for group in groups {
        if !seen.insert(group.name.as_str()) {
            return Err(ConfigError::DuplicateSubnetGroup {
                network: network.to_string(),
                group: group.name.clone(),
            });
        }
    }

    let total = groups.len() * usize::from(max_azs);
    let even_mask = u32::from(cidr.prefix()) + ceil_log2(total);

    let too_small = |reason: String| ConfigError::CidrTooSmall {
        cidr: cidr.to_string(),
        reason,
    };

    let mut layout = SubnetLayout::default();
    let mut cursor = cidr.first();

    for group in groups {
        let mask = match group.cidr_mask {
            Some(mask) => u32::from(mask),
            None => even_mask,
        };
        if mask < u32::from(cidr.prefix()) {
            return Err(too_small(format!(
                "subnet group {} asks for /{mask}, wider than the network",
                group.name
            )));
        }
        if mask > u32::from(MAX_SUBNET_PREFIX) {
            return Err(too_small(format!(
                "{total} subnets need /{mask}, smaller than /{MAX_SUBNET_PREFIX}"
            )));
        }

        let block = 1u64 << (32 - mask);
        for az_index in 0..max_azs {
            cursor = cursor.div_ceil(block) * block;
            if cursor + block > cidr.end() {
                return Err(too_small(format!(
                    "no room for /{mask} subnet of group {} in zone {az_index}",
                    group.name
                )));
            }

            let base = u32::try_from(cursor)
                .map_err(|_| too_small("subnet address out of range".to_string()))?;
            let prefix = u8::try_from(mask)
                .map_err(|_| too_small(format!("invalid subnet mask /{mask}")))?;
            let subnet_cidr = Ipv4Cidr::new(Ipv4Addr::from(base), prefix)?;
            cursor += block;

            let subnet = Subnet {
                group: group.name.clone(),
                kind: group.kind,
                az_index,
                cidr: subnet_cidr,
            };
            match group.kind {
                SubnetKind::Public => layout.public.push(subnet),
                SubnetKind::Private => layout.private.push(subnet),
            }
        }
    }

    Ok(layout)
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn explicit(request: &NetworkRequest) -> SubnetLayout {
        let network = NetworkResolver::new().resolve(request).unwrap();
        network.subnets().cloned().unwrap()
    }

    #[test]
    fn splits_evenly_across_two_zones() {
        let layout = explicit(&NetworkRequest::with_cidr("Vpc", "10.0.0.0/24"));

        let public: Vec<String> = layout.public.iter().map(|s| s.cidr.to_string()).collect();
        let private: Vec<String> = layout.private.iter().map(|s| s.cidr.to_string()).collect();
        assert_eq!(public, ["10.0.0.0/26", "10.0.0.64/26"]);
        assert_eq!(private, ["10.0.0.128/26", "10.0.0.192/26"]);
        assert!(layout.covers(SubnetKind::Private, 0));
        assert!(layout.covers(SubnetKind::Private, 1));
    }

    #[test]
    fn honours_explicit_masks() {
        let request = NetworkRequest::with_cidr("Vpc", "10.1.0.0/16").subnet_groups(vec![
            SubnetGroupRequest::new("ingress", SubnetKind::Public).with_mask(24),
            SubnetGroupRequest::new("app", SubnetKind::Private).with_mask(20),
        ]);
        let layout = explicit(&request);

        let private: Vec<String> = layout.private.iter().map(|s| s.cidr.to_string()).collect();
        // app blocks are aligned past the two /24 ingress blocks
        assert_eq!(private, ["10.1.16.0/20", "10.1.32.0/20"]);
    }

    #[test]
    fn private_only_layout() {
        let request = NetworkRequest::with_cidr("Vpc", "10.0.0.0/24")
            .max_azs(3)
            .subnet_groups(vec![SubnetGroupRequest::new("app", SubnetKind::Private)]);
        let layout = explicit(&request);
        assert!(layout.public.is_empty());
        assert_eq!(layout.private.len(), 3);
    }

    #[test]
    fn lookup_defers_resolution() {
        let network = NetworkResolver::new()
            .resolve(&NetworkRequest::with_lookup("Vpc", "vpc-0abc"))
            .unwrap();
        assert!(network.is_lookup());
        assert!(network.subnets().is_none());
        match network.source {
            NetworkSource::Lookup { reference } => assert_eq!(reference.key(), "vpc-0abc"),
            NetworkSource::Explicit { .. } => panic!("expected lookup"),
        }
    }

    #[test]
    fn exactly_one_source_required() {
        let mut both = NetworkRequest::with_cidr("Vpc", "10.0.0.0/24");
        both.lookup_key = Some("vpc-0abc".into());
        let mut neither = NetworkRequest::with_cidr("Vpc", "10.0.0.0/24");
        neither.cidr = None;
        let blank_lookup = NetworkRequest::with_lookup("Vpc", "  ");

        for request in [both, neither, blank_lookup] {
            assert!(matches!(
                NetworkResolver::new().resolve(&request),
                Err(ConfigError::AmbiguousNetworkSource { .. })
            ));
        }
    }

    #[test]
    fn rejects_malformed_and_small_blocks() {
        let resolver = NetworkResolver::new();
        assert!(matches!(
            resolver.resolve(&NetworkRequest::with_cidr("Vpc", "10.0.0.0/99")),
            Err(ConfigError::MalformedCidr { .. })
        ));
        assert!(matches!(
            resolver.resolve(&NetworkRequest::with_cidr("Vpc", "10.0.0.0/8")),
            Err(ConfigError::MalformedCidr { .. })
        ));
        // four subnets in a /27 would need /29
        assert!(matches!(
            resolver.resolve(&NetworkRequest::with_cidr("Vpc", "10.0.0.0/27")),
            Err(ConfigError::CidrTooSmall { .. })
        ));
        // explicit masks that overflow the block
        let request = NetworkRequest::with_cidr("Vpc", "10.0.0.0/24").subnet_groups(vec![
            SubnetGroupRequest::new("a", SubnetKind::Public).with_mask(25),
            SubnetGroupRequest::new("b", SubnetKind::Private).with_mask(26),
        ]);
        assert!(matches!(
            resolver.resolve(&request),
            Err(ConfigError::CidrTooSmall { .. })
        ));
    }

    #[test]
    fn rejects_zone_counts_and_duplicate_groups() {
        let resolver = NetworkResolver::new();
        assert!(matches!(
            resolver.resolve(&NetworkRequest::with_cidr("Vpc", "10.0.0.0/16").max_azs(0)),
            Err(ConfigError::InvalidAvailabilityZoneCount { .. })
        ));
        assert!(matches!(
            resolver.resolve(&NetworkRequest::with_cidr("Vpc", "10.0.0.0/16").max_azs(7)),
            Err(ConfigError::InvalidAvailabilityZoneCount { .. })
        ));

        let request = NetworkRequest::with_cidr("Vpc", "10.0.0.0/16").subnet_groups(vec![
            SubnetGroupRequest::new("app", SubnetKind::Public),
            SubnetGroupRequest::new("app", SubnetKind::Private),
        ]);
        assert!(matches!(
            resolver.resolve(&request),
            Err(ConfigError::DuplicateSubnetGroup { .. })
        ));
    }

    #[test]
    fn ceil_log2_values() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(4), 2);
        assert_eq!(ceil_log2(5), 3);
    }

    proptest! {
        #[test]
        fn prop_subnets_never_overlap(
            octet in 0u8..=255,
            prefix in 16u8..=24,
            azs in 1u8..=6,
            public_groups in 0usize..=2,
            private_groups in 0usize..=2,
        ) {
            prop_assume!(public_groups + private_groups > 0);

            let mut groups = Vec::new();
            for i in 0..public_groups {
                groups.push(SubnetGroupRequest::new(format!("public-{i}"), SubnetKind::Public));
            }
            for i in 0..private_groups {
                groups.push(SubnetGroupRequest::new(format!("private-{i}"), SubnetKind::Private));
            }

            let base = u32::from(Ipv4Addr::new(10, octet, 0, 0)) & (u32::MAX << (32 - u32::from(prefix)));
            let cidr = format!("{}/{prefix}", Ipv4Addr::from(base));
            let request = NetworkRequest::with_cidr("Vpc", cidr).max_azs(azs).subnet_groups(groups);

            if let Ok(network) = NetworkResolver::new().resolve(&request) {
                let NetworkSource::Explicit { cidr, subnets } = &network.source else {
                    panic!("explicit network expected");
                };
                let all: Vec<&Subnet> = subnets.iter().collect();

                prop_assert_eq!(subnets.public.len(), public_groups * usize::from(azs));
                prop_assert_eq!(subnets.private.len(), private_groups * usize::from(azs));
                for (i, a) in all.iter().enumerate() {
                    prop_assert!(cidr.contains(&a.cidr));
                    for b in &all[i + 1..] {
                        prop_assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.cidr, b.cidr);
                    }
                }
            }
        }
    }
}
