//! Shared spec primitives used by more than one resource kind

use aws_sdk_networkfirewall::types::{Address, IpAddressType, PortRange, SubnetMapping};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult, ResourceKind};

/// Address family for a firewall endpoint inside a subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpAddressKind {
    Ipv4,
    Ipv6,
    Dualstack,
}

impl IpAddressKind {
    pub(crate) fn to_api(self) -> IpAddressType {
        match self {
            Self::Ipv4 => IpAddressType::Ipv4,
            Self::Ipv6 => IpAddressType::Ipv6,
            Self::Dualstack => IpAddressType::Dualstack,
        }
    }
}

/// One subnet the firewall places an endpoint into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubnetMappingSpec {
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address_type: Option<IpAddressKind>,
}

impl SubnetMappingSpec {
    pub fn new(subnet_id: impl Into<String>) -> Self {
        Self {
            subnet_id: subnet_id.into(),
            ip_address_type: None,
        }
    }
}

pub(crate) fn subnet_mappings_to_api(
    kind: ResourceKind,
    name: &str,
    mappings: &[SubnetMappingSpec],
) -> ProviderResult<Vec<SubnetMapping>> {
    let mut out = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let mut builder = SubnetMapping::builder().subnet_id(&mapping.subnet_id);
        if let Some(ip) = mapping.ip_address_type {
            builder = builder.ip_address_type(ip.to_api());
        }
        let built = builder
            .build()
            .map_err(|e| ProviderError::invalid_spec(kind, name, e))?;
        out.push(built);
    }
    Ok(out)
}

/// Inclusive port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRangeSpec {
    pub from: i32,
    pub to: i32,
}

pub(crate) fn port_ranges_to_api(
    kind: ResourceKind,
    name: &str,
    ranges: &[PortRangeSpec],
) -> ProviderResult<Vec<PortRange>> {
    ranges
        .iter()
        .map(|r| {
            Ok(PortRange::builder()
                .from_port(r.from)
                .to_port(r.to)
                .build())
        })
        .collect()
}

/// CIDR blocks as the API's address list.
pub(crate) fn addresses_to_api(
    kind: ResourceKind,
    name: &str,
    cidrs: &[String],
) -> ProviderResult<Vec<Address>> {
    cidrs
        .iter()
        .map(|cidr| {
            Address::builder()
                .address_definition(cidr)
                .build()
                .map_err(|e| ProviderError::invalid_spec(kind, name, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subnet_mapping_carries_address_type() {
        let specs = vec![
            SubnetMappingSpec::new("subnet-aaa"),
            SubnetMappingSpec {
                subnet_id: "subnet-bbb".to_string(),
                ip_address_type: Some(IpAddressKind::Dualstack),
            },
        ];
        let api = subnet_mappings_to_api(ResourceKind::Firewall, "fw", &specs).unwrap();
        assert_eq!(api[0].subnet_id(), "subnet-aaa");
        assert!(api[0].ip_address_type().is_none());
        assert_eq!(api[1].ip_address_type(), Some(&IpAddressType::Dualstack));
    }

    #[test]
    fn port_ranges_map_to_from_and_to() {
        let api = port_ranges_to_api(
            ResourceKind::RuleGroup,
            "rg",
            &[PortRangeSpec { from: 443, to: 443 }],
        )
        .unwrap();
        assert_eq!(api[0].from_port(), 443);
        assert_eq!(api[0].to_port(), 443);
    }

    #[test]
    fn ip_address_kind_serde_uses_lowercase() {
        let json = serde_json::to_string(&IpAddressKind::Dualstack).unwrap();
        assert_eq!(json, "\"dualstack\"");
    }
}
