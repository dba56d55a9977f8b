//! Vallum AWS Provider
//!
//! Typed lifecycle management for AWS Network Firewall: firewalls, firewall
//! policies, rule groups, TLS inspection configurations, VPC endpoint
//! associations, and transit gateway attachment acceptance. Every mutating
//! call is followed by a completion wait driven by `vallum_core`.

pub mod association;
pub mod error;
pub mod firewall;
pub mod policy;
pub mod provider;
pub mod rule_group;
pub mod tls;
pub mod transit_gateway;
pub mod types;
pub mod waiters;

mod tags;

pub use association::{VpcEndpointAssociationSpec, VpcEndpointAssociationState};
pub use error::{ProviderError, ProviderResult, ResourceKind};
pub use firewall::{FirewallSpec, FirewallState};
pub use policy::{FirewallPolicySpec, FirewallPolicyState};
pub use provider::NetworkFirewallProvider;
pub use rule_group::{RuleGroupKind, RuleGroupSpec, RuleGroupState};
pub use tls::{TlsInspectionSpec, TlsInspectionState};
pub use transit_gateway::TransitGatewayAttachmentState;
pub use types::{IpAddressKind, PortRangeSpec, SubnetMappingSpec};
