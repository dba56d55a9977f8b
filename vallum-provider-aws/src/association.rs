//! VPC endpoint association lifecycle
//!
//! Associations add firewall endpoints in VPCs and subnets beyond the
//! firewall's own subnet mappings. They are keyed by ARN, not name.

use std::collections::BTreeMap;

use aws_sdk_networkfirewall::Client;
use aws_sdk_networkfirewall::types::{FirewallStatusValue, VpcEndpointAssociation};
use serde::{Deserialize, Serialize};
use tracing::info;
use vallum_core::arn::Arn;
use vallum_core::error::ProbeError;
use vallum_core::waiter::{BoxFuture, Probe, StatusProber, wait_for};

use crate::error::{ProviderError, ProviderResult, ResourceKind};
use crate::provider::{NetworkFirewallProvider, RemoteFault, classify, read_error};
use crate::tags::{tags_from_api, tags_to_api};
use crate::types::{SubnetMappingSpec, subnet_mappings_to_api};
use crate::waiters;

const KIND: ResourceKind = ResourceKind::VpcEndpointAssociation;

/// Desired configuration of a VPC endpoint association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcEndpointAssociationSpec {
    pub firewall_arn: Arn,
    pub vpc_id: String,
    pub subnet_mapping: SubnetMappingSpec,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Observed state of a VPC endpoint association.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VpcEndpointAssociationState {
    pub arn: Arn,
    pub id: String,
    pub firewall_arn: Arn,
    pub vpc_id: String,
    pub subnet_id: String,
    pub status: String,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
}

fn association_state(
    association: &VpcEndpointAssociation,
    status: &str,
) -> VpcEndpointAssociationState {
    VpcEndpointAssociationState {
        arn: Arn::from(association.vpc_endpoint_association_arn()),
        id: association
            .vpc_endpoint_association_id()
            .unwrap_or_default()
            .to_string(),
        firewall_arn: Arn::from(association.firewall_arn()),
        vpc_id: association.vpc_id().to_string(),
        subnet_id: association
            .subnet_mapping()
            .map(|m| m.subnet_id())
            .unwrap_or_default()
            .to_string(),
        status: status.to_string(),
        description: association.description().map(str::to_string),
        tags: tags_from_api(association.tags()),
    }
}

/// Reads the association's readiness status.
pub(crate) struct AssociationStatusProber {
    client: Client,
    arn: Arn,
}

impl AssociationStatusProber {
    pub(crate) fn new(client: Client, arn: Arn) -> Self {
        Self { client, arn }
    }
}

impl StatusProber for AssociationStatusProber {
    type Status = FirewallStatusValue;

    fn probe(&self) -> BoxFuture<'_, Result<Probe<FirewallStatusValue>, ProbeError>> {
        Box::pin(async move {
            match self
                .client
                .describe_vpc_endpoint_association()
                .vpc_endpoint_association_arn(self.arn.as_str())
                .send()
                .await
            {
                Ok(out) => Ok(out
                    .vpc_endpoint_association_status()
                    .map(|s| Probe::Status(s.status().clone()))
                    .unwrap_or(Probe::NotFound)),
                Err(err) => match classify(&err) {
                    RemoteFault::NotFound => Ok(Probe::NotFound),
                    RemoteFault::Transient => Err(ProbeError::transient(err)),
                    RemoteFault::Fatal => Err(ProbeError::fatal(err)),
                },
            }
        })
    }
}

impl NetworkFirewallProvider {
    /// Create a VPC endpoint association and block until it is READY.
    pub async fn create_vpc_endpoint_association(
        &self,
        spec: &VpcEndpointAssociationSpec,
    ) -> ProviderResult<VpcEndpointAssociationState> {
        let label = spec.firewall_arn.to_string();
        let mapping = subnet_mappings_to_api(KIND, &label, std::slice::from_ref(&spec.subnet_mapping))?
            .pop()
            .ok_or_else(|| ProviderError::missing_field(KIND, &label, "subnet_mapping"))?;
        let tags = tags_to_api(KIND, &label, &spec.tags)?;

        let out = self
            .client
            .create_vpc_endpoint_association()
            .firewall_arn(spec.firewall_arn.as_str())
            .vpc_id(&spec.vpc_id)
            .subnet_mapping(mapping)
            .set_description(spec.description.clone())
            .set_tags(tags)
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, &label, "CreateVpcEndpointAssociation", e))?;

        let arn = out
            .vpc_endpoint_association()
            .map(|a| Arn::from(a.vpc_endpoint_association_arn()))
            .ok_or_else(|| ProviderError::missing_field(KIND, &label, "vpc_endpoint_association"))?;

        info!(association = %arn, "create issued, waiting for READY");
        let prober = AssociationStatusProber::new(self.client.clone(), arn.clone());
        wait_for(&waiters::association_create(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, arn.as_str(), e))?;

        self.describe_vpc_endpoint_association(&arn).await
    }

    pub async fn describe_vpc_endpoint_association(
        &self,
        arn: &Arn,
    ) -> ProviderResult<VpcEndpointAssociationState> {
        let out = self
            .client
            .describe_vpc_endpoint_association()
            .vpc_endpoint_association_arn(arn.as_str())
            .send()
            .await
            .map_err(|e| read_error(KIND, arn.as_str(), "DescribeVpcEndpointAssociation", e))?;

        let association = out
            .vpc_endpoint_association()
            .ok_or_else(|| ProviderError::missing_field(KIND, arn.as_str(), "vpc_endpoint_association"))?;
        let status = out
            .vpc_endpoint_association_status()
            .map(|s| s.status().as_str())
            .unwrap_or_default();
        Ok(association_state(association, status))
    }

    /// Delete a VPC endpoint association and block until it is gone.
    pub async fn delete_vpc_endpoint_association(&self, arn: &Arn) -> ProviderResult<()> {
        self.client
            .delete_vpc_endpoint_association()
            .vpc_endpoint_association_arn(arn.as_str())
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, arn.as_str(), "DeleteVpcEndpointAssociation", e))?;

        info!(association = %arn, "delete issued, waiting for removal");
        let prober = AssociationStatusProber::new(self.client.clone(), arn.clone());
        wait_for(&waiters::association_delete(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, arn.as_str(), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_networkfirewall::types::SubnetMapping;

    use super::*;

    #[test]
    fn association_state_maps_identity_and_subnet() {
        let association = VpcEndpointAssociation::builder()
            .vpc_endpoint_association_arn(
                "arn:aws:network-firewall:us-east-1:123456789012:vpc-endpoint-association/a1",
            )
            .vpc_endpoint_association_id("vpce-assoc-0001")
            .firewall_arn("arn:aws:network-firewall:us-east-1:123456789012:firewall/edge-fw")
            .vpc_id("vpc-0a1b")
            .subnet_mapping(
                SubnetMapping::builder()
                    .subnet_id("subnet-ccc")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let state = association_state(&association, "READY");
        assert_eq!(state.id, "vpce-assoc-0001");
        assert_eq!(state.subnet_id, "subnet-ccc");
        assert_eq!(state.status, "READY");
    }

    #[test]
    fn association_spec_parses_with_defaults() {
        let spec: VpcEndpointAssociationSpec = serde_json::from_str(
            r#"{
                "firewall_arn": "arn:aws:network-firewall:us-east-1:123456789012:firewall/edge-fw",
                "vpc_id": "vpc-9z8y",
                "subnet_mapping": {"subnet_id": "subnet-ccc"}
            }"#,
        )
        .unwrap();
        assert!(spec.description.is_none());
        assert_eq!(spec.subnet_mapping.subnet_id, "subnet-ccc");
    }
}
