//! Firewall lifecycle: create, describe, update, subnet sync, delete

use std::collections::{BTreeMap, HashSet};

use aws_sdk_networkfirewall::Client;
use aws_sdk_networkfirewall::types::{Firewall, FirewallStatus, FirewallStatusValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vallum_core::arn::Arn;
use vallum_core::error::ProbeError;
use vallum_core::reconcile::reconcile;
use vallum_core::waiter::{BoxFuture, Probe, StatusProber, wait_for};

use crate::error::{ProviderError, ProviderResult, ResourceKind};
use crate::provider::{NetworkFirewallProvider, RemoteFault, classify, read_error};
use crate::tags::{tags_from_api, tags_to_api};
use crate::types::{SubnetMappingSpec, subnet_mappings_to_api};
use crate::waiters;

const KIND: ResourceKind = ResourceKind::Firewall;

/// Desired configuration of a firewall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallSpec {
    pub name: String,
    pub firewall_policy_arn: Arn,
    pub vpc_id: String,
    pub subnet_mappings: Vec<SubnetMappingSpec>,
    #[serde(default)]
    pub delete_protection: bool,
    #[serde(default)]
    pub subnet_change_protection: bool,
    #[serde(default)]
    pub firewall_policy_change_protection: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Observed state of a firewall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirewallState {
    pub arn: Arn,
    pub name: String,
    pub firewall_policy_arn: Arn,
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    /// Availability zone -> VPC endpoint id, from the per-AZ sync states.
    pub endpoint_ids: BTreeMap<String, String>,
    pub delete_protection: bool,
    pub subnet_change_protection: bool,
    pub firewall_policy_change_protection: bool,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub status: String,
}

fn firewall_state(firewall: &Firewall, status: &FirewallStatus) -> ProviderResult<FirewallState> {
    let name = firewall.firewall_name().unwrap_or_default().to_string();
    let arn = firewall
        .firewall_arn()
        .map(Arn::from)
        .ok_or_else(|| ProviderError::missing_field(KIND, &name, "firewall_arn"))?;

    let mut endpoint_ids = BTreeMap::new();
    if let Some(sync_states) = status.sync_states() {
        for (zone, sync) in sync_states {
            if let Some(endpoint) = sync.attachment().and_then(|a| a.endpoint_id()) {
                endpoint_ids.insert(zone.clone(), endpoint.to_string());
            }
        }
    }

    Ok(FirewallState {
        arn,
        name,
        firewall_policy_arn: Arn::from(firewall.firewall_policy_arn()),
        vpc_id: firewall.vpc_id().to_string(),
        subnet_ids: firewall
            .subnet_mappings()
            .iter()
            .map(|m| m.subnet_id().to_string())
            .collect(),
        endpoint_ids,
        delete_protection: firewall.delete_protection(),
        subnet_change_protection: firewall.subnet_change_protection(),
        firewall_policy_change_protection: firewall.firewall_policy_change_protection(),
        description: firewall.description().map(str::to_string),
        tags: tags_from_api(firewall.tags()),
        status: status.status().as_str().to_string(),
    })
}

/// Mappings from `desired` whose subnet id is in `to_add`, keeping the
/// address-type metadata the bare id set lost.
fn select_mappings(desired: &[SubnetMappingSpec], to_add: &HashSet<String>) -> Vec<SubnetMappingSpec> {
    desired
        .iter()
        .filter(|m| to_add.contains(&m.subnet_id))
        .cloned()
        .collect()
}

/// Reads the firewall's top-level status.
pub(crate) struct FirewallStatusProber {
    client: Client,
    name: String,
}

impl FirewallStatusProber {
    pub(crate) fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

impl StatusProber for FirewallStatusProber {
    type Status = FirewallStatusValue;

    fn probe(&self) -> BoxFuture<'_, Result<Probe<FirewallStatusValue>, ProbeError>> {
        Box::pin(async move {
            match self
                .client
                .describe_firewall()
                .firewall_name(&self.name)
                .send()
                .await
            {
                Ok(out) => Ok(out
                    .firewall_status()
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

/// Reads the firewall's configuration sync summary.
pub(crate) struct FirewallSyncProber {
    client: Client,
    name: String,
}

impl FirewallSyncProber {
    pub(crate) fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

impl StatusProber for FirewallSyncProber {
    type Status = aws_sdk_networkfirewall::types::ConfigurationSyncState;

    fn probe(&self) -> BoxFuture<'_, Result<Probe<Self::Status>, ProbeError>> {
        Box::pin(async move {
            match self
                .client
                .describe_firewall()
                .firewall_name(&self.name)
                .send()
                .await
            {
                Ok(out) => Ok(out
                    .firewall_status()
                    .map(|s| Probe::Status(s.configuration_sync_state_summary().clone()))
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
    /// Create a firewall and block until it is READY.
    pub async fn create_firewall(&self, spec: &FirewallSpec) -> ProviderResult<FirewallState> {
        let subnet_mappings = subnet_mappings_to_api(KIND, &spec.name, &spec.subnet_mappings)?;
        let tags = tags_to_api(KIND, &spec.name, &spec.tags)?;

        self.client
            .create_firewall()
            .firewall_name(&spec.name)
            .firewall_policy_arn(spec.firewall_policy_arn.as_str())
            .vpc_id(&spec.vpc_id)
            .set_subnet_mappings(Some(subnet_mappings))
            .delete_protection(spec.delete_protection)
            .subnet_change_protection(spec.subnet_change_protection)
            .firewall_policy_change_protection(spec.firewall_policy_change_protection)
            .set_description(spec.description.clone())
            .set_tags(tags)
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, &spec.name, "CreateFirewall", e))?;

        info!(firewall = %spec.name, "create issued, waiting for READY");
        let prober = FirewallStatusProber::new(self.client.clone(), &spec.name);
        wait_for(&waiters::firewall_create(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, &spec.name, e))?;

        self.describe_firewall(&spec.name).await
    }

    /// Read the firewall's current state. Not-found is a distinct error.
    pub async fn describe_firewall(&self, name: &str) -> ProviderResult<FirewallState> {
        let out = self
            .client
            .describe_firewall()
            .firewall_name(name)
            .send()
            .await
            .map_err(|e| read_error(KIND, name, "DescribeFirewall", e))?;

        let firewall = out
            .firewall()
            .ok_or_else(|| ProviderError::missing_field(KIND, name, "firewall"))?;
        let status = out
            .firewall_status()
            .ok_or_else(|| ProviderError::missing_field(KIND, name, "firewall_status"))?;
        firewall_state(firewall, status)
    }

    /// Diff the observed state against the spec and apply every in-place
    /// update the control plane supports, finishing with subnet
    /// reconciliation. Returns the re-read state.
    pub async fn update_firewall(&self, spec: &FirewallSpec) -> ProviderResult<FirewallState> {
        let current = self.describe_firewall(&spec.name).await?;

        if current.description != spec.description {
            self.client
                .update_firewall_description()
                .firewall_name(&spec.name)
                .set_description(spec.description.clone())
                .send()
                .await
                .map_err(|e| ProviderError::api(KIND, &spec.name, "UpdateFirewallDescription", e))?;
        }

        if current.delete_protection != spec.delete_protection {
            self.client
                .update_firewall_delete_protection()
                .firewall_name(&spec.name)
                .delete_protection(spec.delete_protection)
                .send()
                .await
                .map_err(|e| {
                    ProviderError::api(KIND, &spec.name, "UpdateFirewallDeleteProtection", e)
                })?;
        }

        if current.subnet_change_protection != spec.subnet_change_protection {
            self.client
                .update_subnet_change_protection()
                .firewall_name(&spec.name)
                .subnet_change_protection(spec.subnet_change_protection)
                .send()
                .await
                .map_err(|e| {
                    ProviderError::api(KIND, &spec.name, "UpdateSubnetChangeProtection", e)
                })?;
        }

        if current.firewall_policy_change_protection != spec.firewall_policy_change_protection {
            self.client
                .update_firewall_policy_change_protection()
                .firewall_name(&spec.name)
                .firewall_policy_change_protection(spec.firewall_policy_change_protection)
                .send()
                .await
                .map_err(|e| {
                    ProviderError::api(KIND, &spec.name, "UpdateFirewallPolicyChangeProtection", e)
                })?;
        }

        if current.firewall_policy_arn != spec.firewall_policy_arn {
            info!(firewall = %spec.name, policy = %spec.firewall_policy_arn, "associating firewall policy");
            self.client
                .associate_firewall_policy()
                .firewall_name(&spec.name)
                .firewall_policy_arn(spec.firewall_policy_arn.as_str())
                .send()
                .await
                .map_err(|e| ProviderError::api(KIND, &spec.name, "AssociateFirewallPolicy", e))?;
            self.wait_for_config_sync(&spec.name).await?;
        }

        self.sync_firewall_subnets(&spec.name, &spec.subnet_mappings).await
    }

    /// Reconcile the firewall's subnet mappings to the desired set.
    ///
    /// Additions run before removals: the firewall must keep at least one
    /// subnet through the transition. When the current set is empty the
    /// removal phase is skipped outright.
    pub async fn sync_firewall_subnets(
        &self,
        name: &str,
        desired: &[SubnetMappingSpec],
    ) -> ProviderResult<FirewallState> {
        let current_state = self.describe_firewall(name).await?;
        let current: HashSet<String> = current_state.subnet_ids.iter().cloned().collect();
        let desired_ids: HashSet<String> = desired.iter().map(|m| m.subnet_id.clone()).collect();

        let delta = reconcile(&current, &desired_ids);
        if delta.is_noop() {
            debug!(firewall = %name, "subnet mappings already in sync");
            return Ok(current_state);
        }

        if !delta.to_add.is_empty() {
            let additions = select_mappings(desired, &delta.to_add);
            let mappings = subnet_mappings_to_api(KIND, name, &additions)?;
            info!(firewall = %name, count = mappings.len(), "associating subnets");
            self.client
                .associate_subnets()
                .firewall_name(name)
                .set_subnet_mappings(Some(mappings))
                .send()
                .await
                .map_err(|e| ProviderError::api(KIND, name, "AssociateSubnets", e))?;
            self.wait_for_config_sync(name).await?;
        }

        if !current.is_empty() && !delta.to_remove.is_empty() {
            let ids: Vec<String> = delta.to_remove.into_iter().collect();
            info!(firewall = %name, count = ids.len(), "disassociating subnets");
            self.client
                .disassociate_subnets()
                .firewall_name(name)
                .set_subnet_ids(Some(ids))
                .send()
                .await
                .map_err(|e| ProviderError::api(KIND, name, "DisassociateSubnets", e))?;
            self.wait_for_config_sync(name).await?;
        }

        self.describe_firewall(name).await
    }

    /// Delete a firewall and block until consecutive not-found reads
    /// confirm it is gone.
    pub async fn delete_firewall(&self, name: &str) -> ProviderResult<()> {
        self.client
            .delete_firewall()
            .firewall_name(name)
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, name, "DeleteFirewall", e))?;

        info!(firewall = %name, "delete issued, waiting for teardown");
        let prober = FirewallStatusProber::new(self.client.clone(), name);
        wait_for(&waiters::firewall_delete(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, name, e))?;
        Ok(())
    }

    pub(crate) async fn wait_for_config_sync(&self, name: &str) -> ProviderResult<()> {
        let prober = FirewallSyncProber::new(self.client.clone(), name);
        wait_for(&waiters::firewall_config_sync(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, name, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_networkfirewall::types::{
        Attachment, ConfigurationSyncState, SubnetMapping, SyncState, Tag,
    };

    use super::*;

    fn sample_firewall() -> Firewall {
        Firewall::builder()
            .firewall_name("edge-fw")
            .firewall_arn("arn:aws:network-firewall:us-east-1:123456789012:firewall/edge-fw")
            .firewall_policy_arn(
                "arn:aws:network-firewall:us-east-1:123456789012:firewall-policy/base",
            )
            .firewall_id("fw-0123")
            .vpc_id("vpc-0a1b")
            .subnet_mappings(
                SubnetMapping::builder()
                    .subnet_id("subnet-aaa")
                    .build()
                    .unwrap(),
            )
            .subnet_mappings(
                SubnetMapping::builder()
                    .subnet_id("subnet-bbb")
                    .build()
                    .unwrap(),
            )
            .delete_protection(true)
            .description("edge ingress filtering")
            .tags(Tag::builder().key("Team").value("netsec").build().unwrap())
            .build()
            .unwrap()
    }

    fn sample_status() -> FirewallStatus {
        FirewallStatus::builder()
            .status(FirewallStatusValue::Ready)
            .configuration_sync_state_summary(ConfigurationSyncState::InSync)
            .sync_states(
                "us-east-1a".to_string(),
                SyncState::builder()
                    .attachment(
                        Attachment::builder()
                            .subnet_id("subnet-aaa")
                            .endpoint_id("vpce-0011")
                            .build(),
                    )
                    .build(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn firewall_state_maps_identity_and_attachments() {
        let state = firewall_state(&sample_firewall(), &sample_status()).unwrap();
        assert_eq!(state.name, "edge-fw");
        assert_eq!(state.vpc_id, "vpc-0a1b");
        assert_eq!(state.subnet_ids, vec!["subnet-aaa", "subnet-bbb"]);
        assert_eq!(state.endpoint_ids.get("us-east-1a").unwrap(), "vpce-0011");
        assert!(state.delete_protection);
        assert_eq!(state.status, "READY");
        assert_eq!(state.tags.get("Team").unwrap(), "netsec");
    }

    #[test]
    fn select_mappings_keeps_address_type_metadata() {
        let desired = vec![
            SubnetMappingSpec::new("subnet-aaa"),
            SubnetMappingSpec {
                subnet_id: "subnet-bbb".to_string(),
                ip_address_type: Some(crate::types::IpAddressKind::Dualstack),
            },
        ];
        let to_add: HashSet<String> = ["subnet-bbb".to_string()].into_iter().collect();
        let picked = select_mappings(&desired, &to_add);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].subnet_id, "subnet-bbb");
        assert!(picked[0].ip_address_type.is_some());
    }

    #[test]
    fn firewall_spec_parses_with_defaults() {
        let spec: FirewallSpec = serde_json::from_str(
            r#"{
                "name": "edge-fw",
                "firewall_policy_arn": "arn:aws:network-firewall:us-east-1:123456789012:firewall-policy/base",
                "vpc_id": "vpc-0a1b",
                "subnet_mappings": [{"subnet_id": "subnet-aaa"}]
            }"#,
        )
        .unwrap();
        assert!(!spec.delete_protection);
        assert!(spec.tags.is_empty());
        assert_eq!(spec.subnet_mappings[0].subnet_id, "subnet-aaa");
    }
}
