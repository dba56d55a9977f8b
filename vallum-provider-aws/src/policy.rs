//! Firewall policy lifecycle
//!
//! Policies are token-updated: every mutation must carry the update token
//! from the latest describe, so updates fetch a fresh token first.

use std::collections::BTreeMap;

use aws_sdk_networkfirewall::Client;
use aws_sdk_networkfirewall::types::{
    FirewallPolicy, FirewallPolicyResponse, ResourceStatus, RuleOrder, StatefulEngineOptions,
    StatefulRuleGroupReference, StatelessRuleGroupReference,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use vallum_core::arn::Arn;
use vallum_core::error::ProbeError;
use vallum_core::waiter::{BoxFuture, Probe, StatusProber, wait_for};

use crate::error::{ProviderError, ProviderResult, ResourceKind};
use crate::provider::{NetworkFirewallProvider, RemoteFault, classify, read_error};
use crate::tags::{tags_from_api, tags_to_api};
use crate::waiters;

const KIND: ResourceKind = ResourceKind::FirewallPolicy;

/// Reference to a stateless rule group. Priority is mandatory: it decides
/// evaluation order within the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatelessRuleGroupRef {
    pub arn: Arn,
    pub priority: i32,
}

/// Reference to a stateful rule group. Priority only matters under strict
/// rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatefulRuleGroupRef {
    pub arn: Arn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// Desired configuration of a firewall policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallPolicySpec {
    pub name: String,
    pub stateless_default_actions: Vec<String>,
    pub stateless_fragment_default_actions: Vec<String>,
    #[serde(default)]
    pub stateless_rule_groups: Vec<StatelessRuleGroupRef>,
    #[serde(default)]
    pub stateful_rule_groups: Vec<StatefulRuleGroupRef>,
    #[serde(default)]
    pub stateful_default_actions: Vec<String>,
    #[serde(default)]
    pub strict_rule_order: bool,
    #[serde(default)]
    pub tls_inspection_configuration_arn: Option<Arn>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Observed state of a firewall policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirewallPolicyState {
    pub arn: Arn,
    pub name: String,
    pub status: String,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub stateless_default_actions: Vec<String>,
    pub stateless_fragment_default_actions: Vec<String>,
    pub stateless_rule_groups: Vec<StatelessRuleGroupRef>,
    pub stateful_rule_groups: Vec<StatefulRuleGroupRef>,
    pub stateful_default_actions: Vec<String>,
    pub strict_rule_order: bool,
    pub tls_inspection_configuration_arn: Option<Arn>,
}

fn policy_to_api(spec: &FirewallPolicySpec) -> ProviderResult<FirewallPolicy> {
    let mut builder = FirewallPolicy::builder()
        .set_stateless_default_actions(Some(spec.stateless_default_actions.clone()))
        .set_stateless_fragment_default_actions(Some(
            spec.stateless_fragment_default_actions.clone(),
        ));

    for group in &spec.stateless_rule_groups {
        let reference = StatelessRuleGroupReference::builder()
            .resource_arn(group.arn.as_str())
            .priority(group.priority)
            .build()
            .map_err(|e| ProviderError::invalid_spec(KIND, &spec.name, e))?;
        builder = builder.stateless_rule_group_references(reference);
    }

    for group in &spec.stateful_rule_groups {
        let mut reference = StatefulRuleGroupReference::builder().resource_arn(group.arn.as_str());
        if let Some(priority) = group.priority {
            reference = reference.priority(priority);
        }
        let reference = reference
            .build()
            .map_err(|e| ProviderError::invalid_spec(KIND, &spec.name, e))?;
        builder = builder.stateful_rule_group_references(reference);
    }

    if !spec.stateful_default_actions.is_empty() {
        builder = builder.set_stateful_default_actions(Some(spec.stateful_default_actions.clone()));
    }

    if spec.strict_rule_order {
        builder = builder.stateful_engine_options(
            StatefulEngineOptions::builder()
                .rule_order(RuleOrder::StrictOrder)
                .build(),
        );
    }

    if let Some(tls_arn) = &spec.tls_inspection_configuration_arn {
        builder = builder.tls_inspection_configuration_arn(tls_arn.as_str());
    }

    builder
        .build()
        .map_err(|e| ProviderError::invalid_spec(KIND, &spec.name, e))
}

fn policy_state(
    response: &FirewallPolicyResponse,
    document: Option<&FirewallPolicy>,
) -> FirewallPolicyState {
    let mut state = FirewallPolicyState {
        arn: Arn::from(response.firewall_policy_arn()),
        name: response.firewall_policy_name().to_string(),
        status: response
            .firewall_policy_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        description: response.description().map(str::to_string),
        tags: tags_from_api(response.tags()),
        stateless_default_actions: Vec::new(),
        stateless_fragment_default_actions: Vec::new(),
        stateless_rule_groups: Vec::new(),
        stateful_rule_groups: Vec::new(),
        stateful_default_actions: Vec::new(),
        strict_rule_order: false,
        tls_inspection_configuration_arn: None,
    };

    if let Some(doc) = document {
        state.stateless_default_actions = doc.stateless_default_actions().to_vec();
        state.stateless_fragment_default_actions =
            doc.stateless_fragment_default_actions().to_vec();
        state.stateless_rule_groups = doc
            .stateless_rule_group_references()
            .iter()
            .map(|r| StatelessRuleGroupRef {
                arn: Arn::from(r.resource_arn()),
                priority: r.priority(),
            })
            .collect();
        state.stateful_rule_groups = doc
            .stateful_rule_group_references()
            .iter()
            .map(|r| StatefulRuleGroupRef {
                arn: Arn::from(r.resource_arn()),
                priority: r.priority(),
            })
            .collect();
        state.stateful_default_actions = doc.stateful_default_actions().to_vec();
        state.strict_rule_order = doc
            .stateful_engine_options()
            .and_then(|o| o.rule_order())
            .map(|order| *order == RuleOrder::StrictOrder)
            .unwrap_or(false);
        state.tls_inspection_configuration_arn =
            doc.tls_inspection_configuration_arn().map(Arn::from);
    }

    state
}

/// Reads the policy's resource status.
pub(crate) struct PolicyStatusProber {
    client: Client,
    name: String,
}

impl PolicyStatusProber {
    pub(crate) fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

impl StatusProber for PolicyStatusProber {
    type Status = ResourceStatus;

    fn probe(&self) -> BoxFuture<'_, Result<Probe<ResourceStatus>, ProbeError>> {
        Box::pin(async move {
            match self
                .client
                .describe_firewall_policy()
                .firewall_policy_name(&self.name)
                .send()
                .await
            {
                Ok(out) => Ok(out
                    .firewall_policy_response()
                    .and_then(|r| r.firewall_policy_status())
                    .map(|s| Probe::Status(s.clone()))
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
    /// Create a firewall policy and block until it is ACTIVE.
    pub async fn create_firewall_policy(
        &self,
        spec: &FirewallPolicySpec,
    ) -> ProviderResult<FirewallPolicyState> {
        let policy = policy_to_api(spec)?;
        let tags = tags_to_api(KIND, &spec.name, &spec.tags)?;

        self.client
            .create_firewall_policy()
            .firewall_policy_name(&spec.name)
            .firewall_policy(policy)
            .set_description(spec.description.clone())
            .set_tags(tags)
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, &spec.name, "CreateFirewallPolicy", e))?;

        info!(policy = %spec.name, "create issued, waiting for ACTIVE");
        let prober = PolicyStatusProber::new(self.client.clone(), &spec.name);
        wait_for(&waiters::firewall_policy_create(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, &spec.name, e))?;

        self.describe_firewall_policy(&spec.name).await
    }

    pub async fn describe_firewall_policy(
        &self,
        name: &str,
    ) -> ProviderResult<FirewallPolicyState> {
        let out = self
            .client
            .describe_firewall_policy()
            .firewall_policy_name(name)
            .send()
            .await
            .map_err(|e| read_error(KIND, name, "DescribeFirewallPolicy", e))?;

        let response = out
            .firewall_policy_response()
            .ok_or_else(|| ProviderError::missing_field(KIND, name, "firewall_policy_response"))?;
        Ok(policy_state(response, out.firewall_policy()))
    }

    /// Replace the policy document, carrying the current update token.
    pub async fn update_firewall_policy(
        &self,
        spec: &FirewallPolicySpec,
    ) -> ProviderResult<FirewallPolicyState> {
        let token = self.policy_update_token(&spec.name).await?;
        let policy = policy_to_api(spec)?;

        self.client
            .update_firewall_policy()
            .update_token(token)
            .firewall_policy_name(&spec.name)
            .firewall_policy(policy)
            .set_description(spec.description.clone())
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, &spec.name, "UpdateFirewallPolicy", e))?;

        self.describe_firewall_policy(&spec.name).await
    }

    /// Delete a firewall policy and block until it is gone.
    pub async fn delete_firewall_policy(&self, name: &str) -> ProviderResult<()> {
        self.client
            .delete_firewall_policy()
            .firewall_policy_name(name)
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, name, "DeleteFirewallPolicy", e))?;

        info!(policy = %name, "delete issued, waiting for removal");
        let prober = PolicyStatusProber::new(self.client.clone(), name);
        wait_for(&waiters::firewall_policy_delete(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, name, e))?;
        Ok(())
    }

    async fn policy_update_token(&self, name: &str) -> ProviderResult<String> {
        let out = self
            .client
            .describe_firewall_policy()
            .firewall_policy_name(name)
            .send()
            .await
            .map_err(|e| read_error(KIND, name, "DescribeFirewallPolicy", e))?;
        Ok(out.update_token().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> FirewallPolicySpec {
        FirewallPolicySpec {
            name: "base".to_string(),
            stateless_default_actions: vec!["aws:forward_to_sfe".to_string()],
            stateless_fragment_default_actions: vec!["aws:drop".to_string()],
            stateless_rule_groups: vec![StatelessRuleGroupRef {
                arn: Arn::new("arn:aws:network-firewall:us-east-1:123456789012:stateless-rulegroup/sl"),
                priority: 10,
            }],
            stateful_rule_groups: vec![StatefulRuleGroupRef {
                arn: Arn::new("arn:aws:network-firewall:us-east-1:123456789012:stateful-rulegroup/sf"),
                priority: Some(100),
            }],
            stateful_default_actions: vec!["aws:drop_strict".to_string()],
            strict_rule_order: true,
            tls_inspection_configuration_arn: None,
            description: None,
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn policy_to_api_maps_actions_and_references() {
        let api = policy_to_api(&sample_spec()).unwrap();
        assert_eq!(api.stateless_default_actions(), ["aws:forward_to_sfe"]);
        assert_eq!(api.stateless_fragment_default_actions(), ["aws:drop"]);
        assert_eq!(api.stateless_rule_group_references().len(), 1);
        assert_eq!(api.stateless_rule_group_references()[0].priority(), 10);
        assert_eq!(api.stateful_rule_group_references()[0].priority(), Some(100));
        assert_eq!(
            api.stateful_engine_options().and_then(|o| o.rule_order()),
            Some(&RuleOrder::StrictOrder)
        );
    }

    #[test]
    fn default_order_omits_engine_options() {
        let mut spec = sample_spec();
        spec.strict_rule_order = false;
        let api = policy_to_api(&spec).unwrap();
        assert!(api.stateful_engine_options().is_none());
    }

    #[test]
    fn policy_state_round_trips_the_document() {
        let api = policy_to_api(&sample_spec()).unwrap();
        let response = FirewallPolicyResponse::builder()
            .firewall_policy_name("base")
            .firewall_policy_arn(
                "arn:aws:network-firewall:us-east-1:123456789012:firewall-policy/base",
            )
            .firewall_policy_id("fp-0001")
            .firewall_policy_status(ResourceStatus::Active)
            .build()
            .unwrap();

        let state = policy_state(&response, Some(&api));
        assert_eq!(state.name, "base");
        assert_eq!(state.status, "ACTIVE");
        assert!(state.strict_rule_order);
        assert_eq!(state.stateless_rule_groups.len(), 1);
        assert_eq!(state.stateful_default_actions, ["aws:drop_strict"]);
    }
}
