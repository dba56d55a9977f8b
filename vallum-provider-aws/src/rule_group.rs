//! Rule group lifecycle
//!
//! Stateless and stateful groups share one lifecycle; the kind travels with
//! every call because the API namespaces group names per kind.

use std::collections::BTreeMap;

use aws_sdk_networkfirewall::Client;
use aws_sdk_networkfirewall::types::{
    GeneratedRulesType, MatchAttributes, ResourceStatus, RuleDefinition, RuleGroup,
    RuleGroupResponse, RuleGroupType, RulesSource, RulesSourceList, StatelessRule,
    StatelessRulesAndCustomActions, TargetType,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use vallum_core::arn::Arn;
use vallum_core::error::ProbeError;
use vallum_core::waiter::{BoxFuture, Probe, StatusProber, wait_for};

use crate::error::{ProviderError, ProviderResult, ResourceKind};
use crate::provider::{NetworkFirewallProvider, RemoteFault, classify, read_error};
use crate::tags::{tags_from_api, tags_to_api};
use crate::types::{PortRangeSpec, addresses_to_api, port_ranges_to_api};
use crate::waiters;

const KIND: ResourceKind = ResourceKind::RuleGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleGroupKind {
    Stateless,
    Stateful,
}

impl RuleGroupKind {
    pub(crate) fn to_api(self) -> RuleGroupType {
        match self {
            Self::Stateless => RuleGroupType::Stateless,
            Self::Stateful => RuleGroupType::Stateful,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainTarget {
    TlsSni,
    HttpHost,
}

impl DomainTarget {
    fn to_api(self) -> TargetType {
        match self {
            Self::TlsSni => TargetType::TlsSni,
            Self::HttpHost => TargetType::HttpHost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainAction {
    Allow,
    Deny,
}

impl DomainAction {
    fn to_api(self) -> GeneratedRulesType {
        match self {
            Self::Allow => GeneratedRulesType::Allowlist,
            Self::Deny => GeneratedRulesType::Denylist,
        }
    }
}

/// One typed stateless rule: priority, match attributes, actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatelessRuleSpec {
    pub priority: i32,
    pub actions: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default)]
    pub source_ports: Vec<PortRangeSpec>,
    #[serde(default)]
    pub destination_ports: Vec<PortRangeSpec>,
    #[serde(default)]
    pub protocols: Vec<i32>,
}

/// The rules a group evaluates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleGroupRules {
    /// Suricata-compatible rules (stateful groups).
    RulesString(String),
    /// Generated domain allow/deny list (stateful groups).
    DomainList {
        targets: Vec<String>,
        target_types: Vec<DomainTarget>,
        action: DomainAction,
    },
    /// Typed 5-tuple rules (stateless groups).
    StatelessRules(Vec<StatelessRuleSpec>),
}

/// Desired configuration of a rule group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroupSpec {
    pub name: String,
    pub kind: RuleGroupKind,
    /// Processing capacity units. Immutable after create.
    pub capacity: i32,
    pub rules: RuleGroupRules,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Observed state of a rule group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleGroupState {
    pub arn: Arn,
    pub name: String,
    pub kind: String,
    pub capacity: Option<i32>,
    pub status: String,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
}

fn rules_to_api(spec: &RuleGroupSpec) -> ProviderResult<RulesSource> {
    match &spec.rules {
        RuleGroupRules::RulesString(rules) => {
            Ok(RulesSource::builder().rules_string(rules).build())
        }
        RuleGroupRules::DomainList {
            targets,
            target_types,
            action,
        } => {
            let mut list = RulesSourceList::builder()
                .set_targets(Some(targets.clone()))
                .generated_rules_type(action.to_api());
            for target_type in target_types {
                list = list.target_types(target_type.to_api());
            }
            let list = list
                .build()
                .map_err(|e| ProviderError::invalid_spec(KIND, &spec.name, e))?;
            Ok(RulesSource::builder().rules_source_list(list).build())
        }
        RuleGroupRules::StatelessRules(rules) => {
            let mut built = Vec::with_capacity(rules.len());
            for rule in rules {
                let mut attrs = MatchAttributes::builder();
                if !rule.sources.is_empty() {
                    attrs = attrs
                        .set_sources(Some(addresses_to_api(KIND, &spec.name, &rule.sources)?));
                }
                if !rule.destinations.is_empty() {
                    attrs = attrs.set_destinations(Some(addresses_to_api(
                        KIND,
                        &spec.name,
                        &rule.destinations,
                    )?));
                }
                if !rule.source_ports.is_empty() {
                    attrs = attrs.set_source_ports(Some(port_ranges_to_api(
                        KIND,
                        &spec.name,
                        &rule.source_ports,
                    )?));
                }
                if !rule.destination_ports.is_empty() {
                    attrs = attrs.set_destination_ports(Some(port_ranges_to_api(
                        KIND,
                        &spec.name,
                        &rule.destination_ports,
                    )?));
                }
                if !rule.protocols.is_empty() {
                    attrs = attrs.set_protocols(Some(rule.protocols.clone()));
                }

                let definition = RuleDefinition::builder()
                    .match_attributes(attrs.build())
                    .set_actions(Some(rule.actions.clone()))
                    .build()
                    .map_err(|e| ProviderError::invalid_spec(KIND, &spec.name, e))?;
                let rule = StatelessRule::builder()
                    .rule_definition(definition)
                    .priority(rule.priority)
                    .build()
                    .map_err(|e| ProviderError::invalid_spec(KIND, &spec.name, e))?;
                built.push(rule);
            }
            let container = StatelessRulesAndCustomActions::builder()
                .set_stateless_rules(Some(built))
                .build()
                .map_err(|e| ProviderError::invalid_spec(KIND, &spec.name, e))?;
            Ok(RulesSource::builder()
                .stateless_rules_and_custom_actions(container)
                .build())
        }
    }
}

fn rule_group_to_api(spec: &RuleGroupSpec) -> ProviderResult<RuleGroup> {
    Ok(RuleGroup::builder()
        .rules_source(rules_to_api(spec)?)
        .build())
}

fn rule_group_state(response: &RuleGroupResponse) -> RuleGroupState {
    RuleGroupState {
        arn: Arn::from(response.rule_group_arn()),
        name: response.rule_group_name().to_string(),
        kind: response
            .r#type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
        capacity: response.capacity(),
        status: response
            .rule_group_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        description: response.description().map(str::to_string),
        tags: tags_from_api(response.tags()),
    }
}

/// Reads the rule group's resource status.
pub(crate) struct RuleGroupStatusProber {
    client: Client,
    name: String,
    kind: RuleGroupType,
}

impl RuleGroupStatusProber {
    pub(crate) fn new(client: Client, name: impl Into<String>, kind: RuleGroupType) -> Self {
        Self {
            client,
            name: name.into(),
            kind,
        }
    }
}

impl StatusProber for RuleGroupStatusProber {
    type Status = ResourceStatus;

    fn probe(&self) -> BoxFuture<'_, Result<Probe<ResourceStatus>, ProbeError>> {
        Box::pin(async move {
            match self
                .client
                .describe_rule_group()
                .rule_group_name(&self.name)
                .r#type(self.kind.clone())
                .send()
                .await
            {
                Ok(out) => Ok(out
                    .rule_group_response()
                    .and_then(|r| r.rule_group_status())
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
    /// Create a rule group and block until it is ACTIVE.
    pub async fn create_rule_group(&self, spec: &RuleGroupSpec) -> ProviderResult<RuleGroupState> {
        let rule_group = rule_group_to_api(spec)?;
        let tags = tags_to_api(KIND, &spec.name, &spec.tags)?;

        self.client
            .create_rule_group()
            .rule_group_name(&spec.name)
            .r#type(spec.kind.to_api())
            .capacity(spec.capacity)
            .rule_group(rule_group)
            .set_description(spec.description.clone())
            .set_tags(tags)
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, &spec.name, "CreateRuleGroup", e))?;

        info!(rule_group = %spec.name, "create issued, waiting for ACTIVE");
        let prober =
            RuleGroupStatusProber::new(self.client.clone(), &spec.name, spec.kind.to_api());
        wait_for(&waiters::rule_group_create(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, &spec.name, e))?;

        self.describe_rule_group(&spec.name, spec.kind).await
    }

    pub async fn describe_rule_group(
        &self,
        name: &str,
        kind: RuleGroupKind,
    ) -> ProviderResult<RuleGroupState> {
        let out = self
            .client
            .describe_rule_group()
            .rule_group_name(name)
            .r#type(kind.to_api())
            .send()
            .await
            .map_err(|e| read_error(KIND, name, "DescribeRuleGroup", e))?;

        let response = out
            .rule_group_response()
            .ok_or_else(|| ProviderError::missing_field(KIND, name, "rule_group_response"))?;
        Ok(rule_group_state(response))
    }

    /// Replace the group's rules, carrying the current update token.
    /// Capacity cannot change here; the API rejects it.
    pub async fn update_rule_group(&self, spec: &RuleGroupSpec) -> ProviderResult<RuleGroupState> {
        let token = self.rule_group_update_token(&spec.name, spec.kind).await?;
        let rule_group = rule_group_to_api(spec)?;

        self.client
            .update_rule_group()
            .update_token(token)
            .rule_group_name(&spec.name)
            .r#type(spec.kind.to_api())
            .rule_group(rule_group)
            .set_description(spec.description.clone())
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, &spec.name, "UpdateRuleGroup", e))?;

        self.describe_rule_group(&spec.name, spec.kind).await
    }

    /// Delete a rule group and block until it is gone.
    pub async fn delete_rule_group(&self, name: &str, kind: RuleGroupKind) -> ProviderResult<()> {
        self.client
            .delete_rule_group()
            .rule_group_name(name)
            .r#type(kind.to_api())
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, name, "DeleteRuleGroup", e))?;

        info!(rule_group = %name, "delete issued, waiting for removal");
        let prober = RuleGroupStatusProber::new(self.client.clone(), name, kind.to_api());
        wait_for(&waiters::rule_group_delete(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, name, e))?;
        Ok(())
    }

    async fn rule_group_update_token(
        &self,
        name: &str,
        kind: RuleGroupKind,
    ) -> ProviderResult<String> {
        let out = self
            .client
            .describe_rule_group()
            .rule_group_name(name)
            .r#type(kind.to_api())
            .send()
            .await
            .map_err(|e| read_error(KIND, name, "DescribeRuleGroup", e))?;
        Ok(out.update_token().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with(rules: RuleGroupRules, kind: RuleGroupKind) -> RuleGroupSpec {
        RuleGroupSpec {
            name: "rg".to_string(),
            kind,
            capacity: 100,
            rules,
            description: None,
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn rules_string_maps_directly() {
        let spec = spec_with(
            RuleGroupRules::RulesString("pass tcp any any -> any any (sid:1;)".to_string()),
            RuleGroupKind::Stateful,
        );
        let api = rules_to_api(&spec).unwrap();
        assert!(api.rules_string().unwrap().contains("sid:1"));
    }

    #[test]
    fn domain_list_maps_targets_and_action() {
        let spec = spec_with(
            RuleGroupRules::DomainList {
                targets: vec![".example.com".to_string(), "bad.test".to_string()],
                target_types: vec![DomainTarget::TlsSni, DomainTarget::HttpHost],
                action: DomainAction::Deny,
            },
            RuleGroupKind::Stateful,
        );
        let api = rules_to_api(&spec).unwrap();
        let list = api.rules_source_list().unwrap();
        assert_eq!(list.targets().len(), 2);
        assert_eq!(list.target_types().len(), 2);
        assert_eq!(list.generated_rules_type(), &GeneratedRulesType::Denylist);
    }

    #[test]
    fn stateless_rules_map_priority_and_match_attributes() {
        let spec = spec_with(
            RuleGroupRules::StatelessRules(vec![StatelessRuleSpec {
                priority: 5,
                actions: vec!["aws:drop".to_string()],
                sources: vec!["10.0.0.0/8".to_string()],
                destinations: vec![],
                source_ports: vec![],
                destination_ports: vec![PortRangeSpec { from: 80, to: 443 }],
                protocols: vec![6],
            }]),
            RuleGroupKind::Stateless,
        );
        let api = rules_to_api(&spec).unwrap();
        let rules = api
            .stateless_rules_and_custom_actions()
            .unwrap()
            .stateless_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].priority(), 5);
        let definition = rules[0].rule_definition().unwrap();
        assert_eq!(definition.actions(), ["aws:drop"]);
        let attrs = definition.match_attributes().unwrap();
        assert_eq!(attrs.sources().len(), 1);
        assert_eq!(attrs.destination_ports()[0].to_port(), 443);
        assert_eq!(attrs.protocols(), [6]);
    }

    #[test]
    fn rule_group_state_maps_response_fields() {
        let response = RuleGroupResponse::builder()
            .rule_group_arn(
                "arn:aws:network-firewall:us-east-1:123456789012:stateful-rulegroup/rg",
            )
            .rule_group_name("rg")
            .rule_group_id("rg-0001")
            .r#type(RuleGroupType::Stateful)
            .capacity(100)
            .rule_group_status(ResourceStatus::Active)
            .build()
            .unwrap();
        let state = rule_group_state(&response);
        assert_eq!(state.name, "rg");
        assert_eq!(state.kind, "STATEFUL");
        assert_eq!(state.capacity, Some(100));
        assert_eq!(state.status, "ACTIVE");
    }
}
