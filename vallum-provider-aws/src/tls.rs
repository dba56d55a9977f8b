//! TLS inspection configuration lifecycle

use std::collections::BTreeMap;

use aws_sdk_networkfirewall::Client;
use aws_sdk_networkfirewall::types::{
    CheckCertificateRevocationStatusActions, ResourceStatus, RevocationCheckAction,
    ServerCertificate, ServerCertificateConfiguration, ServerCertificateScope,
    TlsInspectionConfiguration, TlsInspectionConfigurationResponse,
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

const KIND: ResourceKind = ResourceKind::TlsInspectionConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationAction {
    Pass,
    Drop,
    Reject,
}

impl RevocationAction {
    fn to_api(self) -> RevocationCheckAction {
        match self {
            Self::Pass => RevocationCheckAction::Pass,
            Self::Drop => RevocationCheckAction::Drop,
            Self::Reject => RevocationCheckAction::Reject,
        }
    }
}

/// What to do with connections whose certificate is revoked or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationCheckSpec {
    pub revoked_action: RevocationAction,
    pub unknown_action: RevocationAction,
}

/// Traffic a server certificate configuration applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsScopeSpec {
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

/// Server certificates (inbound inspection) or a CA (outbound inspection)
/// plus the scopes they cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCertificateConfigSpec {
    #[serde(default)]
    pub server_certificate_arns: Vec<Arn>,
    #[serde(default)]
    pub certificate_authority_arn: Option<Arn>,
    #[serde(default)]
    pub scopes: Vec<TlsScopeSpec>,
    #[serde(default)]
    pub revocation_check: Option<RevocationCheckSpec>,
}

/// Desired configuration of a TLS inspection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsInspectionSpec {
    pub name: String,
    pub server_certificate_configurations: Vec<ServerCertificateConfigSpec>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Observed state of a TLS inspection configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TlsInspectionState {
    pub arn: Arn,
    pub name: String,
    pub status: String,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
}

fn scope_to_api(name: &str, scope: &TlsScopeSpec) -> ProviderResult<ServerCertificateScope> {
    let mut builder = ServerCertificateScope::builder();
    if !scope.sources.is_empty() {
        builder = builder.set_sources(Some(addresses_to_api(KIND, name, &scope.sources)?));
    }
    if !scope.destinations.is_empty() {
        builder = builder.set_destinations(Some(addresses_to_api(KIND, name, &scope.destinations)?));
    }
    if !scope.source_ports.is_empty() {
        builder = builder.set_source_ports(Some(port_ranges_to_api(KIND, name, &scope.source_ports)?));
    }
    if !scope.destination_ports.is_empty() {
        builder = builder.set_destination_ports(Some(port_ranges_to_api(
            KIND,
            name,
            &scope.destination_ports,
        )?));
    }
    if !scope.protocols.is_empty() {
        builder = builder.set_protocols(Some(scope.protocols.clone()));
    }
    Ok(builder.build())
}

fn tls_configuration_to_api(spec: &TlsInspectionSpec) -> ProviderResult<TlsInspectionConfiguration> {
    let mut builder = TlsInspectionConfiguration::builder();
    for config in &spec.server_certificate_configurations {
        let mut cert_config = ServerCertificateConfiguration::builder();
        for cert_arn in &config.server_certificate_arns {
            cert_config = cert_config.server_certificates(
                ServerCertificate::builder()
                    .resource_arn(cert_arn.as_str())
                    .build(),
            );
        }
        if let Some(ca_arn) = &config.certificate_authority_arn {
            cert_config = cert_config.certificate_authority_arn(ca_arn.as_str());
        }
        for scope in &config.scopes {
            cert_config = cert_config.scopes(scope_to_api(&spec.name, scope)?);
        }
        if let Some(check) = &config.revocation_check {
            cert_config = cert_config.check_certificate_revocation_status(
                CheckCertificateRevocationStatusActions::builder()
                    .revoked_status_action(check.revoked_action.to_api())
                    .unknown_status_action(check.unknown_action.to_api())
                    .build(),
            );
        }
        builder = builder.server_certificate_configurations(cert_config.build());
    }
    Ok(builder.build())
}

fn tls_state(response: &TlsInspectionConfigurationResponse) -> TlsInspectionState {
    TlsInspectionState {
        arn: Arn::from(response.tls_inspection_configuration_arn()),
        name: response.tls_inspection_configuration_name().to_string(),
        status: response
            .tls_inspection_configuration_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        description: response.description().map(str::to_string),
        tags: tags_from_api(response.tags()),
    }
}

/// Reads the configuration's resource status.
pub(crate) struct TlsStatusProber {
    client: Client,
    name: String,
}

impl TlsStatusProber {
    pub(crate) fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }
}

impl StatusProber for TlsStatusProber {
    type Status = ResourceStatus;

    fn probe(&self) -> BoxFuture<'_, Result<Probe<ResourceStatus>, ProbeError>> {
        Box::pin(async move {
            match self
                .client
                .describe_tls_inspection_configuration()
                .tls_inspection_configuration_name(&self.name)
                .send()
                .await
            {
                Ok(out) => Ok(out
                    .tls_inspection_configuration_response()
                    .and_then(|r| r.tls_inspection_configuration_status())
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
    /// Create a TLS inspection configuration and block until it is ACTIVE.
    pub async fn create_tls_inspection_configuration(
        &self,
        spec: &TlsInspectionSpec,
    ) -> ProviderResult<TlsInspectionState> {
        let configuration = tls_configuration_to_api(spec)?;
        let tags = tags_to_api(KIND, &spec.name, &spec.tags)?;

        self.client
            .create_tls_inspection_configuration()
            .tls_inspection_configuration_name(&spec.name)
            .tls_inspection_configuration(configuration)
            .set_description(spec.description.clone())
            .set_tags(tags)
            .send()
            .await
            .map_err(|e| {
                ProviderError::api(KIND, &spec.name, "CreateTLSInspectionConfiguration", e)
            })?;

        info!(tls_config = %spec.name, "create issued, waiting for ACTIVE");
        let prober = TlsStatusProber::new(self.client.clone(), &spec.name);
        wait_for(&waiters::tls_config_create(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, &spec.name, e))?;

        self.describe_tls_inspection_configuration(&spec.name).await
    }

    pub async fn describe_tls_inspection_configuration(
        &self,
        name: &str,
    ) -> ProviderResult<TlsInspectionState> {
        let out = self
            .client
            .describe_tls_inspection_configuration()
            .tls_inspection_configuration_name(name)
            .send()
            .await
            .map_err(|e| read_error(KIND, name, "DescribeTLSInspectionConfiguration", e))?;

        let response = out.tls_inspection_configuration_response().ok_or_else(|| {
            ProviderError::missing_field(KIND, name, "tls_inspection_configuration_response")
        })?;
        Ok(tls_state(response))
    }

    /// Replace the configuration, carrying the current update token.
    pub async fn update_tls_inspection_configuration(
        &self,
        spec: &TlsInspectionSpec,
    ) -> ProviderResult<TlsInspectionState> {
        let token = self.tls_update_token(&spec.name).await?;
        let configuration = tls_configuration_to_api(spec)?;

        self.client
            .update_tls_inspection_configuration()
            .update_token(token)
            .tls_inspection_configuration_name(&spec.name)
            .tls_inspection_configuration(configuration)
            .set_description(spec.description.clone())
            .send()
            .await
            .map_err(|e| {
                ProviderError::api(KIND, &spec.name, "UpdateTLSInspectionConfiguration", e)
            })?;

        self.describe_tls_inspection_configuration(&spec.name).await
    }

    /// Delete a TLS inspection configuration and block until it is gone.
    pub async fn delete_tls_inspection_configuration(&self, name: &str) -> ProviderResult<()> {
        self.client
            .delete_tls_inspection_configuration()
            .tls_inspection_configuration_name(name)
            .send()
            .await
            .map_err(|e| ProviderError::api(KIND, name, "DeleteTLSInspectionConfiguration", e))?;

        info!(tls_config = %name, "delete issued, waiting for removal");
        let prober = TlsStatusProber::new(self.client.clone(), name);
        wait_for(&waiters::tls_config_delete(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, name, e))?;
        Ok(())
    }

    async fn tls_update_token(&self, name: &str) -> ProviderResult<String> {
        let out = self
            .client
            .describe_tls_inspection_configuration()
            .tls_inspection_configuration_name(name)
            .send()
            .await
            .map_err(|e| read_error(KIND, name, "DescribeTLSInspectionConfiguration", e))?;
        Ok(out.update_token().to_string())
    }
}
