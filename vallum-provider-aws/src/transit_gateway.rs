//! Transit gateway attachment acceptance
//!
//! A firewall attached to a transit gateway in another account surfaces an
//! attachment in PENDING_ACCEPTANCE. The owning side accepts or rejects it;
//! the attachment status is then polled through the firewall's status until
//! it settles.

use aws_sdk_networkfirewall::Client;
use aws_sdk_networkfirewall::types::TransitGatewayAttachmentStatus;
use serde::Serialize;
use tracing::info;
use vallum_core::arn::Arn;
use vallum_core::error::ProbeError;
use vallum_core::waiter::{BoxFuture, Completion, Probe, StatusProber, wait_for};

use crate::error::{ProviderError, ProviderResult, ResourceKind};
use crate::provider::{NetworkFirewallProvider, RemoteFault, classify};
use crate::waiters;

const KIND: ResourceKind = ResourceKind::TransitGatewayAttachment;

/// Observed state of a transit gateway attachment after accept/reject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitGatewayAttachmentState {
    pub attachment_id: String,
    pub status: String,
}

/// Reads the attachment status from the owning firewall's sync state.
pub(crate) struct AttachmentStatusProber {
    client: Client,
    firewall_arn: Arn,
}

impl AttachmentStatusProber {
    pub(crate) fn new(client: Client, firewall_arn: Arn) -> Self {
        Self {
            client,
            firewall_arn,
        }
    }
}

impl StatusProber for AttachmentStatusProber {
    type Status = TransitGatewayAttachmentStatus;

    fn probe(&self) -> BoxFuture<'_, Result<Probe<TransitGatewayAttachmentStatus>, ProbeError>> {
        Box::pin(async move {
            match self
                .client
                .describe_firewall()
                .firewall_arn(self.firewall_arn.as_str())
                .send()
                .await
            {
                Ok(out) => Ok(out
                    .firewall_status()
                    .and_then(|s| s.transit_gateway_attachment_sync_state())
                    .and_then(|s| s.transit_gateway_attachment_status())
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

fn attachment_state(
    attachment_id: &str,
    completion: Completion<TransitGatewayAttachmentStatus>,
) -> TransitGatewayAttachmentState {
    let status = match completion {
        Completion::Reached(status) => status.as_str().to_string(),
        Completion::Gone => TransitGatewayAttachmentStatus::Deleted.as_str().to_string(),
    };
    TransitGatewayAttachmentState {
        attachment_id: attachment_id.to_string(),
        status,
    }
}

impl NetworkFirewallProvider {
    /// Accept a pending attachment and block until it is READY.
    pub async fn accept_transit_gateway_attachment(
        &self,
        firewall_arn: &Arn,
        attachment_id: &str,
    ) -> ProviderResult<TransitGatewayAttachmentState> {
        self.client
            .accept_network_firewall_transit_gateway_attachment()
            .transit_gateway_attachment_id(attachment_id)
            .send()
            .await
            .map_err(|e| {
                ProviderError::api(
                    KIND,
                    attachment_id,
                    "AcceptNetworkFirewallTransitGatewayAttachment",
                    e,
                )
            })?;

        info!(attachment = %attachment_id, "accepted, waiting for READY");
        let prober = AttachmentStatusProber::new(self.client.clone(), firewall_arn.clone());
        let completion = wait_for(&waiters::transit_gateway_accept(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, attachment_id, e))?;

        Ok(attachment_state(attachment_id, completion))
    }

    /// Reject a pending attachment and block until the rejection settles.
    pub async fn reject_transit_gateway_attachment(
        &self,
        firewall_arn: &Arn,
        attachment_id: &str,
    ) -> ProviderResult<TransitGatewayAttachmentState> {
        self.client
            .reject_network_firewall_transit_gateway_attachment()
            .transit_gateway_attachment_id(attachment_id)
            .send()
            .await
            .map_err(|e| {
                ProviderError::api(
                    KIND,
                    attachment_id,
                    "RejectNetworkFirewallTransitGatewayAttachment",
                    e,
                )
            })?;

        info!(attachment = %attachment_id, "rejected, waiting for settlement");
        let prober = AttachmentStatusProber::new(self.client.clone(), firewall_arn.clone());
        let completion = wait_for(&waiters::transit_gateway_reject(), &prober)
            .await
            .map_err(|e| ProviderError::wait(KIND, attachment_id, e))?;

        Ok(attachment_state(attachment_id, completion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reached_completion_reports_the_observed_status() {
        let state = attachment_state(
            "tgw-attach-0001",
            Completion::Reached(TransitGatewayAttachmentStatus::Ready),
        );
        assert_eq!(state.attachment_id, "tgw-attach-0001");
        assert_eq!(state.status, "READY");
    }

    #[test]
    fn gone_completion_reports_deleted() {
        let state = attachment_state("tgw-attach-0001", Completion::Gone);
        assert_eq!(state.status, "DELETED");
    }
}
