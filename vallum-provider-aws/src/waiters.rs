//! Per-resource wait configurations
//!
//! Each resource kind carries its own timeouts, poll intervals,
//! consecutive-target requirements, and not-found tolerances. The values are
//! configuration, tuned per resource type; no universal policy is assumed.

use std::time::Duration;

use aws_sdk_networkfirewall::types::{
    ConfigurationSyncState, FirewallStatusValue, ResourceStatus, TransitGatewayAttachmentStatus,
};
use vallum_core::backoff::BackoffPolicy;
use vallum_core::waiter::{NotFoundPolicy, WaitSpec};

/// Firewalls take minutes to place endpoints into subnets.
pub fn firewall_create() -> WaitSpec<FirewallStatusValue> {
    WaitSpec::new(
        vec![FirewallStatusValue::Provisioning],
        vec![FirewallStatusValue::Ready],
    )
    .with_failure(vec![FirewallStatusValue::Deleting])
    .with_timeout(Duration::from_secs(30 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(30)).with_jitter(0.2))
    // Describe can lag the create for a few reads.
    .with_not_found(NotFoundPolicy::PendingGrace(4))
}

pub fn firewall_delete() -> WaitSpec<FirewallStatusValue> {
    WaitSpec::new(
        vec![
            FirewallStatusValue::Deleting,
            FirewallStatusValue::Ready,
            FirewallStatusValue::Provisioning,
        ],
        vec![],
    )
    .with_timeout(Duration::from_secs(30 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(30)).with_jitter(0.2))
    .with_not_found(NotFoundPolicy::SuccessAfter(2))
}

/// Per-AZ sync summaries flap while attachments settle; require two
/// consecutive in-sync reads before declaring the update applied.
pub fn firewall_config_sync() -> WaitSpec<ConfigurationSyncState> {
    WaitSpec::new(
        vec![ConfigurationSyncState::Pending],
        vec![ConfigurationSyncState::InSync],
    )
    .with_failure(vec![ConfigurationSyncState::CapacityConstrained])
    .with_timeout(Duration::from_secs(15 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(10)).with_jitter(0.2))
    .with_consecutive_targets(2)
}

pub fn firewall_policy_create() -> WaitSpec<ResourceStatus> {
    WaitSpec::new(vec![], vec![ResourceStatus::Active])
        .with_failure(vec![ResourceStatus::Error])
        .with_timeout(Duration::from_secs(5 * 60))
        .with_interval(BackoffPolicy::fixed(Duration::from_secs(5)).with_jitter(0.2))
        .with_not_found(NotFoundPolicy::PendingGrace(3))
}

/// Policies linger in DELETING while firewalls still reference them.
pub fn firewall_policy_delete() -> WaitSpec<ResourceStatus> {
    WaitSpec::new(
        vec![ResourceStatus::Deleting, ResourceStatus::Active],
        vec![],
    )
    .with_timeout(Duration::from_secs(10 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(10)).with_jitter(0.2))
    .with_not_found(NotFoundPolicy::SuccessAfter(1))
}

pub fn rule_group_create() -> WaitSpec<ResourceStatus> {
    WaitSpec::new(vec![], vec![ResourceStatus::Active])
        .with_failure(vec![ResourceStatus::Error])
        .with_timeout(Duration::from_secs(5 * 60))
        .with_interval(BackoffPolicy::fixed(Duration::from_secs(5)).with_jitter(0.2))
        .with_not_found(NotFoundPolicy::PendingGrace(3))
}

pub fn rule_group_delete() -> WaitSpec<ResourceStatus> {
    WaitSpec::new(
        vec![ResourceStatus::Deleting, ResourceStatus::Active],
        vec![],
    )
    .with_timeout(Duration::from_secs(10 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(10)).with_jitter(0.2))
    .with_not_found(NotFoundPolicy::SuccessAfter(1))
}

/// Certificate association makes TLS config updates slower than the other
/// token-updated resources.
pub fn tls_config_create() -> WaitSpec<ResourceStatus> {
    WaitSpec::new(vec![], vec![ResourceStatus::Active])
        .with_failure(vec![ResourceStatus::Error])
        .with_timeout(Duration::from_secs(10 * 60))
        .with_interval(BackoffPolicy::fixed(Duration::from_secs(10)).with_jitter(0.2))
        .with_not_found(NotFoundPolicy::PendingGrace(3))
}

pub fn tls_config_delete() -> WaitSpec<ResourceStatus> {
    WaitSpec::new(
        vec![ResourceStatus::Deleting, ResourceStatus::Active],
        vec![],
    )
    .with_timeout(Duration::from_secs(10 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(10)).with_jitter(0.2))
    .with_not_found(NotFoundPolicy::SuccessAfter(2))
}

pub fn association_create() -> WaitSpec<FirewallStatusValue> {
    WaitSpec::new(
        vec![FirewallStatusValue::Provisioning],
        vec![FirewallStatusValue::Ready],
    )
    .with_failure(vec![FirewallStatusValue::Deleting])
    .with_timeout(Duration::from_secs(20 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(15)).with_jitter(0.2))
    .with_not_found(NotFoundPolicy::PendingGrace(3))
}

pub fn association_delete() -> WaitSpec<FirewallStatusValue> {
    WaitSpec::new(
        vec![
            FirewallStatusValue::Deleting,
            FirewallStatusValue::Ready,
            FirewallStatusValue::Provisioning,
        ],
        vec![],
    )
    .with_timeout(Duration::from_secs(20 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(15)).with_jitter(0.2))
    .with_not_found(NotFoundPolicy::SuccessAfter(2))
}

pub fn transit_gateway_accept() -> WaitSpec<TransitGatewayAttachmentStatus> {
    WaitSpec::new(
        vec![
            TransitGatewayAttachmentStatus::PendingAcceptance,
            TransitGatewayAttachmentStatus::Creating,
        ],
        vec![TransitGatewayAttachmentStatus::Ready],
    )
    .with_failure(vec![
        TransitGatewayAttachmentStatus::Failed,
        TransitGatewayAttachmentStatus::Error,
        TransitGatewayAttachmentStatus::Rejecting,
        TransitGatewayAttachmentStatus::Rejected,
        TransitGatewayAttachmentStatus::Deleting,
        TransitGatewayAttachmentStatus::Deleted,
    ])
    .with_timeout(Duration::from_secs(15 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(15)).with_jitter(0.2))
    // The sync state can lag the accept call by a read or two.
    .with_not_found(NotFoundPolicy::PendingGrace(2))
}

pub fn transit_gateway_reject() -> WaitSpec<TransitGatewayAttachmentStatus> {
    WaitSpec::new(
        vec![
            TransitGatewayAttachmentStatus::PendingAcceptance,
            TransitGatewayAttachmentStatus::Rejecting,
        ],
        vec![TransitGatewayAttachmentStatus::Rejected],
    )
    .with_failure(vec![
        TransitGatewayAttachmentStatus::Failed,
        TransitGatewayAttachmentStatus::Error,
        TransitGatewayAttachmentStatus::Deleting,
        TransitGatewayAttachmentStatus::Deleted,
    ])
    .with_timeout(Duration::from_secs(15 * 60))
    .with_interval(BackoffPolicy::fixed(Duration::from_secs(15)).with_jitter(0.2))
    // A rejected attachment's sync state disappears once detached.
    .with_not_found(NotFoundPolicy::SuccessAfter(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_waits_tolerate_bounded_not_found() {
        assert_eq!(
            firewall_create().not_found(),
            NotFoundPolicy::PendingGrace(4)
        );
        assert_eq!(
            firewall_policy_create().not_found(),
            NotFoundPolicy::PendingGrace(3)
        );
    }

    #[test]
    fn delete_waits_require_consecutive_not_found() {
        assert_eq!(
            firewall_delete().not_found(),
            NotFoundPolicy::SuccessAfter(2)
        );
        assert_eq!(
            firewall_policy_delete().not_found(),
            NotFoundPolicy::SuccessAfter(1)
        );
        assert!(firewall_delete().target().is_empty());
    }

    #[test]
    fn config_sync_requires_two_consecutive_in_sync_reads() {
        let spec = firewall_config_sync();
        assert_eq!(spec.consecutive_targets(), 2);
        assert_eq!(spec.target(), &[ConfigurationSyncState::InSync]);
        assert_eq!(spec.failure(), &[ConfigurationSyncState::CapacityConstrained]);
    }

    #[test]
    fn accept_treats_rejection_as_terminal_failure() {
        let spec = transit_gateway_accept();
        assert!(spec
            .failure()
            .contains(&TransitGatewayAttachmentStatus::Rejected));
        assert_eq!(spec.target(), &[TransitGatewayAttachmentStatus::Ready]);
    }
}
