//! Network Firewall provider
//!
//! Owns the SDK client and the mapping from SDK failures onto the
//! not-found / transient / fatal taxonomy. Lifecycle operations live in the
//! per-resource modules and hang off [`NetworkFirewallProvider`].

use aws_config::Region;
use aws_sdk_networkfirewall::Client;
use aws_sdk_networkfirewall::error::{ProvideErrorMetadata, SdkError};

use crate::error::{ProviderError, ResourceKind};

/// AWS Network Firewall provider.
///
/// The client is constructed once and injected; resource operations borrow
/// it rather than reaching for an ambient singleton.
pub struct NetworkFirewallProvider {
    pub(crate) client: Client,
    region: String,
}

impl NetworkFirewallProvider {
    /// Create a provider for the specified region using the default
    /// credential chain.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&config),
            region: region.to_string(),
        }
    }

    /// Build a provider around an existing client (tests, shared
    /// configuration, alternative credential providers).
    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Classification of a failed SDK call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteFault {
    /// The resource does not exist.
    NotFound,
    /// Retry-eligible: throttling, server-side 5xx, connection trouble.
    Transient,
    /// Everything else. Propagate immediately.
    Fatal,
}

/// Map an SDK error onto the remote fault taxonomy.
///
/// Connector-level timeouts and dispatch failures never carry a service
/// code, so they are matched structurally before the code lookup.
pub(crate) fn classify<E, R>(err: &SdkError<E, R>) -> RemoteFault
where
    E: ProvideErrorMetadata,
{
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => RemoteFault::Transient,
        _ => match err.code() {
            Some("ResourceNotFoundException") => RemoteFault::NotFound,
            Some("ThrottlingException") | Some("InternalServerError") => RemoteFault::Transient,
            _ => RemoteFault::Fatal,
        },
    }
}

/// Map an SDK error from a read call into a provider error, folding
/// `ResourceNotFoundException` into [`ProviderError::NotFound`].
pub(crate) fn read_error<E, R>(
    kind: ResourceKind,
    name: &str,
    context: &'static str,
    err: SdkError<E, R>,
) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match classify(&err) {
        RemoteFault::NotFound => ProviderError::not_found(kind, name),
        _ => ProviderError::api(kind, name, context, err),
    }
}
