//! Error types for Network Firewall provider operations

use std::fmt;

use thiserror::Error;
use vallum_core::error::BoxError;

/// The resource kinds this provider manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Firewall,
    FirewallPolicy,
    RuleGroup,
    TlsInspectionConfiguration,
    VpcEndpointAssociation,
    TransitGatewayAttachment,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Firewall => "firewall",
            Self::FirewallPolicy => "firewall policy",
            Self::RuleGroup => "rule group",
            Self::TlsInspectionConfiguration => "TLS inspection configuration",
            Self::VpcEndpointAssociation => "VPC endpoint association",
            Self::TransitGatewayAttachment => "transit gateway attachment",
        };
        f.write_str(name)
    }
}

/// Error type for provider operations.
///
/// Wait failures keep the underlying `WaitError` as `source`, so callers can
/// still distinguish a timeout from a terminal failure state.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The named resource does not exist.
    #[error("{kind} `{name}` not found")]
    NotFound { kind: ResourceKind, name: String },

    /// The control plane rejected or failed a call.
    #[error("{kind} `{name}`: {context} failed: {source}")]
    Api {
        kind: ResourceKind,
        name: String,
        context: &'static str,
        #[source]
        source: BoxError,
    },

    /// The API response was missing a field we depend on.
    #[error("{kind} `{name}`: response missing {field}")]
    MissingField {
        kind: ResourceKind,
        name: String,
        field: &'static str,
    },

    /// The typed spec could not be converted into a valid API request.
    #[error("invalid {kind} spec `{name}`: {source}")]
    InvalidSpec {
        kind: ResourceKind,
        name: String,
        #[source]
        source: BoxError,
    },

    /// Waiting on an asynchronous transition did not reach the target state.
    #[error("waiting on {kind} `{name}`: {source}")]
    Wait {
        kind: ResourceKind,
        name: String,
        #[source]
        source: BoxError,
    },
}

impl ProviderError {
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn api(
        kind: ResourceKind,
        name: impl Into<String>,
        context: &'static str,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Api {
            kind,
            name: name.into(),
            context,
            source: source.into(),
        }
    }

    pub fn missing_field(kind: ResourceKind, name: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            kind,
            name: name.into(),
            field,
        }
    }

    pub fn invalid_spec(
        kind: ResourceKind,
        name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::InvalidSpec {
            kind,
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn wait(
        kind: ResourceKind,
        name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Wait {
            kind,
            name: name.into(),
            source: source.into(),
        }
    }

    /// True when the error means the resource simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_the_resource() {
        let err = ProviderError::not_found(ResourceKind::Firewall, "edge-fw");
        assert_eq!(err.to_string(), "firewall `edge-fw` not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn api_error_display_includes_context() {
        let err = ProviderError::api(
            ResourceKind::RuleGroup,
            "drop-bad-domains",
            "CreateRuleGroup",
            "capacity exceeded",
        );
        let msg = err.to_string();
        assert!(msg.contains("rule group `drop-bad-domains`"));
        assert!(msg.contains("CreateRuleGroup"));
    }
}
