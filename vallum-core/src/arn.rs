//! Arn - Opaque identifier for a remote resource

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier string naming a remote resource.
///
/// The control plane assigns it once at creation and it never changes; it is
/// used as the polling key and is never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arn(String);

impl Arn {
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Arn {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Arn {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arn_is_treated_as_opaque_text() {
        let arn = Arn::new("arn:aws:network-firewall:us-east-1:123456789012:firewall/example");
        assert_eq!(
            arn.to_string(),
            "arn:aws:network-firewall:us-east-1:123456789012:firewall/example"
        );
        assert_eq!(arn, Arn::from(arn.as_str()));
    }

    #[test]
    fn arn_serializes_as_plain_string() {
        let arn = Arn::new("arn:aws:ec2:us-east-1:123456789012:subnet/subnet-abc");
        let json = serde_json::to_string(&arn).unwrap();
        assert_eq!(json, "\"arn:aws:ec2:us-east-1:123456789012:subnet/subnet-abc\"");
        let back: Arn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, arn);
    }
}
