//! Tag conversion between spec tag maps and the SDK's key/value list

use std::collections::BTreeMap;

use aws_sdk_networkfirewall::types::Tag;

use crate::error::{ProviderError, ProviderResult, ResourceKind};

/// Convert a spec tag map into the SDK tag list. Empty maps become `None`
/// so the request omits the member entirely.
pub(crate) fn tags_to_api(
    kind: ResourceKind,
    name: &str,
    tags: &BTreeMap<String, String>,
) -> ProviderResult<Option<Vec<Tag>>> {
    if tags.is_empty() {
        return Ok(None);
    }
    let mut out = Vec::with_capacity(tags.len());
    for (key, value) in tags {
        let tag = Tag::builder()
            .key(key)
            .value(value)
            .build()
            .map_err(|e| ProviderError::invalid_spec(kind, name, e))?;
        out.push(tag);
    }
    Ok(Some(out))
}

/// Convert the SDK tag list back into an ordered map.
pub(crate) fn tags_from_api(tags: &[Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|t| (t.key().to_string(), t.value().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_is_omitted() {
        let tags = tags_to_api(ResourceKind::Firewall, "fw", &BTreeMap::new()).unwrap();
        assert!(tags.is_none());
    }

    #[test]
    fn tags_round_trip() {
        let mut map = BTreeMap::new();
        map.insert("Environment".to_string(), "production".to_string());
        map.insert("Team".to_string(), "netsec".to_string());

        let api = tags_to_api(ResourceKind::Firewall, "fw", &map)
            .unwrap()
            .unwrap();
        assert_eq!(api.len(), 2);
        assert_eq!(tags_from_api(&api), map);
    }
}
