//! Privacy group records.

use sealpost_crypto::{
    PrivacyGroupType, PublicKey, address_set_digest, base64_bytes, privacy_group_id,
};
use serde::{Deserialize, Serialize};

/// Lifecycle of a privacy group. The only transition is `Active` to
/// `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrivacyGroupState {
    /// Group accepts sends
    Active,
    /// Group was deleted; sends to it fail
    Deleted,
}

/// An identified set of participant keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyGroupPayload {
    /// Member keys
    pub addresses: Vec<PublicKey>,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Lifecycle state; not part of the identity
    pub state: PrivacyGroupState,
    /// How the group was created
    #[serde(rename = "type")]
    pub group_type: PrivacyGroupType,
    /// Seed mixed into the identity
    #[serde(with = "base64_bytes")]
    pub random_seed: Vec<u8>,
}

impl PrivacyGroupPayload {
    /// Implicit group for a flat recipient list.
    pub fn legacy(addresses: Vec<PublicKey>, random_seed: Vec<u8>) -> Self {
        Self {
            addresses: dedup(addresses),
            name: "legacy".to_string(),
            description: "Privacy group created from a recipient list".to_string(),
            state: PrivacyGroupState::Active,
            group_type: PrivacyGroupType::Legacy,
            random_seed,
        }
    }

    /// Explicitly created group.
    pub fn explicit(
        addresses: Vec<PublicKey>,
        name: impl Into<String>,
        description: impl Into<String>,
        random_seed: Vec<u8>,
    ) -> Self {
        Self {
            addresses: dedup(addresses),
            name: name.into(),
            description: description.into(),
            state: PrivacyGroupState::Active,
            group_type: PrivacyGroupType::Explicit,
            random_seed,
        }
    }

    /// Identity over (addresses, seed, type).
    pub fn id(&self) -> String {
        privacy_group_id(&self.addresses, Some(&self.random_seed), self.group_type)
    }

    /// Key of the query-index entry covering this group's address set.
    pub fn query_digest(&self) -> String {
        address_set_digest(&self.addresses)
    }

    /// True while the group accepts sends.
    pub fn is_active(&self) -> bool {
        self.state == PrivacyGroupState::Active
    }

    /// True if `key` is one of the members.
    pub fn has_member(&self, key: &PublicKey) -> bool {
        self.addresses.contains(key)
    }

    /// Same group in the `Deleted` state.
    #[must_use]
    pub fn deleted(mut self) -> Self {
        self.state = PrivacyGroupState::Deleted;
        self
    }
}

/// Secondary index entry: every group id created for one exact address set.
///
/// `to_delete` and `privacy_group_to_append` describe an update rather than
/// stored state: merging appends (or removes) that one id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPrivacyGroupPayload {
    /// The indexed address set
    pub addresses: Vec<PublicKey>,
    /// Group ids ever created for the set, oldest first
    pub privacy_group_ids: Vec<String>,
    /// Remove `privacy_group_to_append` instead of appending it
    #[serde(default)]
    pub to_delete: bool,
    /// Id to merge into the stored entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_group_to_append: Option<String>,
}

impl QueryPrivacyGroupPayload {
    /// Update appending `id` to the entry for `addresses`.
    pub fn appending(addresses: Vec<PublicKey>, id: String) -> Self {
        Self {
            addresses,
            privacy_group_ids: vec![id.clone()],
            to_delete: false,
            privacy_group_to_append: Some(id),
        }
    }

    /// Update removing `id` from the entry for `addresses`.
    pub fn removing(addresses: Vec<PublicKey>, id: String) -> Self {
        Self {
            addresses,
            privacy_group_ids: Vec::new(),
            to_delete: true,
            privacy_group_to_append: Some(id),
        }
    }

    /// Seed-free digest over the address set.
    pub fn digest(&self) -> String {
        address_set_digest(&self.addresses)
    }

    /// Apply this update to `stored`, returning the new stored state.
    pub(crate) fn merge_into(&self, stored: Option<Self>) -> Self {
        let mut ids = match stored {
            Some(existing) => existing.privacy_group_ids,
            None if self.to_delete => Vec::new(),
            None => self.privacy_group_ids.clone(),
        };

        if let Some(id) = &self.privacy_group_to_append {
            if self.to_delete {
                ids.retain(|existing| existing != id);
            } else if !ids.contains(id) {
                ids.push(id.clone());
            }
        }

        Self {
            addresses: self.addresses.clone(),
            privacy_group_ids: ids,
            to_delete: false,
            privacy_group_to_append: None,
        }
    }
}

fn dedup(addresses: Vec<PublicKey>) -> Vec<PublicKey> {
    let mut unique = Vec::with_capacity(addresses.len());
    for address in addresses {
        if !unique.contains(&address) {
            unique.push(address);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> PublicKey {
        PublicKey::from([byte; 32])
    }

    #[test]
    fn state_is_not_part_of_identity() {
        let group = PrivacyGroupPayload::explicit(vec![key(1), key(2)], "g", "d", vec![9; 32]);
        let id = group.id();
        assert_eq!(group.deleted().id(), id);
    }

    #[test]
    fn legacy_and_explicit_ids_differ() {
        let legacy = PrivacyGroupPayload::legacy(vec![key(1), key(2)], vec![9; 32]);
        let explicit = PrivacyGroupPayload::explicit(vec![key(1), key(2)], "g", "d", vec![9; 32]);
        assert_ne!(legacy.id(), explicit.id());
        assert_eq!(legacy.query_digest(), explicit.query_digest());
    }

    #[test]
    fn addresses_are_deduplicated() {
        let group = PrivacyGroupPayload::legacy(vec![key(1), key(2), key(1)], vec![]);
        assert_eq!(group.addresses, vec![key(1), key(2)]);
    }

    #[test]
    fn merge_appends_once_and_removes() {
        let addresses = vec![key(1), key(2)];
        let first = QueryPrivacyGroupPayload::appending(addresses.clone(), "a".into()).merge_into(None);
        assert_eq!(first.privacy_group_ids, vec!["a".to_string()]);

        let second = QueryPrivacyGroupPayload::appending(addresses.clone(), "b".into())
            .merge_into(Some(first.clone()));
        let again = QueryPrivacyGroupPayload::appending(addresses.clone(), "b".into())
            .merge_into(Some(second.clone()));
        assert_eq!(again.privacy_group_ids, vec!["a".to_string(), "b".to_string()]);

        let removed =
            QueryPrivacyGroupPayload::removing(addresses, "a".into()).merge_into(Some(again));
        assert_eq!(removed.privacy_group_ids, vec!["b".to_string()]);
        assert!(!removed.to_delete);
    }

    #[test]
    fn removing_from_missing_entry_stores_empty_list() {
        let merged = QueryPrivacyGroupPayload::removing(vec![key(3)], "x".into()).merge_into(None);
        assert!(merged.privacy_group_ids.is_empty());
    }

    #[test]
    fn group_json_shape() {
        let group = PrivacyGroupPayload::legacy(vec![key(1)], vec![0; 4]);
        let json = serde_json::to_value(&group).unwrap();

        assert_eq!(json["state"], "ACTIVE");
        assert_eq!(json["type"], "LEGACY");
        assert_eq!(json["randomSeed"], "AAAAAA==");
    }
}
