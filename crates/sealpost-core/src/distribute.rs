//! Send orchestration.
//!
//! A send either stores the payload locally after every recipient's node
//! confirmed it, or fails with nothing stored locally:
//!
//! 1. Resolve the sender key
//! 2. Resolve the privacy group (recipient list or group id)
//! 3. Effective recipients = members - sender + always-send-to keys
//! 4. Encrypt once
//! 5. Check every remote recipient is routable (no I/O yet)
//! 6. Compute the digest once
//! 7. Push a stripped copy to each remote node, concurrently
//! 8. Persist the full payload locally
//!
//! There is no cross-node atomicity: a crash between step 7 and step 8
//! leaves peers holding a payload the sender does not. Retrying encrypts
//! with fresh nonces, so the retry has a different digest.

use std::sync::Arc;

use sealpost_crypto::{CryptoError, Enclave, EncryptedPayload, PrivacyGroupType, PublicKey};

use crate::{
    SealpostError,
    model::{PrivacyGroupPayload, QueryPrivacyGroupPayload},
    network::{NetworkNodes, PeerClient},
    propagation::{propagate, route_remote},
    views::{StorageView, Stores},
};

/// Who a payload is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    /// Flat recipient list; the node finds or creates a legacy group for it
    Recipients(Vec<PublicKey>),
    /// Existing privacy group by id
    PrivacyGroup(String),
}

/// Encrypts, propagates and stores payloads.
pub struct DistributePayloadManager {
    enclave: Arc<dyn Enclave>,
    stores: Stores,
    nodes: Arc<NetworkNodes>,
    client: Arc<dyn PeerClient>,
}

impl DistributePayloadManager {
    /// Manager over the node's enclave, storage, directory and peer client.
    pub fn new(
        enclave: Arc<dyn Enclave>,
        stores: Stores,
        nodes: Arc<NetworkNodes>,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        Self { enclave, stores, nodes, client }
    }

    /// Encrypt `plaintext` for `target` and distribute it.
    ///
    /// Returns the payload digest, identical on this node and every peer
    /// that stored it.
    pub async fn send(
        &self,
        plaintext: &[u8],
        from: Option<PublicKey>,
        target: SendTarget,
    ) -> Result<String, SealpostError> {
        let sender = resolve_sender(self.enclave.as_ref(), from)?;

        let group = match target {
            SendTarget::Recipients(to) => self.legacy_group(sender, to).await?,
            SendTarget::PrivacyGroup(id) => self.active_group(&id).await?,
        };
        let group_id = group.id();

        let recipients = self.recipients(&group, &sender);
        let payload = self
            .enclave
            .encrypt(plaintext, Some(&sender), &recipients, Some(&group.random_seed))?
            .with_privacy_group_id(group_id.clone());

        let routes = route_remote(&self.nodes, &self.enclave.node_keys(), &recipients)?;
        let digest = payload.digest();

        let legs = routes_by_node(routes)
            .into_iter()
            .map(|(url, keys)| Ok((url, payload.strip_for_all(&keys)?)))
            .collect::<Result<Vec<(String, EncryptedPayload)>, SealpostError>>()?;
        let remote = legs.len();

        let client = Arc::clone(&self.client);
        propagate(legs, &digest, move |url, stripped| {
            let client = Arc::clone(&client);
            async move { client.push(&url, &stripped).await }
        })
        .await?;

        self.stores.payloads.put(&payload).await?;

        tracing::debug!(
            digest = %digest,
            privacy_group_id = %group_id,
            recipients = recipients.len(),
            remote_nodes = remote,
            "Payload distributed"
        );

        Ok(digest)
    }

    /// Members minus the sender, plus the always-send-to keys.
    fn recipients(&self, group: &PrivacyGroupPayload, sender: &PublicKey) -> Vec<PublicKey> {
        let mut recipients: Vec<PublicKey> =
            group.addresses.iter().filter(|key| *key != sender).copied().collect();

        for key in self.enclave.always_send_to() {
            if key != *sender && !recipients.contains(&key) {
                recipients.push(key);
            }
        }

        recipients
    }

    async fn active_group(&self, id: &str) -> Result<PrivacyGroupPayload, SealpostError> {
        self.stores
            .groups
            .get(id)
            .await?
            .filter(PrivacyGroupPayload::is_active)
            .ok_or_else(|| SealpostError::PrivacyGroupMissing(id.to_string()))
    }

    /// Reuse the legacy group indexed for `to ∪ {sender}`, or create one.
    ///
    /// Two concurrent first sends to the same set may both create a group;
    /// both get indexed and later sends reuse the first.
    async fn legacy_group(
        &self,
        sender: PublicKey,
        to: Vec<PublicKey>,
    ) -> Result<PrivacyGroupPayload, SealpostError> {
        let mut addresses = to;
        addresses.push(sender);
        let candidate = PrivacyGroupPayload::legacy(addresses, self.enclave.generate_random_seed());
        let query_digest = candidate.query_digest();

        if let Some(entry) = self.stores.queries.get(&query_digest).await? {
            for id in &entry.privacy_group_ids {
                let reusable = self.stores.groups.get(id).await?.filter(|group| {
                    group.is_active() && group.group_type == PrivacyGroupType::Legacy
                });
                if let Some(group) = reusable {
                    return Ok(group);
                }
            }
        }

        let id = self.stores.groups.put(&candidate).await?;
        self.stores
            .queries
            .update(
                &query_digest,
                &QueryPrivacyGroupPayload::appending(candidate.addresses.clone(), id.clone()),
            )
            .await?;

        tracing::debug!(
            privacy_group_id = %id,
            members = candidate.addresses.len(),
            "Created legacy privacy group"
        );

        Ok(candidate)
    }
}

/// Group routed recipients by hosting node, so a node hosting several
/// recipients gets one push carrying all of their combined keys.
fn routes_by_node(routes: Vec<(PublicKey, String)>) -> Vec<(String, Vec<PublicKey>)> {
    let mut nodes: Vec<(String, Vec<PublicKey>)> = Vec::new();
    for (key, url) in routes {
        match nodes.iter_mut().find(|(known, _)| *known == url) {
            Some((_, keys)) => keys.push(key),
            None => nodes.push((url, vec![key])),
        }
    }
    nodes
}

/// Explicit sender, else the node's first key.
pub(crate) fn resolve_sender(
    enclave: &dyn Enclave,
    from: Option<PublicKey>,
) -> Result<PublicKey, SealpostError> {
    match from {
        Some(key) => Ok(key),
        None => enclave
            .node_keys()
            .first()
            .copied()
            .ok_or(SealpostError::Crypto(CryptoError::NoSenderKey)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_group_by_node_in_order() {
        let a = PublicKey::from([1u8; 32]);
        let b = PublicKey::from([2u8; 32]);
        let c = PublicKey::from([3u8; 32]);

        let grouped = routes_by_node(vec![
            (a, "http://n1".to_string()),
            (b, "http://n2".to_string()),
            (c, "http://n1".to_string()),
        ]);

        assert_eq!(
            grouped,
            vec![("http://n1".to_string(), vec![a, c]), ("http://n2".to_string(), vec![b])]
        );
    }
}
