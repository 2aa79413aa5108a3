//! Explicit privacy group management.
//!
//! Groups are replicated to every member's node before they are stored
//! locally, with the same all-or-nothing rule as payload sends. Deletion is
//! the only state change a group ever sees.

use std::sync::Arc;

use sealpost_crypto::{Enclave, PublicKey, address_set_digest};

use crate::{
    SealpostError,
    distribute::resolve_sender,
    model::{PrivacyGroupPayload, QueryPrivacyGroupPayload},
    network::{NetworkNodes, PeerClient},
    propagation::{propagate, route_remote},
    views::{StorageView, Stores},
};

/// Creates, deletes and looks up privacy groups.
pub struct PrivacyGroupManager {
    enclave: Arc<dyn Enclave>,
    stores: Stores,
    nodes: Arc<NetworkNodes>,
    client: Arc<dyn PeerClient>,
}

impl PrivacyGroupManager {
    /// Manager over the node's enclave, storage, directory and peer client.
    pub fn new(
        enclave: Arc<dyn Enclave>,
        stores: Stores,
        nodes: Arc<NetworkNodes>,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        Self { enclave, stores, nodes, client }
    }

    /// Create an explicit group of `addresses` and `from`.
    pub async fn create(
        &self,
        from: Option<PublicKey>,
        addresses: Vec<PublicKey>,
        name: String,
        description: String,
    ) -> Result<PrivacyGroupPayload, SealpostError> {
        let creator = resolve_sender(self.enclave.as_ref(), from)?;

        let mut members = addresses;
        members.push(creator);
        let group = PrivacyGroupPayload::explicit(
            members,
            name,
            description,
            self.enclave.generate_random_seed(),
        );
        let id = group.id();

        self.replicate(&group, &id).await?;
        self.store(&group).await?;

        tracing::info!(
            privacy_group_id = %id,
            members = group.addresses.len(),
            "Created privacy group"
        );

        Ok(group)
    }

    /// Mark group `id` deleted on every member node, then locally.
    pub async fn delete(&self, id: &str, from: Option<PublicKey>) -> Result<String, SealpostError> {
        let requester = resolve_sender(self.enclave.as_ref(), from)?;
        let group = self.retrieve(id).await?;

        if !group.is_active() {
            return Err(SealpostError::PrivacyGroupMissing(id.to_string()));
        }
        if !group.has_member(&requester) {
            return Err(SealpostError::DeleteFromNotMember {
                member: requester.to_base64(),
                group: id.to_string(),
            });
        }

        let deleted = group.deleted();
        self.replicate(&deleted, id).await?;
        self.store(&deleted).await?;

        tracing::info!(privacy_group_id = %id, "Deleted privacy group");

        Ok(id.to_string())
    }

    /// Every active group created for exactly `addresses`.
    pub async fn find(
        &self,
        addresses: &[PublicKey],
    ) -> Result<Vec<PrivacyGroupPayload>, SealpostError> {
        let Some(entry) = self.stores.queries.get(&address_set_digest(addresses)).await? else {
            return Ok(Vec::new());
        };

        let mut groups = Vec::with_capacity(entry.privacy_group_ids.len());
        for id in &entry.privacy_group_ids {
            let group = self.stores.groups.get(id).await?;
            groups.extend(group.filter(PrivacyGroupPayload::is_active));
        }

        Ok(groups)
    }

    /// Group by id, in whatever state it is.
    pub async fn retrieve(&self, id: &str) -> Result<PrivacyGroupPayload, SealpostError> {
        self.stores
            .groups
            .get(id)
            .await?
            .ok_or_else(|| SealpostError::PrivacyGroupMissing(id.to_string()))
    }

    /// Store a group pushed by a peer. Returns its id.
    ///
    /// A stored deleted group stays deleted: a late or replayed active push
    /// is acknowledged but not applied.
    pub async fn receive(&self, group: &PrivacyGroupPayload) -> Result<String, SealpostError> {
        let id = group.id();
        let stored = self.stores.groups.get(&id).await?;
        if group.is_active() && stored.is_some_and(|stored| !stored.is_active()) {
            tracing::debug!(privacy_group_id = %id, "Ignored push reviving a deleted privacy group");
            return Ok(id);
        }

        let id = self.store(group).await?;
        tracing::debug!(
            privacy_group_id = %id,
            state = ?group.state,
            "Stored pushed privacy group"
        );
        Ok(id)
    }

    /// Push `group` to the node of every member this node does not host.
    async fn replicate(&self, group: &PrivacyGroupPayload, id: &str) -> Result<(), SealpostError> {
        let routes = route_remote(&self.nodes, &self.enclave.node_keys(), &group.addresses)?;

        let mut urls: Vec<String> = Vec::with_capacity(routes.len());
        for (_, url) in routes {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        let legs: Vec<(String, PrivacyGroupPayload)> =
            urls.into_iter().map(|url| (url, group.clone())).collect();

        let client = Arc::clone(&self.client);
        propagate(legs, id, move |url, group| {
            let client = Arc::clone(&client);
            async move { client.push_privacy_group(&url, &group).await }
        })
        .await
    }

    /// Write the group and keep the query index in step with its state.
    async fn store(&self, group: &PrivacyGroupPayload) -> Result<String, SealpostError> {
        let id = self.stores.groups.put(group).await?;

        let index_update = if group.is_active() {
            QueryPrivacyGroupPayload::appending(group.addresses.clone(), id.clone())
        } else {
            QueryPrivacyGroupPayload::removing(group.addresses.clone(), id.clone())
        };
        self.stores.queries.update(&group.query_digest(), &index_update).await?;

        Ok(id)
    }
}
