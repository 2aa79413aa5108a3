//! One node's operations, independent of transport.
//!
//! The HTTP server and the simulation harness both dispatch into a
//! [`NodeService`], so every endpoint behaves identically in either setting.

use std::sync::Arc;

use sealpost_crypto::{Enclave, EncryptedPayload};

use crate::{
    PartyInfo, SealpostError,
    api::{
        CreatePrivacyGroupRequest, DeletePrivacyGroupRequest, FindPrivacyGroupRequest,
        PrivacyGroupResponse, ReceiveRequest, ReceiveResponse, RetrievePrivacyGroupRequest,
        SendRequest, SendResponse, decode_keys,
    },
    distribute::DistributePayloadManager,
    model::PrivacyGroupPayload,
    network::{NetworkNodes, PeerClient},
    privacy_groups::PrivacyGroupManager,
    receive::ReceiveManager,
    storage::KeyValueStore,
    views::Stores,
};

/// Answer of `/upcheck`.
pub const UPCHECK_RESPONSE: &str = "I'm up!";

/// Every operation a node serves.
pub struct NodeService {
    nodes: Arc<NetworkNodes>,
    stores: Stores,
    distribute: DistributePayloadManager,
    receive: ReceiveManager,
    groups: PrivacyGroupManager,
}

impl NodeService {
    /// Assemble a node and advertise its keys at its own URL.
    pub fn new(
        enclave: Arc<dyn Enclave>,
        store: Arc<dyn KeyValueStore>,
        nodes: Arc<NetworkNodes>,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        for key in enclave.node_keys() {
            nodes.add_node(key, nodes.url());
        }

        let stores = Stores::new(store);
        let distribute = DistributePayloadManager::new(
            Arc::clone(&enclave),
            stores.clone(),
            Arc::clone(&nodes),
            Arc::clone(&client),
        );
        let receive = ReceiveManager::new(Arc::clone(&enclave), stores.payloads.clone());
        let groups = PrivacyGroupManager::new(enclave, stores.clone(), Arc::clone(&nodes), client);

        Self { nodes, stores, distribute, receive, groups }
    }

    /// Peer directory.
    pub fn nodes(&self) -> &Arc<NetworkNodes> {
        &self.nodes
    }

    /// Storage views.
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Send orchestration.
    pub fn distribute(&self) -> &DistributePayloadManager {
        &self.distribute
    }

    /// Payload reads.
    pub fn receiver(&self) -> &ReceiveManager {
        &self.receive
    }

    /// Privacy group management.
    pub fn groups(&self) -> &PrivacyGroupManager {
        &self.groups
    }

    /// Merge a peer's directory snapshot and answer with ours.
    ///
    /// The flag is true if the peer taught this node anything new.
    pub fn party_info(&self, incoming: &PartyInfo) -> (PartyInfo, bool) {
        let learned = self.nodes.merge(incoming);
        if learned {
            tracing::debug!(peer = %incoming.url, "Learned nodes from inbound exchange");
        }
        (self.nodes.snapshot(), learned)
    }

    /// Store a payload pushed by a peer. Returns the digest to echo.
    pub async fn push(&self, payload: &EncryptedPayload) -> Result<String, SealpostError> {
        self.receive.store_pushed(payload).await
    }

    /// Store a privacy group pushed by a peer. Returns the id to echo.
    pub async fn push_privacy_group(
        &self,
        group: &PrivacyGroupPayload,
    ) -> Result<String, SealpostError> {
        self.groups.receive(group).await
    }

    /// Encrypt and distribute a client payload.
    pub async fn send(&self, request: &SendRequest) -> Result<SendResponse, SealpostError> {
        let plaintext = request.plaintext()?;
        let from = request.sender()?;
        let target = request.target()?;

        let key = self.distribute.send(&plaintext, from, target).await?;
        Ok(SendResponse { key })
    }

    /// Decrypt a stored payload for a client.
    pub async fn receive(
        &self,
        request: &ReceiveRequest,
    ) -> Result<ReceiveResponse, SealpostError> {
        let identity = request.identity()?;
        let received = self.receive.receive(&request.key, identity).await?;
        Ok(ReceiveResponse::new(&received.payload, received.privacy_group_id, &received.sender))
    }

    /// Create an explicit privacy group.
    pub async fn create_privacy_group(
        &self,
        request: CreatePrivacyGroupRequest,
    ) -> Result<PrivacyGroupResponse, SealpostError> {
        let addresses = decode_keys(&request.addresses)?;
        let from = request.creator()?;

        let group = self
            .groups
            .create(
                from,
                addresses,
                request.name.unwrap_or_default(),
                request.description.unwrap_or_default(),
            )
            .await?;
        Ok(PrivacyGroupResponse::from(&group))
    }

    /// Delete a privacy group. Returns its id.
    pub async fn delete_privacy_group(
        &self,
        request: &DeletePrivacyGroupRequest,
    ) -> Result<String, SealpostError> {
        let from = request.requester()?;
        self.groups.delete(&request.privacy_group_id, from).await
    }

    /// Active groups for an exact member set.
    pub async fn find_privacy_group(
        &self,
        request: &FindPrivacyGroupRequest,
    ) -> Result<Vec<PrivacyGroupResponse>, SealpostError> {
        let addresses = decode_keys(&request.addresses)?;
        let groups = self.groups.find(&addresses).await?;
        Ok(groups.iter().map(PrivacyGroupResponse::from).collect())
    }

    /// Group by id.
    pub async fn retrieve_privacy_group(
        &self,
        request: &RetrievePrivacyGroupRequest,
    ) -> Result<PrivacyGroupResponse, SealpostError> {
        let group = self.groups.retrieve(&request.privacy_group_id).await?;
        Ok(PrivacyGroupResponse::from(&group))
    }

    /// Liveness answer.
    pub fn upcheck(&self) -> &'static str {
        UPCHECK_RESPONSE
    }
}
