//! End-to-end scenarios over simulated clusters.
//!
//! Each test builds a small cluster with the real node logic and checks one
//! externally visible behavior: who can read what, what gets stored where,
//! and which error a caller sees when propagation or routing fails.

use std::{sync::Arc, time::Duration};

use sealpost_core::{
    DiscoveryConfig, ErrorCode, MemoryStore, PrivacyGroupState, SendTarget, StorageView,
};
use sealpost_crypto::{PublicKey, address_set_digest};
use sealpost_harness::{Fault, SimCluster};

async fn two_nodes(seed: u64) -> (SimCluster, usize, usize) {
    let mut cluster = SimCluster::new(seed);
    let n1 = cluster.add_node("http://n1", 1, &[]);
    let n2 = cluster.add_node("http://n2", 1, &["http://n1"]);
    cluster.gossip().await;
    assert!(cluster.converged());
    (cluster, n1, n2)
}

fn to(keys: &[PublicKey]) -> SendTarget {
    SendTarget::Recipients(keys.to_vec())
}

#[tokio::test]
async fn single_node_both_keys_read_back() {
    let mut cluster = SimCluster::new(1);
    let n = cluster.add_node("http://n1", 2, &[]);
    let node = cluster.node(n);
    let (k1, k2) = (node.keys[0], node.keys[1]);

    let digest = node.service.distribute().send(b"P", Some(k1), to(&[k2])).await.unwrap();

    let as_recipient = node.service.receiver().receive(&digest, Some(k2)).await.unwrap();
    let as_sender = node.service.receiver().receive(&digest, Some(k1)).await.unwrap();
    assert_eq!(as_recipient.payload, b"P");
    assert_eq!(as_sender.payload, b"P");
    assert_eq!(as_recipient.sender, k1);
    assert_eq!(cluster.network().calls_to("http://n1").push, 0);
}

#[tokio::test]
async fn two_nodes_after_discovery() {
    let (cluster, n1, n2) = two_nodes(2).await;
    let (k1, k2) = (cluster.node(n1).key(), cluster.node(n2).key());

    let digest =
        cluster.node(n1).service.distribute().send(b"P", Some(k1), to(&[k2])).await.unwrap();

    let remote = cluster.node(n2).service.receiver().receive(&digest, Some(k2)).await.unwrap();
    let local = cluster.node(n1).service.receiver().receive(&digest, Some(k1)).await.unwrap();
    assert_eq!(remote.payload, b"P");
    assert_eq!(local.payload, b"P");
    assert_eq!(remote.privacy_group_id, local.privacy_group_id);
}

#[tokio::test]
async fn peer_copy_is_stripped_to_its_recipient() {
    let (cluster, n1, n2) = two_nodes(3).await;
    let (k1, k2) = (cluster.node(n1).key(), cluster.node(n2).key());

    let digest =
        cluster.node(n1).service.distribute().send(b"P", Some(k1), to(&[k2])).await.unwrap();

    let full = cluster.node(n1).service.stores().payloads.get(&digest).await.unwrap().unwrap();
    let stripped = cluster.node(n2).service.stores().payloads.get(&digest).await.unwrap().unwrap();
    assert_eq!(full.combined_keys.len(), 2);
    assert_eq!(stripped.combined_keys.len(), 1);
    assert_eq!(stripped.cipher_text, full.cipher_text);

    // The peer cannot read the payload as the sender.
    let err = cluster.node(n2).service.receiver().receive(&digest, Some(k1)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoPrivateKey);
}

#[tokio::test]
async fn unknown_recipient_fails_before_storing() {
    let store = MemoryStore::new();
    let mut cluster = SimCluster::new(4);
    let n = cluster.add_node_with_store("http://n1", 1, &[], Arc::new(store.clone()));
    let node = cluster.node(n);
    let stranger = PublicKey::from([9u8; 32]);

    let err = node.service.distribute().send(b"P", None, to(&[stranger])).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::NodeMissingPeerUrl);
    assert!(!err.code().is_retryable());
    assert_eq!(store.count_prefix("payload/"), 0);
    assert_eq!(cluster.network().calls_to("http://n1").push, 0);
}

#[tokio::test]
async fn legacy_sends_reuse_the_group() {
    let (cluster, n1, n2) = two_nodes(5).await;
    let (k1, k2) = (cluster.node(n1).key(), cluster.node(n2).key());
    let service = &cluster.node(n1).service;

    let first = service.distribute().send(b"one", Some(k1), to(&[k2])).await.unwrap();
    let second = service.distribute().send(b"two", Some(k1), to(&[k2])).await.unwrap();
    assert_ne!(first, second);

    let index = service.stores().queries.get(&address_set_digest(&[k1, k2])).await.unwrap();
    assert_eq!(index.unwrap().privacy_group_ids.len(), 1);

    let a = service.receiver().receive(&first, Some(k1)).await.unwrap();
    let b = service.receiver().receive(&second, Some(k1)).await.unwrap();
    assert_eq!(a.privacy_group_id, b.privacy_group_id);
}

#[tokio::test]
async fn deleted_group_rejects_sends_everywhere() {
    let (cluster, n1, n2) = two_nodes(6).await;
    let k2 = cluster.node(n2).key();
    let groups = cluster.node(n1).service.groups();

    let group = groups.create(None, vec![k2], "team".into(), "".into()).await.unwrap();
    let id = group.id();
    assert_eq!(cluster.network().calls_to("http://n2").push_privacy_group, 1);

    // Replicated to the member's node and usable from either side.
    let replica = cluster.node(n2).service.groups().retrieve(&id).await.unwrap();
    assert_eq!(replica, group);
    cluster
        .node(n2)
        .service
        .distribute()
        .send(b"hi", None, SendTarget::PrivacyGroup(id.clone()))
        .await
        .unwrap();

    groups.delete(&id, None).await.unwrap();

    for node in [n1, n2] {
        let service = &cluster.node(node).service;
        let err = service
            .distribute()
            .send(b"P", None, SendTarget::PrivacyGroup(id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PrivacyGroupMissing);

        let stored = service.groups().retrieve(&id).await.unwrap();
        assert_eq!(stored.state, PrivacyGroupState::Deleted);
        assert!(service.groups().find(&stored.addresses).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn replayed_active_push_does_not_revive_a_deleted_group() {
    let (cluster, n1, n2) = two_nodes(16).await;
    let k2 = cluster.node(n2).key();
    let groups = cluster.node(n1).service.groups();

    let group = groups.create(None, vec![k2], "desk".into(), "".into()).await.unwrap();
    let id = group.id();
    groups.delete(&id, None).await.unwrap();

    let replica = &cluster.node(n2).service;
    let echoed = replica.push_privacy_group(&group).await.unwrap();
    assert_eq!(echoed, id);

    let stored = replica.groups().retrieve(&id).await.unwrap();
    assert_eq!(stored.state, PrivacyGroupState::Deleted);
    assert!(replica.groups().find(&stored.addresses).await.unwrap().is_empty());

    let err = replica
        .distribute()
        .send(b"P", None, SendTarget::PrivacyGroup(id.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PrivacyGroupMissing);
}

#[tokio::test]
async fn only_members_delete() {
    let mut cluster = SimCluster::new(7);
    let n1 = cluster.add_node("http://n1", 2, &[]);
    let (k1, k2) = (cluster.node(n1).keys[0], cluster.node(n1).keys[1]);
    let groups = cluster.node(n1).service.groups();

    let group = groups.create(Some(k1), vec![], "solo".into(), "".into()).await.unwrap();
    let err = groups.delete(&group.id(), Some(k2)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::DeleteFromNotMember);

    let err = groups.delete("no-such-group", Some(k1)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PrivacyGroupMissing);
}

#[tokio::test]
async fn find_lists_active_groups_for_exact_set() {
    let (cluster, n1, n2) = two_nodes(8).await;
    let (k1, k2) = (cluster.node(n1).key(), cluster.node(n2).key());
    let groups = cluster.node(n1).service.groups();

    let a = groups.create(None, vec![k2], "a".into(), "".into()).await.unwrap();
    let b = groups.create(None, vec![k2], "b".into(), "".into()).await.unwrap();
    assert_ne!(a.id(), b.id());

    let found = groups.find(&[k2, k1]).await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(groups.find(&[k1]).await.unwrap().is_empty());

    groups.delete(&a.id(), None).await.unwrap();
    let found = groups.find(&[k1, k2]).await.unwrap();
    assert_eq!(found, vec![b]);
}

#[tokio::test]
async fn partitioned_recipient_fails_retryably_with_nothing_stored() {
    let store = MemoryStore::new();
    let mut cluster = SimCluster::new(9);
    let n1 = cluster.add_node_with_store("http://n1", 1, &[], Arc::new(store.clone()));
    let n2 = cluster.add_node("http://n2", 1, &["http://n1"]);
    cluster.gossip().await;
    let k2 = cluster.node(n2).key();

    cluster.network().inject("http://n2", Fault::Partitioned);
    let err = cluster.node(n1).service.distribute().send(b"P", None, to(&[k2])).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NodePushingToPeer);
    assert!(err.code().is_retryable());
    assert_eq!(store.count_prefix("payload/"), 0);

    cluster.network().heal("http://n2");
    let digest = cluster.node(n1).service.distribute().send(b"P", None, to(&[k2])).await.unwrap();
    assert_eq!(store.count_prefix("payload/"), 1);
    assert!(cluster.node(n2).service.receiver().receive(&digest, None).await.is_ok());
}

#[tokio::test]
async fn rejected_or_tampered_push_fails_propagation() {
    let (cluster, n1, n2) = two_nodes(10).await;
    let k2 = cluster.node(n2).key();
    let distribute = cluster.node(n1).service.distribute();

    cluster.network().inject("http://n2", Fault::Status(500));
    let err = distribute.send(b"P", None, to(&[k2])).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NodePropagatingToAllPeers);

    cluster.network().inject("http://n2", Fault::TamperedEcho);
    let err = distribute.send(b"P", None, to(&[k2])).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NodePropagatingToAllPeers);
}

#[tokio::test]
async fn one_push_per_node_hosting_several_recipients() {
    let mut cluster = SimCluster::new(11);
    let n1 = cluster.add_node("http://n1", 1, &[]);
    let n2 = cluster.add_node("http://n2", 2, &["http://n1"]);
    cluster.gossip().await;
    let (a, b) = (cluster.node(n2).keys[0], cluster.node(n2).keys[1]);

    let digest = cluster.node(n1).service.distribute().send(b"P", None, to(&[a, b])).await.unwrap();

    assert_eq!(cluster.network().calls_to("http://n2").push, 1);
    let receiver = cluster.node(n2).service.receiver();
    assert_eq!(receiver.receive(&digest, Some(a)).await.unwrap().payload, b"P");
    assert_eq!(receiver.receive(&digest, Some(b)).await.unwrap().payload, b"P");
}

#[tokio::test]
async fn always_send_to_keys_receive_every_payload() {
    let mut cluster = SimCluster::new(12);
    let n1 = cluster.add_node("http://n1", 1, &[]);
    let n2 = cluster.add_node("http://n2", 1, &["http://n1"]);
    let auditor = cluster.add_node("http://audit", 1, &["http://n1"]);
    cluster.gossip().await;

    let audit_key = cluster.node(auditor).key();
    cluster.node(n1).keystore.add_always_send_to(audit_key);

    let k2 = cluster.node(n2).key();
    let digest = cluster.node(n1).service.distribute().send(b"P", None, to(&[k2])).await.unwrap();

    let audited = cluster.node(auditor).service.receiver().receive(&digest, None).await.unwrap();
    assert_eq!(audited.payload, b"P");
}

#[tokio::test(start_paused = true)]
async fn discovery_backoff_in_cluster() {
    let mut cluster = SimCluster::new(13);
    let n1 = cluster.add_node("http://n1", 1, &[]);
    let n2 = cluster.add_node("http://n2", 1, &["http://n1"]);
    assert!(!cluster.converged());

    cluster.start_discovery(DiscoveryConfig {
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(800),
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(cluster.converged());

    tokio::time::sleep(Duration::from_millis(2200)).await;

    // n2's discoverer for n1 ran at 100, 300, 700, 1500 and 2300.
    assert_eq!(cluster.network().calls_to("http://n1").party_info, 5);
    let statuses = cluster.node(n2).discovery().unwrap().discoverers().await;
    let to_n1 = statuses.iter().find(|status| status.url == "http://n1").unwrap();
    assert_eq!(to_n1.ticks, 5);
    assert_eq!(to_n1.delay, Duration::from_millis(800));

    let statuses = cluster.node(n1).discovery().unwrap().discoverers().await;
    assert!(statuses.iter().any(|status| status.url == "http://n2" && status.ticks > 0));

    let k2 = cluster.node(n2).key();
    let digest = cluster.node(n1).service.distribute().send(b"P", None, to(&[k2])).await.unwrap();
    assert!(cluster.node(n2).service.receiver().receive(&digest, None).await.is_ok());

    cluster.shutdown().await;
}

#[tokio::test]
async fn party_info_shape_after_gossip() {
    let (cluster, n1, _) = two_nodes(14).await;
    let info = cluster.node(n1).service.nodes().snapshot();

    assert_eq!(info.node_pks.len(), 2);
    insta::assert_json_snapshot!("party_info_after_gossip", info, {
        ".nodePKs" => "[2 keys]",
    });
}
