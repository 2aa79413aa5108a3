//! Concurrent fan-out to peer nodes with echo verification.
//!
//! Each leg is a spawned task. The aggregate fails as soon as one leg fails;
//! legs still in flight keep running detached and their results are ignored.

use std::future::Future;

use futures::future::try_join_all;
use sealpost_crypto::PublicKey;

use crate::{
    SealpostError,
    network::{NetworkNodes, PeerError},
};

/// Hosting node of every key in `keys` that is not one of `local`.
///
/// Fails on the first key without a known node, before any network I/O.
pub(crate) fn route_remote(
    nodes: &NetworkNodes,
    local: &[PublicKey],
    keys: &[PublicKey],
) -> Result<Vec<(PublicKey, String)>, SealpostError> {
    keys.iter()
        .filter(|key| !local.contains(key))
        .map(|key| {
            nodes
                .url_for_recipient(key)
                .map(|url| (*key, url))
                .ok_or_else(|| SealpostError::NodeMissingPeerUrl(key.to_base64()))
        })
        .collect()
}

/// Push one item per `(url, item)` leg and require every peer to echo
/// `expected`.
pub(crate) async fn propagate<T, F, Fut>(
    legs: Vec<(String, T)>,
    expected: &str,
    send: F,
) -> Result<(), SealpostError>
where
    T: Send + 'static,
    F: Fn(String, T) -> Fut,
    Fut: Future<Output = Result<String, PeerError>> + Send + 'static,
{
    let tasks = legs.into_iter().map(|(url, item)| {
        let call = send(url.clone(), item);
        let expected = expected.to_string();
        let leg_url = url.clone();
        let handle = tokio::spawn(async move { check_echo(&leg_url, call.await, &expected) });

        async move {
            handle.await.map_err(|e| SealpostError::NodePushingToPeer {
                url,
                reason: format!("push task failed: {e}"),
            })?
        }
    });

    try_join_all(tasks).await?;
    Ok(())
}

fn check_echo(
    url: &str,
    response: Result<String, PeerError>,
    expected: &str,
) -> Result<(), SealpostError> {
    let err = match response {
        Ok(echo) if echo.trim() == expected => return Ok(()),
        Ok(echo) => SealpostError::NodePropagatingToAllPeers {
            url: url.to_string(),
            reason: format!("peer echoed {echo}, expected {expected}"),
        },
        Err(PeerError::Transport(reason)) => {
            SealpostError::NodePushingToPeer { url: url.to_string(), reason }
        },
        Err(e) => SealpostError::NodePropagatingToAllPeers {
            url: url.to_string(),
            reason: e.to_string(),
        },
    };

    tracing::warn!(url = %url, error = %err, "Propagation leg failed");
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn routing_skips_local_keys_and_fails_on_unknown() {
        let nodes = NetworkNodes::new("http://a");
        let local = PublicKey::from([1u8; 32]);
        let remote = PublicKey::from([2u8; 32]);
        let unknown = PublicKey::from([3u8; 32]);
        nodes.add_node(remote, "http://b");

        let routes = route_remote(&nodes, &[local], &[local, remote]).unwrap();
        assert_eq!(routes, vec![(remote, "http://b".to_string())]);

        let err = route_remote(&nodes, &[local], &[remote, unknown]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NodeMissingPeerUrl);
    }

    #[tokio::test]
    async fn all_echoes_match() {
        let legs = vec![("http://a".to_string(), 1), ("http://b".to_string(), 2)];
        let result =
            propagate(legs, "d", |_, _| async { Ok::<_, PeerError>("d".to_string()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn no_legs_is_success() {
        let legs: Vec<(String, ())> = Vec::new();
        let result =
            propagate(legs, "d", |_, ()| async { Ok::<_, PeerError>("x".to_string()) }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn mismatch_fails_propagation() {
        let legs = vec![("http://a".to_string(), ())];
        let err = propagate(legs, "d", |_, ()| async { Ok::<_, PeerError>("other".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NodePropagatingToAllPeers);
    }

    #[tokio::test]
    async fn status_fails_propagation_and_transport_fails_push() {
        let legs = vec![("http://a".to_string(), ())];
        let err = propagate(legs, "d", |_, ()| async { Err::<String, _>(PeerError::Status(500)) })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NodePropagatingToAllPeers);

        let legs = vec![("http://a".to_string(), ())];
        let err = propagate(legs, "d", |_, ()| async {
            Err::<String, _>(PeerError::Transport("connection refused".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NodePushingToPeer);
    }
}
