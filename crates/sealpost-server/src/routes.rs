//! HTTP endpoints.
//!
//! Every handler decodes its body, dispatches into [`NodeService`] and maps
//! [`SealpostError`] to `{"error": "<code>"}` with the code's status class.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sealpost_core::{
    ErrorCode, NodeService, PartyInfo, PrivacyGroupPayload, SealpostError,
    api::{
        CreatePrivacyGroupRequest, DeletePrivacyGroupRequest, ErrorBody, FindPrivacyGroupRequest,
        PrivacyGroupResponse, ReceiveRequest, ReceiveResponse, RetrievePrivacyGroupRequest,
        SendRequest, SendResponse,
    },
};
use sealpost_crypto::EncryptedPayload;
use tower_http::trace::TraceLayer;

type Node = State<Arc<NodeService>>;
type Body<T> = Result<Json<T>, JsonRejection>;

/// Router serving every node endpoint.
pub fn router(service: Arc<NodeService>) -> Router {
    Router::new()
        .route("/upcheck", get(upcheck))
        .route("/partyinfo", post(party_info))
        .route("/push", post(push))
        .route("/pushPrivacyGroup", post(push_privacy_group))
        .route("/send", post(send))
        .route("/receive", post(receive))
        .route("/createPrivacyGroup", post(create_privacy_group))
        .route("/deletePrivacyGroup", post(delete_privacy_group))
        .route("/findPrivacyGroup", post(find_privacy_group))
        .route("/retrievePrivacyGroup", post(retrieve_privacy_group))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Failure of a single request.
#[derive(Debug)]
pub enum ApiError {
    /// The node rejected the operation
    Node(SealpostError),
    /// The body was not the expected JSON
    Body(JsonRejection),
}

impl From<SealpostError> for ApiError {
    fn from(err: SealpostError) -> Self {
        Self::Node(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, body) = match self {
            Self::Node(err) => {
                let code = err.code();
                if code.http_status() >= 500 {
                    tracing::warn!(error = %err, code = code.as_str(), "Request failed");
                } else {
                    tracing::debug!(error = %err, code = code.as_str(), "Request rejected");
                }
                (code, ErrorBody::from(&err))
            },
            Self::Body(rejection) => {
                tracing::debug!(error = %rejection, "Malformed request body");
                let code = ErrorCode::InvalidPayload;
                (code, ErrorBody { error: code.as_str().to_string() })
            },
        };

        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

async fn upcheck(State(node): Node) -> &'static str {
    node.upcheck()
}

async fn party_info(State(node): Node, body: Body<PartyInfo>) -> Result<Json<PartyInfo>, ApiError> {
    let Json(incoming) = body?;
    let (snapshot, _) = node.party_info(&incoming);
    Ok(Json(snapshot))
}

async fn push(State(node): Node, body: Body<EncryptedPayload>) -> Result<String, ApiError> {
    let Json(payload) = body?;
    Ok(node.push(&payload).await?)
}

async fn push_privacy_group(
    State(node): Node,
    body: Body<PrivacyGroupPayload>,
) -> Result<String, ApiError> {
    let Json(group) = body?;
    Ok(node.push_privacy_group(&group).await?)
}

async fn send(State(node): Node, body: Body<SendRequest>) -> Result<Json<SendResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(node.send(&request).await?))
}

async fn receive(
    State(node): Node,
    body: Body<ReceiveRequest>,
) -> Result<Json<ReceiveResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(node.receive(&request).await?))
}

async fn create_privacy_group(
    State(node): Node,
    body: Body<CreatePrivacyGroupRequest>,
) -> Result<Json<PrivacyGroupResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(node.create_privacy_group(request).await?))
}

async fn delete_privacy_group(
    State(node): Node,
    body: Body<DeletePrivacyGroupRequest>,
) -> Result<Json<String>, ApiError> {
    let Json(request) = body?;
    Ok(Json(node.delete_privacy_group(&request).await?))
}

async fn find_privacy_group(
    State(node): Node,
    body: Body<FindPrivacyGroupRequest>,
) -> Result<Json<Vec<PrivacyGroupResponse>>, ApiError> {
    let Json(request) = body?;
    Ok(Json(node.find_privacy_group(&request).await?))
}

async fn retrieve_privacy_group(
    State(node): Node,
    body: Body<RetrievePrivacyGroupRequest>,
) -> Result<Json<PrivacyGroupResponse>, ApiError> {
    let Json(request) = body?;
    Ok(Json(node.retrieve_privacy_group(&request).await?))
}
