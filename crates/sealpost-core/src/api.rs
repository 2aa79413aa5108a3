//! JSON request and response bodies of the client-facing API.
//!
//! Keys travel as base64 strings and are decoded here, so a malformed key
//! surfaces as `DecodePublicKey` rather than as a body rejection.

use base64::{Engine, engine::general_purpose::STANDARD};
use sealpost_crypto::{PrivacyGroupType, PublicKey};
use serde::{Deserialize, Serialize};

use crate::{SealpostError, SendTarget, model::PrivacyGroupPayload};

/// `POST /send`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Base64 plaintext
    pub payload: String,
    /// Base64 sender key; defaults to the node's first key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Base64 recipient keys (legacy mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
    /// Target group (group mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_group_id: Option<String>,
}

impl SendRequest {
    /// Decoded plaintext. Must be non-empty.
    pub fn plaintext(&self) -> Result<Vec<u8>, SealpostError> {
        let bytes = STANDARD
            .decode(&self.payload)
            .map_err(|e| SealpostError::InvalidSendRequest(format!("payload is not base64: {e}")))?;
        if bytes.is_empty() {
            return Err(SealpostError::InvalidSendRequest("payload is empty".to_string()));
        }
        Ok(bytes)
    }

    /// Decoded sender, if given.
    pub fn sender(&self) -> Result<Option<PublicKey>, SealpostError> {
        decode_optional_key(self.from.as_deref())
    }

    /// Exactly one of `to` and `privacyGroupId`.
    pub fn target(&self) -> Result<SendTarget, SealpostError> {
        match (&self.to, &self.privacy_group_id) {
            (Some(to), None) => Ok(SendTarget::Recipients(decode_keys(to)?)),
            (None, Some(id)) => Ok(SendTarget::PrivacyGroup(id.clone())),
            (Some(_), Some(_)) => Err(SealpostError::InvalidSendRequest(
                "both to and privacyGroupId given".to_string(),
            )),
            (None, None) => Err(SealpostError::InvalidSendRequest(
                "one of to or privacyGroupId is required".to_string(),
            )),
        }
    }
}

/// Answer to `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    /// Payload digest
    pub key: String,
}

/// `POST /receive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveRequest {
    /// Payload digest
    pub key: String,
    /// Base64 identity to decrypt as; defaults to the node's first key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl ReceiveRequest {
    /// Decoded identity, if given.
    pub fn identity(&self) -> Result<Option<PublicKey>, SealpostError> {
        decode_optional_key(self.public_key.as_deref())
    }
}

/// Answer to `POST /receive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveResponse {
    /// Base64 plaintext
    pub payload: String,
    /// Group the payload was sent to
    pub privacy_group_id: String,
    /// Base64 key that sealed the payload
    pub sender_key: String,
}

impl ReceiveResponse {
    /// Response for a decrypted payload.
    pub fn new(plaintext: &[u8], privacy_group_id: String, sender: &PublicKey) -> Self {
        Self { payload: STANDARD.encode(plaintext), privacy_group_id, sender_key: sender.to_base64() }
    }
}

/// `POST /createPrivacyGroup`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrivacyGroupRequest {
    /// Base64 member keys
    pub addresses: Vec<String>,
    /// Base64 creator key; defaults to the node's first key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreatePrivacyGroupRequest {
    /// Decoded creator, if given.
    pub fn creator(&self) -> Result<Option<PublicKey>, SealpostError> {
        decode_optional_key(self.from.as_deref())
    }
}

/// `POST /deletePrivacyGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePrivacyGroupRequest {
    /// Group to delete
    pub privacy_group_id: String,
    /// Base64 requester key; defaults to the node's first key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl DeletePrivacyGroupRequest {
    /// Decoded requester, if given.
    pub fn requester(&self) -> Result<Option<PublicKey>, SealpostError> {
        decode_optional_key(self.from.as_deref())
    }
}

/// `POST /findPrivacyGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindPrivacyGroupRequest {
    /// Base64 keys of the exact member set
    pub addresses: Vec<String>,
}

/// `POST /retrievePrivacyGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievePrivacyGroupRequest {
    /// Group to look up
    pub privacy_group_id: String,
}

/// A privacy group as returned to clients. The seed stays on the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyGroupResponse {
    /// Group id
    pub privacy_group_id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Base64 member keys
    pub members: Vec<String>,
    /// `LEGACY` or `EXPLICIT`
    #[serde(rename = "type")]
    pub group_type: PrivacyGroupType,
}

impl From<&PrivacyGroupPayload> for PrivacyGroupResponse {
    fn from(group: &PrivacyGroupPayload) -> Self {
        Self {
            privacy_group_id: group.id(),
            name: group.name.clone(),
            description: group.description.clone(),
            members: group.addresses.iter().map(PublicKey::to_base64).collect(),
            group_type: group.group_type,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code
    pub error: String,
}

impl From<&SealpostError> for ErrorBody {
    fn from(err: &SealpostError) -> Self {
        Self { error: err.code().as_str().to_string() }
    }
}

/// Decode a list of base64 keys.
pub fn decode_keys(encoded: &[String]) -> Result<Vec<PublicKey>, SealpostError> {
    encoded.iter().map(|key| PublicKey::from_base64(key).map_err(SealpostError::from)).collect()
}

fn decode_optional_key(encoded: Option<&str>) -> Result<Option<PublicKey>, SealpostError> {
    encoded.map(PublicKey::from_base64).transpose().map_err(SealpostError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    fn key(byte: u8) -> PublicKey {
        PublicKey::from([byte; 32])
    }

    #[test]
    fn send_needs_exactly_one_target() {
        let mut request = SendRequest { payload: STANDARD.encode(b"hi"), ..SendRequest::default() };
        assert_eq!(request.target().unwrap_err().code(), ErrorCode::InvalidSendRequest);

        request.to = Some(vec![key(1).to_base64()]);
        assert_eq!(request.target().unwrap(), SendTarget::Recipients(vec![key(1)]));

        request.privacy_group_id = Some("group".to_string());
        assert_eq!(request.target().unwrap_err().code(), ErrorCode::InvalidSendRequest);

        request.to = None;
        assert_eq!(request.target().unwrap(), SendTarget::PrivacyGroup("group".to_string()));
    }

    #[test]
    fn empty_or_malformed_payload_is_rejected() {
        let request = SendRequest { payload: String::new(), ..SendRequest::default() };
        assert_eq!(request.plaintext().unwrap_err().code(), ErrorCode::InvalidSendRequest);

        let request = SendRequest { payload: "not base64!".to_string(), ..SendRequest::default() };
        assert_eq!(request.plaintext().unwrap_err().code(), ErrorCode::InvalidSendRequest);
    }

    #[test]
    fn malformed_keys_surface_as_decode_errors() {
        let request = SendRequest {
            payload: STANDARD.encode(b"hi"),
            from: Some("short".to_string()),
            to: Some(vec!["AAAA".to_string()]),
            privacy_group_id: None,
        };
        assert_eq!(request.sender().unwrap_err().code(), ErrorCode::DecodePublicKey);
        assert_eq!(request.target().unwrap_err().code(), ErrorCode::DecodePublicKey);
    }

    #[test]
    fn request_field_names() {
        let request: SendRequest = serde_json::from_str(
            r#"{"payload":"aGk=","from":null,"privacyGroupId":"g"}"#,
        )
        .unwrap();
        assert_eq!(request.privacy_group_id.as_deref(), Some("g"));
        assert_eq!(request.plaintext().unwrap(), b"hi");

        let receive: ReceiveRequest =
            serde_json::from_str(r#"{"key":"k","publicKey":"x"}"#).unwrap();
        assert_eq!(receive.public_key.as_deref(), Some("x"));
    }

    #[test]
    fn group_response_hides_the_seed() {
        let group = PrivacyGroupPayload::explicit(vec![key(1), key(2)], "n", "d", vec![9; 32]);
        let json = serde_json::to_value(PrivacyGroupResponse::from(&group)).unwrap();

        assert_eq!(json["privacyGroupId"], group.id());
        assert_eq!(json["type"], "EXPLICIT");
        assert_eq!(json["members"][0], key(1).to_base64());
        assert!(json.get("randomSeed").is_none());
    }
}
