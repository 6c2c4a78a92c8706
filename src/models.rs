//! Wire-format request and response types for the HTTP API.
//!
//! Field names follow the JSON casing the mini-app frontend sends
//! (`userAddress`, `memeUrl`, ...). Request fields are optional so that
//! presence is validated in the handlers with the API's own error bodies
//! instead of a generic deserialization rejection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageRequest {
    pub user_address: Option<String>,
    pub nonce: Option<u64>,
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignMessageResponse {
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateMemeRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMemeResponse {
    pub success: bool,
    pub message: String,
    pub user_prompt: String,
    pub meme_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_message_request_uses_frontend_casing() {
        let request: SignMessageRequest = serde_json::from_str(
            r#"{"userAddress": "0xabc", "nonce": 5, "contractAddress": "0xdef"}"#,
        )
        .unwrap();
        assert_eq!(request.user_address.as_deref(), Some("0xabc"));
        assert_eq!(request.nonce, Some(5));
        assert_eq!(request.contract_address.as_deref(), Some("0xdef"));
    }

    #[test]
    fn absent_fields_deserialize_to_none() {
        let request: SignMessageRequest = serde_json::from_str(r#"{"nonce": 1}"#).unwrap();
        assert!(request.user_address.is_none());
        assert!(request.contract_address.is_none());
    }

    #[test]
    fn generate_meme_response_serializes_camel_case() {
        let response = GenerateMemeResponse {
            success: true,
            message: "done".into(),
            user_prompt: "cat coding".into(),
            meme_url: "https://example.test/meme.png".into(),
        };
        let raw = serde_json::to_value(&response).unwrap();
        assert!(raw.get("userPrompt").is_some());
        assert!(raw.get("memeUrl").is_some());
    }
}
