use alloy_primitives::B256;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;

// --- Domain/Infrastructure Errors ---

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("template catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("template catalog is empty")]
    Empty,

    #[error("template catalog contains a blank template id")]
    BlankId,

    #[error("duplicate template id in catalog: {0}")]
    DuplicateId(String),

    #[error("template '{0}' declares zero caption lines")]
    BadLineCount(String),
}

#[derive(Error, Debug)]
pub enum MemeUrlError {
    #[error("template id must not be blank")]
    InvalidTemplate,
}

/// Errors from a single round trip to the text-generation model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model returned an empty reply")]
    EmptyReply,
}

/// Errors from the generation orchestrator as a whole.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    /// The model finished (or exhausted its step budget) without a single
    /// successful meme tool invocation. No partial URL is ever returned.
    #[error("the model finished without generating a meme")]
    NoMemeGenerated,
}

/// Errors issuing or fetching a sign-in challenge signature.
#[derive(Error, Debug)]
pub enum ChallengeError {
    #[error("signing key is not a valid secp256k1 private key")]
    InvalidKey,

    #[error("failed to sign challenge: {0}")]
    Signing(#[from] alloy_signer::Error),

    #[error("challenge request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("challenge rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Errors talking to the auth contract over JSON-RPC.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed RPC response: {0}")]
    MalformedResponse(String),

    #[error("server signature is not valid hex")]
    InvalidSignature,

    /// Contract-side verification failure: stale nonce, cooldown not elapsed
    /// or a bad signature all surface as a reverted transaction.
    #[error("sign-in transaction {0} reverted")]
    Reverted(B256),

    #[error("timed out waiting for confirmation of {0}")]
    ConfirmationTimeout(B256),
}

/// Errors from the sign-in client protocol.
#[derive(Error, Debug)]
pub enum SignInError {
    #[error("sign-in available again in {}", crate::signin::format_remaining(*.remaining))]
    CooldownActive { remaining: Duration },

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Errors querying the minted-meme indexer.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("indexer transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("indexer returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("indexer query failed: {0}")]
    Query(String),

    #[error("malformed indexer response: {0}")]
    Malformed(String),
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Missing required parameter: prompt")]
    MissingPrompt,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // Configuration errors hit at request time; the variant carries the
    // missing variable for the log line, never for the response body.
    #[error("Server configuration error")]
    ServerMisconfigured(&'static str),

    // Domain/Service level errors
    #[error("Failed to sign message")]
    Challenge(#[source] ChallengeError),
    #[error("Error generating meme")]
    Generation(#[source] GenerateError),
    #[error("Failed to query minted memes")]
    Indexer(#[source] IndexerError),
}

impl From<ChallengeError> for AppError {
    fn from(err: ChallengeError) -> Self {
        AppError::Challenge(err)
    }
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        AppError::Generation(err)
    }
}

impl From<IndexerError> for AppError {
    fn from(err: IndexerError) -> Self {
        AppError::Indexer(err)
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            // 4xx Client Errors
            AppError::MissingParameter(_) | AppError::InvalidAddress(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": self.to_string() }),
            ),
            // The generation route reports validation failures under
            // "message" rather than "error".
            AppError::MissingPrompt => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "message": self.to_string() }),
            ),

            // 5xx Server Errors
            AppError::ServerMisconfigured(variable) => {
                tracing::error!(%variable, "Request requires server configuration that is not set");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Server configuration error" }),
                )
            }
            AppError::Challenge(e) => {
                tracing::error!(error.source = ?e, "Challenge signing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Failed to sign message" }),
                )
            }
            AppError::Generation(e) => {
                tracing::error!(error.source = ?e, "Meme generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "message": "Error generating meme", "error": e.to_string() }),
                )
            }
            AppError::Indexer(e) => {
                tracing::error!(error.source = ?e, "Indexer query failed");
                (
                    StatusCode::BAD_GATEWAY,
                    serde_json::json!({ "error": "Failed to query minted memes" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        assert_eq!(
            AppError::MissingParameter("nonce").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::MissingPrompt.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidAddress("0xnope".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn configuration_and_generation_errors_map_to_500() {
        assert_eq!(
            AppError::ServerMisconfigured("SERVER_PRIVATE_KEY")
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Generation(GenerateError::NoMemeGenerated)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn misconfiguration_body_does_not_name_the_variable() {
        let display = AppError::ServerMisconfigured("SERVER_PRIVATE_KEY").to_string();
        assert_eq!(display, "Server configuration error");
    }
}
