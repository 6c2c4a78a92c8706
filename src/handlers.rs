use crate::{
    errors::AppError,
    indexer::OwnedMeme,
    models::{
        GenerateMemeRequest, GenerateMemeResponse, SignMessageRequest, SignMessageResponse,
    },
    AppState,
};
use alloy_primitives::{Address, U256};
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

fn parse_address(raw: String) -> Result<Address, AppError> {
    raw.parse().map_err(|_| AppError::InvalidAddress(raw))
}

/// Handler for `POST /sign-message`.
///
/// Stateless: validates the triple, then signs. The nonce is owned by the
/// contract; this endpoint only binds whatever value the caller read.
pub async fn sign_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignMessageRequest>,
) -> Result<Json<SignMessageResponse>, AppError> {
    let user_address = request
        .user_address
        .ok_or(AppError::MissingParameter("userAddress"))?;
    let nonce = request.nonce.ok_or(AppError::MissingParameter("nonce"))?;
    let contract_address = request
        .contract_address
        .ok_or(AppError::MissingParameter("contractAddress"))?;

    let signer = state
        .challenge_signer
        .as_ref()
        .ok_or(AppError::ServerMisconfigured("SERVER_PRIVATE_KEY"))?;

    let user = parse_address(user_address)?;
    let contract = parse_address(contract_address)?;

    let signature = signer.issue(user, U256::from(nonce), contract)?;
    Ok(Json(SignMessageResponse { signature }))
}

/// Handler for `POST /generate-meme`.
pub async fn generate_meme(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateMemeRequest>,
) -> Result<Json<GenerateMemeResponse>, AppError> {
    let prompt = request
        .prompt
        .filter(|prompt| !prompt.trim().is_empty())
        .ok_or(AppError::MissingPrompt)?;

    let generator = state
        .generator
        .as_ref()
        .ok_or(AppError::ServerMisconfigured("GOOGLE_GENERATIVE_AI_API_KEY"))?;

    tracing::debug!(prompt = %prompt, "Generating meme");
    let meme = generator.generate(&prompt).await?;

    Ok(Json(GenerateMemeResponse {
        success: true,
        message: meme.message,
        user_prompt: prompt,
        meme_url: meme.meme_url,
    }))
}

/// Handler for `GET /memes/{owner}`: minted memes owned by an address, read
/// from the external indexer.
pub async fn owned_memes(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<Json<Vec<OwnedMeme>>, AppError> {
    let owner = parse_address(owner)?;
    let indexer = state
        .indexer
        .as_ref()
        .ok_or(AppError::ServerMisconfigured("INDEXER_URL"))?;

    let memes = indexer.memes_of(owner).await?;
    Ok(Json(memes))
}
