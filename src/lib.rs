pub mod auth;
pub mod captions;
pub mod chain;
pub mod config;
pub mod domain;
pub mod errors;
pub mod generator;
pub mod handlers;
pub mod indexer;
pub mod models;
pub mod routes;
pub mod signin;
pub mod templates;

use crate::auth::ChallengeSigner;
use crate::config::Config;
use crate::generator::{GeminiModel, MemeGenerator};
use crate::indexer::IndexerClient;
use crate::templates::Catalog;
use std::sync::Arc;

/// AppState holds shared resources for the web server.
///
/// Optional components stay `None` when their configuration is absent; the
/// corresponding routes answer with a server-configuration error instead of
/// preventing startup.
pub struct AppState {
    pub generator: Option<MemeGenerator>,
    pub challenge_signer: Option<ChallengeSigner>,
    pub indexer: Option<IndexerClient>,
}

/// Builds the application state from configuration and serves the API until
/// the listener fails.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let catalog = Arc::new(Catalog::bundled()?);
    tracing::info!(templates = catalog.len(), "Template catalog loaded");

    let generator = config.gemini.as_ref().map(|gemini| {
        tracing::info!(model = %gemini.model, "Meme generation enabled");
        MemeGenerator::new(
            Arc::new(GeminiModel::new(
                gemini.api_key.clone(),
                gemini.base_url.clone(),
                gemini.model.clone(),
            )),
            catalog.clone(),
        )
    });
    if generator.is_none() {
        tracing::warn!("GOOGLE_GENERATIVE_AI_API_KEY not set, /generate-meme will reject requests");
    }

    let challenge_signer = match config.server_private_key.as_deref() {
        Some(key) => {
            let signer = ChallengeSigner::from_hex(key)?;
            tracing::info!(signer = %signer.address(), "Sign-in challenge issuer enabled");
            Some(signer)
        }
        None => {
            tracing::warn!("SERVER_PRIVATE_KEY not set, /sign-message will reject requests");
            None
        }
    };

    let indexer = config.indexer_url.as_ref().map(|endpoint| {
        tracing::info!(endpoint = %endpoint, "Mint indexer enabled");
        IndexerClient::new(endpoint.clone())
    });

    let state = Arc::new(AppState {
        generator,
        challenge_signer,
        indexer,
    });

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    tracing::info!("Server listening on http://{}", config.bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
