use crate::generator::{DEFAULT_GEMINI_BASE, DEFAULT_GEMINI_MODEL};
use std::{env, fmt, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Text-generation model settings. Present only when an API key is
/// provisioned; without it the generation route answers with a
/// server-configuration error.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub gemini: Option<GeminiConfig>,
    /// Hex-encoded secp256k1 key for the challenge issuer. Optional so the
    /// server can run without the sign-in feature; requests then 500.
    pub server_private_key: Option<String>,
    pub indexer_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();

        let bind_address_str =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let gemini = non_empty_var("GOOGLE_GENERATIVE_AI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            base_url: non_empty_var("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string()),
            model: non_empty_var("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        });

        let server_private_key = non_empty_var("SERVER_PRIVATE_KEY");
        let indexer_url = non_empty_var("INDEXER_URL");

        Ok(Config {
            bind_address,
            gemini,
            server_private_key,
            indexer_url,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

// Manual Debug: the signing key and the model API key must never reach a log
// line, not even through an accidental `{:?}` of the whole config.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("gemini", &self.gemini)
            .field(
                "server_private_key",
                &self.server_private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("indexer_url", &self.indexer_url)
            .finish()
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}
