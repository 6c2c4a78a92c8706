use crate::errors::{ChainError, ChallengeError, ModelError};
use crate::generator::{Content, FunctionDeclaration};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;

/// Trait defining one round trip to a text-generation model with
/// function-calling tools. The orchestrator drives the loop; implementations
/// only translate a conversation into the next model reply.
#[async_trait]
pub trait TextModel: Send + Sync + 'static {
    async fn step(
        &self,
        contents: &[Content],
        tools: &[FunctionDeclaration],
    ) -> Result<Content, ModelError>;
}

/// Trait defining the on-chain surface of the meme auth contract that the
/// sign-in protocol consumes. State is always read fresh; implementations
/// must not cache nonce or cooldown values.
#[async_trait]
pub trait AuthChain: Send + Sync {
    /// Current replay-protection nonce for `user`.
    async fn nonce_of(&self, user: Address) -> Result<u64, ChainError>;

    /// Unix timestamp of the user's last accepted sign-in.
    async fn last_sign_in_time(&self, user: Address) -> Result<u64, ChainError>;

    /// Reward balance accumulated by sign-ins.
    async fn user_xp(&self, user: Address) -> Result<u64, ChainError>;

    /// Submits `signIn(serverSignature)` and returns the transaction hash.
    async fn submit_sign_in(&self, signature: &str) -> Result<B256, ChainError>;

    /// Waits for the submitted transaction to be mined; a reverted receipt is
    /// a contract verification failure.
    async fn await_sign_in_confirmation(&self, tx: B256) -> Result<(), ChainError>;
}

/// Trait defining where the sign-in flow obtains a challenge signature.
///
/// Implemented directly by the local issuer and by an HTTP client talking to
/// a remote `/sign-message` endpoint.
#[async_trait]
pub trait ChallengeProvider: Send + Sync {
    async fn challenge(
        &self,
        user: Address,
        nonce: u64,
        contract: Address,
    ) -> Result<String, ChallengeError>;
}
