use crate::domain::{AuthChain, ChallengeProvider};
use crate::errors::{ChainError, ChallengeError, SignInError};
use crate::models::{SignMessageRequest, SignMessageResponse};
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Minimum elapsed time between two accepted sign-ins, as defined by the
/// contract.
pub const SIGN_IN_COOLDOWN: Duration = Duration::from_secs(12 * 60 * 60);

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Cooldown window derived from on-chain state. Pure in `now` so a display
/// layer can recompute eligibility on every tick without re-reading the
/// chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownState {
    pub last_sign_in_time: u64,
    pub cooldown: Duration,
}

impl CooldownState {
    pub fn new(last_sign_in_time: u64) -> Self {
        Self {
            last_sign_in_time,
            cooldown: SIGN_IN_COOLDOWN,
        }
    }

    pub fn next_eligible_at(&self) -> u64 {
        self.last_sign_in_time + self.cooldown.as_secs()
    }

    pub fn can_sign_in(&self, now: u64) -> bool {
        now >= self.next_eligible_at()
    }

    pub fn remaining_at(&self, now: u64) -> Duration {
        Duration::from_secs(self.next_eligible_at().saturating_sub(now))
    }
}

/// Renders a countdown as `"{h}h {m}m {s}s"` for a once-per-second display
/// tick.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    format!("{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
}

/// Account state re-read from the chain after a confirmed sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountStatus {
    pub nonce: u64,
    pub cooldown: CooldownState,
    pub xp: u64,
}

/// Explicit stages of one sign-in attempt.
///
/// The signature only exists from `TxPending` on and a refreshed account
/// only in `Confirmed`, so states like "confirmed but no signature was ever
/// requested" cannot be represented.
#[derive(Debug, Clone)]
pub enum SignInStage {
    Idle,
    ChallengePending,
    TxPending { signature: String },
    Confirmed { account: AccountStatus },
    Failed { message: String },
}

impl SignInStage {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::ChallengePending | Self::TxPending { .. })
    }
}

/// Client-side sign-in protocol driver.
///
/// Reads chain state fresh before every attempt; a request re-invoked while
/// one is already in flight is ignored, since each challenge is single-use
/// by nonce. Atomicity of the actual state change is the contract's: if two
/// attempts race, the loser's transaction reverts on a stale nonce instead
/// of signing in twice.
pub struct SignInFlow<C, P> {
    chain: C,
    challenges: P,
    user: Address,
    contract: Address,
    stage: SignInStage,
}

impl<C: AuthChain, P: ChallengeProvider> SignInFlow<C, P> {
    pub fn new(chain: C, challenges: P, user: Address, contract: Address) -> Self {
        Self {
            chain,
            challenges,
            user,
            contract,
            stage: SignInStage::Idle,
        }
    }

    pub fn stage(&self) -> &SignInStage {
        &self.stage
    }

    /// Current nonce, cooldown window and XP balance, read fresh.
    pub async fn account_status(&self) -> Result<AccountStatus, ChainError> {
        let nonce = self.chain.nonce_of(self.user).await?;
        let last = self.chain.last_sign_in_time(self.user).await?;
        let xp = self.chain.user_xp(self.user).await?;
        Ok(AccountStatus {
            nonce,
            cooldown: CooldownState::new(last),
            xp,
        })
    }

    /// Runs one sign-in attempt to completion.
    ///
    /// Failed and Confirmed stages are restartable; protocol failures land in
    /// `Failed` with the upstream message surfaced verbatim and are also
    /// returned as the error.
    pub async fn sign_in(&mut self) -> Result<&SignInStage, SignInError> {
        if self.stage.is_pending() {
            tracing::debug!(user = %self.user, "Ignoring sign-in request while one is in flight");
            return Ok(&self.stage);
        }
        self.stage = SignInStage::Idle;

        let last = self.chain.last_sign_in_time(self.user).await?;
        let cooldown = CooldownState::new(last);
        let now = unix_now();
        if !cooldown.can_sign_in(now) {
            return Err(SignInError::CooldownActive {
                remaining: cooldown.remaining_at(now),
            });
        }

        self.stage = SignInStage::ChallengePending;
        let nonce = match self.chain.nonce_of(self.user).await {
            Ok(nonce) => nonce,
            Err(e) => return Err(self.fail(e.into())),
        };
        let signature = match self
            .challenges
            .challenge(self.user, nonce, self.contract)
            .await
        {
            Ok(signature) => signature,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.stage = SignInStage::TxPending {
            signature: signature.clone(),
        };
        let tx = match self.chain.submit_sign_in(&signature).await {
            Ok(tx) => tx,
            Err(e) => return Err(self.fail(e.into())),
        };
        if let Err(e) = self.chain.await_sign_in_confirmation(tx).await {
            return Err(self.fail(e.into()));
        }

        let account = match self.account_status().await {
            Ok(account) => account,
            Err(e) => return Err(self.fail(e.into())),
        };
        tracing::info!(user = %self.user, xp = account.xp, "Sign-in confirmed");
        self.stage = SignInStage::Confirmed { account };
        Ok(&self.stage)
    }

    fn fail(&mut self, error: SignInError) -> SignInError {
        self.stage = SignInStage::Failed {
            message: error.to_string(),
        };
        error
    }

    #[cfg(test)]
    fn force_stage(&mut self, stage: SignInStage) {
        self.stage = stage;
    }
}

/// `ChallengeProvider` backed by a remote `/sign-message` endpoint.
#[derive(Debug, Clone)]
pub struct HttpChallengeProvider {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpChallengeProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChallengeProvider for HttpChallengeProvider {
    async fn challenge(
        &self,
        user: Address,
        nonce: u64,
        contract: Address,
    ) -> Result<String, ChallengeError> {
        let request = SignMessageRequest {
            user_address: Some(user.to_string()),
            nonce: Some(nonce),
            contract_address: Some(contract.to_string()),
        };
        let response = self.http.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            #[derive(Deserialize)]
            struct ErrorBody {
                error: String,
            }
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "Failed to get signature".to_string());
            return Err(ChallengeError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: SignMessageResponse = response.json().await?;
        Ok(body.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ChallengeSigner;
    use alloy_primitives::B256;
    use std::sync::Mutex;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn user() -> Address {
        Address::repeat_byte(0xab)
    }

    fn contract() -> Address {
        Address::repeat_byte(0xde)
    }

    /// In-memory contract double. Confirmation applies the state change the
    /// real contract would: nonce bump, cooldown reset, XP reward.
    struct MockChain {
        state: Mutex<MockChainState>,
        revert: bool,
    }

    struct MockChainState {
        nonce: u64,
        last_sign_in_time: u64,
        xp: u64,
        submitted: Vec<String>,
    }

    impl MockChain {
        fn new(last_sign_in_time: u64) -> Self {
            Self {
                state: Mutex::new(MockChainState {
                    nonce: 0,
                    last_sign_in_time,
                    xp: 0,
                    submitted: Vec::new(),
                }),
                revert: false,
            }
        }

        fn reverting(last_sign_in_time: u64) -> Self {
            Self {
                revert: true,
                ..Self::new(last_sign_in_time)
            }
        }
    }

    #[async_trait]
    impl AuthChain for &MockChain {
        async fn nonce_of(&self, _user: Address) -> Result<u64, ChainError> {
            Ok(self.state.lock().unwrap().nonce)
        }

        async fn last_sign_in_time(&self, _user: Address) -> Result<u64, ChainError> {
            Ok(self.state.lock().unwrap().last_sign_in_time)
        }

        async fn user_xp(&self, _user: Address) -> Result<u64, ChainError> {
            Ok(self.state.lock().unwrap().xp)
        }

        async fn submit_sign_in(&self, signature: &str) -> Result<B256, ChainError> {
            self.state
                .lock()
                .unwrap()
                .submitted
                .push(signature.to_string());
            Ok(B256::repeat_byte(0x42))
        }

        async fn await_sign_in_confirmation(&self, tx: B256) -> Result<(), ChainError> {
            if self.revert {
                return Err(ChainError::Reverted(tx));
            }
            let mut state = self.state.lock().unwrap();
            state.nonce += 1;
            state.last_sign_in_time = unix_now();
            state.xp += 100;
            Ok(())
        }
    }

    /// Chain double that must never be reached.
    struct UnreachableChain;

    #[async_trait]
    impl AuthChain for UnreachableChain {
        async fn nonce_of(&self, _user: Address) -> Result<u64, ChainError> {
            panic!("chain must not be consulted");
        }
        async fn last_sign_in_time(&self, _user: Address) -> Result<u64, ChainError> {
            panic!("chain must not be consulted");
        }
        async fn user_xp(&self, _user: Address) -> Result<u64, ChainError> {
            panic!("chain must not be consulted");
        }
        async fn submit_sign_in(&self, _signature: &str) -> Result<B256, ChainError> {
            panic!("chain must not be consulted");
        }
        async fn await_sign_in_confirmation(&self, _tx: B256) -> Result<(), ChainError> {
            panic!("chain must not be consulted");
        }
    }

    struct RejectingProvider;

    #[async_trait]
    impl ChallengeProvider for RejectingProvider {
        async fn challenge(
            &self,
            _user: Address,
            _nonce: u64,
            _contract: Address,
        ) -> Result<String, ChallengeError> {
            Err(ChallengeError::Rejected {
                status: 500,
                message: "Server configuration error".to_string(),
            })
        }
    }

    #[test]
    fn cooldown_opens_exactly_when_the_window_elapses() {
        let state = CooldownState::new(1_000_000);
        let window = SIGN_IN_COOLDOWN.as_secs();

        assert!(!state.can_sign_in(1_000_000));
        assert!(!state.can_sign_in(1_000_000 + window - 1));
        assert!(state.can_sign_in(1_000_000 + window));
        assert!(state.can_sign_in(1_000_000 + window + 1));
    }

    #[test]
    fn remaining_time_counts_down_and_saturates() {
        let state = CooldownState::new(1_000);
        let window = SIGN_IN_COOLDOWN.as_secs();

        assert_eq!(state.remaining_at(1_000).as_secs(), window);
        assert_eq!(state.remaining_at(1_000 + window / 2).as_secs(), window / 2);
        assert_eq!(state.remaining_at(1_000 + window * 2), Duration::ZERO);
    }

    #[test]
    fn countdown_formats_hours_minutes_seconds() {
        assert_eq!(format_remaining(Duration::from_secs(3_661)), "1h 1m 1s");
        assert_eq!(format_remaining(Duration::from_secs(59)), "0h 0m 59s");
        assert_eq!(format_remaining(Duration::ZERO), "0h 0m 0s");
    }

    #[tokio::test]
    async fn successful_flow_ends_confirmed_with_refreshed_account() {
        let chain = MockChain::new(0);
        let signer = ChallengeSigner::from_hex(TEST_KEY).unwrap();
        let expected = signer.challenge(user(), 0, contract()).await.unwrap();
        let mut flow = SignInFlow::new(&chain, signer, user(), contract());

        let stage = flow.sign_in().await.unwrap().clone();
        match stage {
            SignInStage::Confirmed { account } => {
                assert_eq!(account.nonce, 1);
                assert_eq!(account.xp, 100);
                assert!(!account.cooldown.can_sign_in(unix_now()));
            }
            other => panic!("expected Confirmed, got {other:?}"),
        }
        assert_eq!(chain.state.lock().unwrap().submitted, vec![expected]);
    }

    #[tokio::test]
    async fn second_attempt_inside_the_window_is_on_cooldown() {
        let chain = MockChain::new(unix_now());
        let signer = ChallengeSigner::from_hex(TEST_KEY).unwrap();
        let mut flow = SignInFlow::new(&chain, signer, user(), contract());

        let err = flow.sign_in().await.unwrap_err();
        assert!(matches!(err, SignInError::CooldownActive { .. }));
        assert!(matches!(flow.stage(), SignInStage::Idle));
        assert!(chain.state.lock().unwrap().submitted.is_empty());
    }

    #[tokio::test]
    async fn pending_attempts_ignore_reentry() {
        let mut flow = SignInFlow::new(
            UnreachableChain,
            RejectingProvider,
            user(),
            contract(),
        );
        flow.force_stage(SignInStage::ChallengePending);

        let stage = flow.sign_in().await.unwrap();
        assert!(matches!(stage, SignInStage::ChallengePending));
    }

    #[tokio::test]
    async fn issuer_failure_is_surfaced_verbatim_and_recoverable() {
        let chain = MockChain::new(0);
        let mut flow = SignInFlow::new(&chain, RejectingProvider, user(), contract());

        let err = flow.sign_in().await.unwrap_err();
        assert!(matches!(err, SignInError::Challenge(_)));
        match flow.stage() {
            SignInStage::Failed { message } => {
                assert!(message.contains("Server configuration error"), "{message}");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(chain.state.lock().unwrap().submitted.is_empty());

        // A failed attempt is restartable; it fails the same way again.
        assert!(flow.sign_in().await.is_err());
    }

    #[tokio::test]
    async fn reverted_transaction_fails_the_attempt() {
        let chain = MockChain::reverting(0);
        let signer = ChallengeSigner::from_hex(TEST_KEY).unwrap();
        let mut flow = SignInFlow::new(&chain, signer, user(), contract());

        let err = flow.sign_in().await.unwrap_err();
        assert!(matches!(err, SignInError::Chain(ChainError::Reverted(_))));
        assert!(matches!(flow.stage(), SignInStage::Failed { .. }));
        // The signature was consumed by the attempt; nothing signed in.
        assert_eq!(chain.state.lock().unwrap().nonce, 0);
        assert_eq!(chain.state.lock().unwrap().xp, 0);
    }
}
