//! Daily sign-in client: reads nonce and cooldown state from the auth
//! contract, fetches a challenge signature from a `/sign-message` endpoint
//! and submits the `signIn` transaction.

use alloy_primitives::Address;
use anyhow::Context;
use clap::Parser;
use memeforge::chain::JsonRpcAuthChain;
use memeforge::signin::{unix_now, HttpChallengeProvider, SignInFlow, SignInStage};

#[derive(Debug, Parser)]
#[command(name = "signin", about = "Perform a daily sign-in against the meme auth contract")]
struct Args {
    /// Ethereum JSON-RPC endpoint
    #[arg(long)]
    rpc_url: String,

    /// Address of the meme auth contract
    #[arg(long)]
    contract: Address,

    /// Account signing in (must be managed by the RPC node)
    #[arg(long)]
    user: Address,

    /// Challenge issuer endpoint, e.g. http://localhost:3000/sign-message
    #[arg(long)]
    issuer_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "memeforge=info,signin=info".into()),
        ))
        .init();

    let args = Args::parse();

    let chain = JsonRpcAuthChain::new(args.rpc_url, args.contract, args.user);
    let challenges = HttpChallengeProvider::new(args.issuer_url);
    let mut flow = SignInFlow::new(chain, challenges, args.user, args.contract);

    let account = flow
        .account_status()
        .await
        .context("failed to read account state from the contract")?;
    tracing::info!(
        user = %args.user,
        nonce = account.nonce,
        xp = account.xp,
        "Current account state"
    );

    let now = unix_now();
    if !account.cooldown.can_sign_in(now) {
        tracing::info!(
            remaining = %memeforge::signin::format_remaining(account.cooldown.remaining_at(now)),
            "Sign-in is still on cooldown"
        );
        return Ok(());
    }

    match flow.sign_in().await {
        Ok(SignInStage::Confirmed { account }) => {
            tracing::info!(xp = account.xp, nonce = account.nonce, "Signed in");
            Ok(())
        }
        Ok(stage) => {
            tracing::warn!(?stage, "Sign-in ended in an unexpected stage");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("sign-in failed")),
    }
}
