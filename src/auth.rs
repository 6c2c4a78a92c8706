use crate::domain::ChallengeProvider;
use crate::errors::ChallengeError;
use alloy_primitives::{hex, keccak256, Address, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::fmt;

/// Hash binding a (user, nonce, contract) triple.
///
/// The packing is fixed-width and position-tagged — user address as 20 bytes,
/// nonce as 256-bit big-endian, contract address as 20 bytes — so the digest
/// is bit-for-bit identical to the verifying contract's
/// `keccak256(abi.encodePacked(user, nonce, address(this)))`. Any change to
/// this layout breaks on-chain signature recovery.
pub fn inner_hash(user: Address, nonce: U256, contract: Address) -> B256 {
    let mut packed = [0u8; 72];
    packed[..20].copy_from_slice(user.as_slice());
    packed[20..52].copy_from_slice(&nonce.to_be_bytes::<32>());
    packed[52..].copy_from_slice(contract.as_slice());
    keccak256(packed)
}

/// Stateless sign-in challenge issuer.
///
/// Holds the server's secp256k1 key, injected once at construction and
/// read-only afterwards; signing is a pure function of the key and the
/// message, so concurrent use needs no locking. The key material is never
/// logged or echoed.
pub struct ChallengeSigner {
    signer: PrivateKeySigner,
}

impl ChallengeSigner {
    /// Parses a hex-encoded private key (with or without `0x` prefix).
    ///
    /// The parse error is swallowed on purpose so key material can never
    /// leak into logs through an error message.
    pub fn from_hex(key: &str) -> Result<Self, ChallengeError> {
        let signer: PrivateKeySigner = key.trim().parse().map_err(|_| ChallengeError::InvalidKey)?;
        Ok(Self { signer })
    }

    /// Address of the server-held signing key, i.e. the signer the contract
    /// must be configured to trust.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Issues a challenge signature for one (user, nonce, contract) triple.
    ///
    /// Signs the inner hash with the EIP-191 personal-message convention
    /// (`"\x19Ethereum Signed Message:\n32"` prefix), matching the contract's
    /// `ecrecover` path. Deterministic: the same triple always yields the
    /// same 65-byte r||s||v signature, returned 0x-prefixed.
    pub fn issue(
        &self,
        user: Address,
        nonce: U256,
        contract: Address,
    ) -> Result<String, ChallengeError> {
        let digest = inner_hash(user, nonce, contract);
        let signature = self.signer.sign_message_sync(digest.as_slice())?;
        tracing::debug!(user = %user, nonce = %nonce, contract = %contract, "Issued sign-in challenge");
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }
}

#[async_trait]
impl ChallengeProvider for ChallengeSigner {
    async fn challenge(
        &self,
        user: Address,
        nonce: u64,
        contract: Address,
    ) -> Result<String, ChallengeError> {
        self.issue(user, U256::from(nonce), contract)
    }
}

impl fmt::Debug for ChallengeSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeSigner")
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Signature;

    // First well-known anvil/hardhat development key.
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn signer() -> ChallengeSigner {
        ChallengeSigner::from_hex(TEST_KEY).unwrap()
    }

    #[test]
    fn invalid_key_is_rejected_without_echoing_it() {
        let err = ChallengeSigner::from_hex("0xnot-a-key").unwrap_err();
        assert!(!err.to_string().contains("not-a-key"));
    }

    #[test]
    fn inner_hash_changes_with_every_field() {
        let user = Address::repeat_byte(0xab);
        let contract = Address::repeat_byte(0xde);
        let base = inner_hash(user, U256::from(5u64), contract);

        assert_eq!(base, inner_hash(user, U256::from(5u64), contract));
        assert_ne!(base, inner_hash(Address::repeat_byte(0xac), U256::from(5u64), contract));
        assert_ne!(base, inner_hash(user, U256::from(6u64), contract));
        assert_ne!(base, inner_hash(user, U256::from(5u64), Address::repeat_byte(0xdf)));
    }

    #[test]
    fn issuing_twice_yields_the_identical_signature() {
        let signer = signer();
        let user = Address::repeat_byte(0xab);
        let contract = Address::repeat_byte(0xde);

        let first = signer.issue(user, U256::from(5u64), contract).unwrap();
        let second = signer.issue(user, U256::from(5u64), contract).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("0x"));
        // 65 bytes: r || s || v
        assert_eq!(first.len(), 2 + 65 * 2);
    }

    #[test]
    fn signatures_differ_for_distinct_triples() {
        let signer = signer();
        let user = Address::repeat_byte(0xab);
        let contract = Address::repeat_byte(0xde);

        let base = signer.issue(user, U256::from(5u64), contract).unwrap();
        let other_nonce = signer.issue(user, U256::from(6u64), contract).unwrap();
        let other_user = signer
            .issue(Address::repeat_byte(0xac), U256::from(5u64), contract)
            .unwrap();
        let other_contract = signer
            .issue(user, U256::from(5u64), Address::repeat_byte(0xdf))
            .unwrap();

        assert_ne!(base, other_nonce);
        assert_ne!(base, other_user);
        assert_ne!(base, other_contract);
    }

    #[test]
    fn signature_recovers_to_the_issuer_address() {
        let signer = signer();
        let user = Address::repeat_byte(0xab);
        let contract = Address::repeat_byte(0xde);
        let nonce = U256::from(5u64);

        let encoded = signer.issue(user, nonce, contract).unwrap();
        let signature = Signature::try_from(hex::decode(&encoded).unwrap().as_slice()).unwrap();

        let digest = inner_hash(user, nonce, contract);
        let recovered = signature
            .recover_address_from_msg(digest.as_slice())
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn debug_output_never_contains_key_material() {
        let rendered = format!("{:?}", signer());
        assert!(!rendered.to_lowercase().contains(&TEST_KEY[2..10]));
        assert!(rendered.contains("address"));
    }
}
