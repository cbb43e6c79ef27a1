use async_trait::async_trait;
use uuid::Uuid;

use lobstertrap_core::player::Player;

/// Failure from the identity or social-proof boundary.
#[derive(Debug)]
pub struct IdentityError(pub String);

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IdentityError {}

/// Durable identity record store. The in-memory registry is authoritative
/// for gameplay; writes here are best-effort mirrors and reconciliation is
/// an operator concern.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_access_key(&self, key: &str) -> Result<Option<Player>, IdentityError>;
    async fn find_by_wallet(&self, wallet: &str) -> Result<Option<Player>, IdentityError>;
    async fn persist_player(
        &self,
        player: &Player,
        verification_code: &str,
    ) -> Result<(), IdentityError>;
    async fn mark_verified(&self, player_id: Uuid, proof_id: &str) -> Result<(), IdentityError>;
}

/// Checks that a public post proves account ownership: the post must carry
/// the expected verification code under the expected display name.
#[async_trait]
pub trait SocialProofVerifier: Send + Sync {
    async fn verify_post(
        &self,
        post_ref: &str,
        expected_code: &str,
        expected_name: &str,
    ) -> Result<bool, IdentityError>;
}

/// No-op store for single-process deployments without a durable backend.
pub struct NullIdentityStore;

#[async_trait]
impl IdentityStore for NullIdentityStore {
    async fn find_by_access_key(&self, _key: &str) -> Result<Option<Player>, IdentityError> {
        Ok(None)
    }

    async fn find_by_wallet(&self, _wallet: &str) -> Result<Option<Player>, IdentityError> {
        Ok(None)
    }

    async fn persist_player(
        &self,
        _player: &Player,
        _verification_code: &str,
    ) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn mark_verified(&self, _player_id: Uuid, _proof_id: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}

/// Development verifier that accepts every proof post.
pub struct AcceptAllVerifier;

#[async_trait]
impl SocialProofVerifier for AcceptAllVerifier {
    async fn verify_post(
        &self,
        _post_ref: &str,
        _expected_code: &str,
        _expected_name: &str,
    ) -> Result<bool, IdentityError> {
        Ok(true)
    }
}
