//! Outbound reporting of right-of-way changes to the remote signal authority.

pub mod http;
pub mod notifier;

pub use http::HttpSignalAuthority;
pub use notifier::{Notification, Notifier};

use crate::prelude::{ControlResult, Credential, Direction, Junction};
use async_trait::async_trait;

#[async_trait]
pub trait SignalAuthority: Send + Sync {
    /// Reports `direction` as the active direction of `junction`.
    async fn notify(
        &self,
        junction: &Junction,
        direction: Direction,
        credential: Option<&Credential>,
    ) -> ControlResult<()>;
}

/// Decides whether a bearer credential may issue overrides.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &Credential) -> bool;
}

/// Accepts any non-blank token; expiry and signature checks live upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceVerifier;

impl CredentialVerifier for PresenceVerifier {
    fn verify(&self, credential: &Credential) -> bool {
        !credential.token().trim().is_empty()
    }
}
