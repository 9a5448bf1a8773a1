//! Credential-store seam: validating bearer tokens into identities.
//!
//! Talkwire doesn't validate tokens itself — that belongs to whatever
//! issues them (a JWT service, an auth provider, a user database).
//! The relay consumes it as a single black-box call: token in,
//! verified [`Identity`] or [`RegistryError::AuthFailed`] out.
//!
//! Implement [`CredentialStore`] with your validation logic; the
//! per-connection handler calls it when a client sends an `auth` event.

use talkwire_protocol::Identity;

use crate::RegistryError;

/// Validates a client's bearer token and returns the verified identity.
///
/// `Send + Sync + 'static` because one store instance is shared across
/// every connection task for the lifetime of the server.
///
/// # Example
///
/// ```rust
/// use talkwire_protocol::{Identity, UserId};
/// use talkwire_registry::{CredentialStore, RegistryError};
///
/// /// Accepts any token and uses it verbatim as the user id.
/// /// Only for development — never use this in production!
/// struct AcceptAll;
///
/// impl CredentialStore for AcceptAll {
///     async fn verify(
///         &self,
///         token: &str,
///     ) -> Result<Identity, RegistryError> {
///         if token.is_empty() {
///             return Err(RegistryError::AuthFailed(
///                 "no token provided".into(),
///             ));
///         }
///         Ok(Identity {
///             user_id: UserId::new(token),
///             display_name: token.to_string(),
///             avatar: None,
///             email: format!("{token}@example.invalid"),
///             verified: false,
///         })
///     }
/// }
/// ```
pub trait CredentialStore: Send + Sync + 'static {
    /// Validates the given token.
    ///
    /// # Returns
    /// - `Ok(Identity)` — the token is valid; here's who presented it
    /// - `Err(RegistryError::AuthFailed)` — invalid, expired, or the
    ///   user behind it vanished
    fn verify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, RegistryError>> + Send;
}
