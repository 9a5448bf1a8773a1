//! Development credential store.

use talkwire_protocol::{Identity, UserId};
use talkwire_registry::{CredentialStore, RegistryError};

/// Credential store for development and tests: the token IS the
/// identity, formatted as `id:name` or `id:name:avatar`.
///
/// Identities produced here are marked unverified and get a throwaway
/// email. Never use this in production — wire up a real
/// [`CredentialStore`] against your token issuer instead.
pub struct DevCredentials;

impl CredentialStore for DevCredentials {
    async fn verify(&self, token: &str) -> Result<Identity, RegistryError> {
        let mut parts = token.splitn(3, ':');
        let id = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        if id.is_empty() || name.is_empty() {
            return Err(RegistryError::AuthFailed(
                "dev token must be id:name[:avatar]".into(),
            ));
        }
        Ok(Identity {
            user_id: UserId::new(id),
            display_name: name.to_string(),
            avatar: parts.next().map(String::from),
            email: format!("{id}@dev.invalid"),
            verified: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_id_and_name() {
        let identity = DevCredentials
            .verify("u-1:Alice")
            .await
            .expect("should verify");
        assert_eq!(identity.user_id, UserId::new("u-1"));
        assert_eq!(identity.display_name, "Alice");
        assert!(identity.avatar.is_none());
        assert!(!identity.verified);
    }

    #[tokio::test]
    async fn test_verify_with_avatar() {
        let identity = DevCredentials
            .verify("u-1:Alice:https://cdn/a.png")
            .await
            .expect("should verify");
        assert_eq!(identity.avatar.as_deref(), Some("https://cdn/a.png"));
    }

    #[tokio::test]
    async fn test_verify_rejects_empty_token() {
        let result = DevCredentials.verify("").await;
        assert!(matches!(result, Err(RegistryError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_verify_rejects_missing_name() {
        let result = DevCredentials.verify("u-1").await;
        assert!(matches!(result, Err(RegistryError::AuthFailed(_))));
    }
}
