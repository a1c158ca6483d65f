//! Bearer credential provider.
//!
//! The credential is the only authentication fact the client knows: a token
//! is present or it is not. There is no client-side expiry check; the backend
//! answering 401 is what invalidates a token.
//!
//! The provider is a cloneable handle injected into every service, so tests
//! can construct one per case instead of reaching for ambient global state.
//! A [`CredentialStore`] may be attached to persist the credential between
//! runs.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use partstore_core::{Role, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Minimal reference to the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Persisted form of a credential.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token: String,
    pub user: UserRef,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Durable storage for the credential (a file, a keychain, browser storage).
pub trait CredentialStore: Send + Sync {
    /// Load a previously saved credential.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the store exists but cannot be read.
    fn load(&self) -> std::io::Result<Option<StoredCredential>>;

    /// Persist the credential, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the credential cannot be written.
    fn save(&self, credential: &StoredCredential) -> std::io::Result<()>;

    /// Remove the persisted credential. Removing a missing credential is not an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the credential exists but cannot be removed.
    fn clear(&self) -> std::io::Result<()>;
}

struct Credential {
    token: SecretString,
    user: UserRef,
}

/// Shared handle to the current bearer credential.
#[derive(Clone, Default)]
pub struct CredentialProvider {
    inner: Arc<CredentialProviderInner>,
}

#[derive(Default)]
struct CredentialProviderInner {
    current: RwLock<Option<Credential>>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("authenticated", &self.is_authenticated())
            .field("persistent", &self.inner.store.is_some())
            .finish()
    }
}

impl CredentialProvider {
    /// In-memory provider with no credential.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider backed by `store`, primed with whatever the store holds.
    ///
    /// An unreadable store is logged and treated as signed out.
    #[must_use]
    pub fn with_store(store: Arc<dyn CredentialStore>) -> Self {
        let current = match store.load() {
            Ok(stored) => stored.map(|s| Credential {
                token: SecretString::from(s.token),
                user: s.user,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load stored credential");
                None
            }
        };

        Self {
            inner: Arc::new(CredentialProviderInner {
                current: RwLock::new(current),
                store: Some(store),
            }),
        }
    }

    /// True iff a token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read(|c| c.is_some())
    }

    /// Store a token; every subsequent request carries `Authorization: Bearer <token>`.
    ///
    /// A second call overwrites the first.
    pub fn set_credential(&self, token: impl Into<String>, user: UserRef) {
        let token = token.into();
        if let Some(store) = &self.inner.store {
            let stored = StoredCredential {
                token: token.clone(),
                user: user.clone(),
            };
            if let Err(e) = store.save(&stored) {
                tracing::warn!(error = %e, "Failed to persist credential");
            }
        }

        tracing::debug!(user_id = %user.user_id, "Credential set");
        *self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Credential {
            token: SecretString::from(token),
            user,
        });
    }

    /// Remove the token and user reference.
    pub fn clear(&self) {
        let previous = self
            .inner
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(store) = &self.inner.store
            && let Err(e) = store.clear()
        {
            tracing::warn!(error = %e, "Failed to remove stored credential");
        }

        if previous.is_some() {
            tracing::info!("Credential cleared");
        }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<UserRef> {
        self.read(|c| c.map(|c| c.user.clone()))
    }

    /// The bearer token, if any.
    pub(crate) fn bearer(&self) -> Option<SecretString> {
        self.read(|c| c.map(|c| c.token.clone()))
    }

    /// Fail fast with `Unauthenticated` when no credential is present.
    ///
    /// `action` completes the sentence "User must be logged in to ...".
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] when signed out.
    pub fn require(&self, action: &str) -> Result<(), ApiError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::Unauthenticated(format!(
                "User must be logged in to {action}"
            )))
        }
    }

    /// The header value for the current token.
    pub(crate) fn authorization_header(&self) -> Option<String> {
        self.bearer()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }

    fn read<T>(&self, f: impl FnOnce(Option<&Credential>) -> T) -> T {
        let guard = self
            .inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(guard.as_ref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Option<StoredCredential>>,
        clears: Mutex<usize>,
    }

    impl CredentialStore for MemoryStore {
        fn load(&self) -> std::io::Result<Option<StoredCredential>> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(&self, credential: &StoredCredential) -> std::io::Result<()> {
            *self.saved.lock().unwrap() = Some(credential.clone());
            Ok(())
        }

        fn clear(&self) -> std::io::Result<()> {
            *self.saved.lock().unwrap() = None;
            *self.clears.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn user(id: &str) -> UserRef {
        UserRef {
            user_id: UserId::new(id),
            role: Some(Role::Buyer),
            status: None,
        }
    }

    #[test]
    fn test_presence_is_the_only_predicate() {
        let provider = CredentialProvider::new();
        assert!(!provider.is_authenticated());
        assert!(provider.authorization_header().is_none());

        provider.set_credential("tok-1", user("u1"));
        assert!(provider.is_authenticated());
        assert_eq!(provider.authorization_header().unwrap(), "Bearer tok-1");

        provider.clear();
        assert!(!provider.is_authenticated());
        assert!(provider.user().is_none());
    }

    #[test]
    fn test_second_login_overwrites_first() {
        let provider = CredentialProvider::new();
        provider.set_credential("tok-1", user("u1"));
        provider.set_credential("tok-2", user("u2"));
        assert_eq!(provider.authorization_header().unwrap(), "Bearer tok-2");
        assert_eq!(provider.user().unwrap().user_id.as_str(), "u2");
    }

    #[test]
    fn test_require_fails_fast_when_signed_out() {
        let provider = CredentialProvider::new();
        let err = provider.require("add to cart").unwrap_err();
        assert_eq!(err.to_string(), "User must be logged in to add to cart");
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn test_clones_share_state() {
        let provider = CredentialProvider::new();
        let other = provider.clone();
        provider.set_credential("tok", user("u1"));
        assert!(other.is_authenticated());
        other.clear();
        assert!(!provider.is_authenticated());
    }

    #[test]
    fn test_store_round_trip() {
        let store = Arc::new(MemoryStore::default());
        let provider = CredentialProvider::with_store(store.clone());
        provider.set_credential("persisted", user("u9"));

        let restored = CredentialProvider::with_store(store.clone());
        assert!(restored.is_authenticated());
        assert_eq!(restored.user().unwrap().user_id.as_str(), "u9");

        restored.clear();
        assert!(store.load().unwrap().is_none());
        assert_eq!(*store.clears.lock().unwrap(), 1);
    }

    #[test]
    fn test_debug_redacts_token() {
        let stored = StoredCredential {
            token: "super-secret-token".to_string(),
            user: user("u1"),
        };
        let debug = format!("{stored:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-token"));
    }
}
