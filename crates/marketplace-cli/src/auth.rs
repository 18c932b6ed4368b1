//! CLI Firebase auth/session helpers with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use marketplace_core::auth::{AuthResult, FirebaseAuthClient, SessionHandle, SessionPersistence};
pub use marketplace_core::auth::{AuthError, AuthSession};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "house-marketplace-cli";

#[derive(Clone)]
struct SessionStore {
    username: String,
}

impl SessionStore {
    fn new(profile_name: &str) -> Self {
        Self {
            username: format!("firebase_session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        match self.entry()?.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Auth client bound to one CLI profile's keychain entry.
#[derive(Clone)]
pub struct FirebaseAuthService {
    inner: FirebaseAuthClient<SessionStore>,
}

impl FirebaseAuthService {
    pub fn new(profile_name: &str, api_key: &str, session: SessionHandle) -> AuthResult<Self> {
        Ok(Self {
            inner: FirebaseAuthClient::new(api_key, SessionStore::new(profile_name), session)?,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_in(email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_up(email, password).await
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        self.inner.restore_session().await
    }

    pub fn sign_out(&self) -> AuthResult<()> {
        self.inner.sign_out()
    }
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}

#[cfg(test)]
mod tests {
    use marketplace_core::auth::{AuthUser, SessionState};

    use super::*;

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            id_token: "id-token".to_string(),
            refresh_token: "refresh-token".to_string(),
            expires_at,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("user@example.com".to_string()),
            },
        }
    }

    #[test]
    fn session_store_is_scoped_per_profile() {
        let work = SessionStore::new("store-scope-work");
        let home = SessionStore::new("store-scope-home");
        work.save_session(&session(1)).unwrap();

        assert!(work.load_session().unwrap().is_some());
        assert!(home.load_session().unwrap().is_none());

        clear_stored_session("store-scope-work").unwrap();
        assert!(work.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_publishes_unexpired_session() {
        let profile = "restore-unexpired";
        let far_future = chrono::Utc::now().timestamp() + 3_600;
        SessionStore::new(profile)
            .save_session(&session(far_future))
            .unwrap();

        let handle = SessionHandle::new();
        let service = FirebaseAuthService::new(profile, "api-key", handle.clone()).unwrap();
        let restored = service.restore_session().await.unwrap();

        assert_eq!(restored.map(|s| s.user.id), Some("user-1".to_string()));
        assert_eq!(handle.current_user_id().as_deref(), Some("user-1"));

        service.sign_out().unwrap();
        assert_eq!(handle.state(), SessionState::SignedOut);
        assert!(SessionStore::new(profile).load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_without_stored_session_signs_out() {
        let handle = SessionHandle::new();
        let service = FirebaseAuthService::new("restore-empty", "api-key", handle.clone()).unwrap();
        assert!(service.restore_session().await.unwrap().is_none());
        assert_eq!(handle.state(), SessionState::SignedOut);
    }
}
