//! Firebase email/password auth client and session plumbing.

mod session;
mod status;

use std::fmt;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{normalize_base_url, now_unix_seconds};

pub use session::{SessionHandle, SessionState};
pub use status::{AuthStatus, AuthStatusObserver};

const EXPIRY_SKEW_SECONDS: i64 = 60;
const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= now_unix_seconds() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Firebase auth is not configured for this profile.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Firebase Identity Toolkit client. Every sign-in state change is
/// published to the attached [`SessionHandle`].
#[derive(Clone)]
pub struct FirebaseAuthClient<S: SessionPersistence> {
    identity_url: String,
    token_url: String,
    api_key: String,
    client: Client,
    store: S,
    session: SessionHandle,
}

impl<S: SessionPersistence> FirebaseAuthClient<S> {
    pub fn new(api_key: impl Into<String>, store: S, session: SessionHandle) -> AuthResult<Self> {
        Self::with_base_urls(
            DEFAULT_IDENTITY_URL,
            DEFAULT_TOKEN_URL,
            api_key,
            store,
            session,
        )
    }

    /// Build a client against custom endpoints, e.g. the local auth emulator.
    pub fn with_base_urls(
        identity_url: &str,
        token_url: &str,
        api_key: impl Into<String>,
        store: S,
        session: SessionHandle,
    ) -> AuthResult<Self> {
        let identity_url = normalize_base_url(identity_url, "Identity Toolkit URL")
            .map_err(AuthError::InvalidConfiguration)?;
        let token_url = normalize_base_url(token_url, "Secure Token URL")
            .map_err(AuthError::InvalidConfiguration)?;
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Firebase API key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            identity_url,
            token_url,
            api_key,
            client: Client::builder().build()?,
            store,
            session,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Load the persisted session, refreshing it when expired, and resolve
    /// the session handle either way.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            self.session.set_signed_out();
            return Ok(None);
        };

        if !stored_session.is_expired() {
            self.session.set_signed_in(stored_session.user.clone());
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                self.session.set_signed_out();
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_request("accounts:signUp", email, password)
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_request("accounts:signInWithPassword", email, password)
            .await
    }

    pub async fn refresh_session(&self, current: &AuthSession) -> AuthResult<AuthSession> {
        if current.refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty".to_string(),
            ));
        }

        let request = self
            .client
            .post(format!("{}/token", self.token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ]);
        let response: SecureTokenResponse = send_json(request).await?;
        let session = response.into_session(current.user.email.clone())?;

        self.persist(&session)?;
        Ok(session)
    }

    /// Firebase has no server-side logout for ID tokens; dropping the
    /// persisted refresh token ends the session for this client.
    pub fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_session()?;
        self.session.set_signed_out();
        Ok(())
    }

    async fn password_request(
        &self,
        route: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
            "returnSecureToken": true,
        });
        let request = self
            .client
            .post(format!("{}/{route}", self.identity_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload);
        let response: PasswordAuthResponse = send_json(request).await?;
        let session = response.into_session()?;

        self.persist(&session)?;
        tracing::info!("Signed in as {}", session.user.id);
        Ok(session)
    }

    fn persist(&self, session: &AuthSession) -> AuthResult<()> {
        self.store.save_session(session)?;
        self.session.set_signed_in(session.user.clone());
        Ok(())
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}

async fn send_json<T: serde::de::DeserializeOwned>(request: RequestBuilder) -> AuthResult<T> {
    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Api(parse_api_error(status, &body)));
    }
    Ok(response.json::<T>().await?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    local_id: String,
    email: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

impl PasswordAuthResponse {
    fn into_session(self) -> AuthResult<AuthSession> {
        build_session(
            self.id_token,
            self.refresh_token,
            self.expires_in.as_deref(),
            AuthUser {
                id: self.local_id,
                email: self.email,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
struct SecureTokenResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    user_id: String,
}

impl SecureTokenResponse {
    fn into_session(self, email: Option<String>) -> AuthResult<AuthSession> {
        build_session(
            self.id_token,
            self.refresh_token,
            self.expires_in.as_deref(),
            AuthUser {
                id: self.user_id,
                email,
            },
        )
    }
}

fn build_session(
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<&str>,
    user: AuthUser,
) -> AuthResult<AuthSession> {
    let expires_in = expires_in
        .map(|raw| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| AuthError::Api(format!("Invalid expiresIn value: {raw}")))
        })
        .transpose()?;

    match (id_token, refresh_token, expires_in) {
        (Some(id_token), Some(refresh_token), Some(expires_in)) if !user.id.is_empty() => {
            Ok(AuthSession {
                id_token,
                refresh_token,
                expires_at: now_unix_seconds().saturating_add(expires_in),
                user,
            })
        }
        _ => Err(AuthError::Api(
            "Auth response did not include enough session fields".to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorResponse {
    error: Option<FirebaseErrorBody>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<FirebaseErrorResponse>(body) {
        if let Some(message) = payload.error.and_then(|error| error.message) {
            return format!("{} ({})", describe_error_code(message.trim()), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn describe_error_code(code: &str) -> String {
    // Codes can carry a detail suffix, e.g. "WEAK_PASSWORD : Password should be ..."
    let base = code.split(" : ").next().unwrap_or(code);
    match base {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Bad user credentials".to_string()
        }
        "EMAIL_EXISTS" => "An account with this email already exists".to_string(),
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" => {
            "Session expired, please sign in again".to_string()
        }
        _ => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct MemorySessionStore {
        inner: Arc<Mutex<HashMap<&'static str, String>>>,
    }

    impl SessionPersistence for MemorySessionStore {
        fn load_session(&self) -> AuthResult<Option<AuthSession>> {
            let guard = self.inner.lock().unwrap();
            guard
                .get("session")
                .map(|raw| serde_json::from_str(raw).map_err(AuthError::from))
                .transpose()
        }

        fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
            let raw = serde_json::to_string(session)?;
            self.inner.lock().unwrap().insert("session", raw);
            Ok(())
        }

        fn clear_session(&self) -> AuthResult<()> {
            self.inner.lock().unwrap().remove("session");
            Ok(())
        }
    }

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            id_token: "secret-id-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at,
            user: AuthUser {
                id: "user".to_string(),
                email: Some("user@example.com".to_string()),
            },
        }
    }

    #[test]
    fn client_rejects_empty_api_key() {
        let result =
            FirebaseAuthClient::new("  ", MemorySessionStore::default(), SessionHandle::new());
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
    }

    #[test]
    fn client_rejects_invalid_emulator_url() {
        let result = FirebaseAuthClient::with_base_urls(
            "localhost:9099",
            DEFAULT_TOKEN_URL,
            "key",
            MemorySessionStore::default(),
            SessionHandle::new(),
        );
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
    }

    #[test]
    fn password_response_builds_session() {
        let response: PasswordAuthResponse = serde_json::from_str(
            r#"{
                "localId": "uid-1",
                "email": "owner@example.com",
                "idToken": "id",
                "refreshToken": "refresh",
                "expiresIn": "3600",
                "registered": true
            }"#,
        )
        .unwrap();

        let session = response.into_session().unwrap();
        assert_eq!(session.user.id, "uid-1");
        assert_eq!(session.user.email.as_deref(), Some("owner@example.com"));
        assert!(!session.is_expired());
    }

    #[test]
    fn password_response_without_tokens_is_rejected() {
        let response = PasswordAuthResponse {
            local_id: "uid-1".to_string(),
            email: None,
            id_token: None,
            refresh_token: None,
            expires_in: None,
        };
        assert!(matches!(response.into_session(), Err(AuthError::Api(_))));
    }

    #[test]
    fn secure_token_response_keeps_known_email() {
        let response: SecureTokenResponse = serde_json::from_str(
            r#"{
                "id_token": "id",
                "refresh_token": "refresh",
                "expires_in": "3600",
                "token_type": "Bearer",
                "user_id": "uid-2",
                "project_id": "123"
            }"#,
        )
        .unwrap();

        let session = response
            .into_session(Some("kept@example.com".to_string()))
            .unwrap();
        assert_eq!(session.user.id, "uid-2");
        assert_eq!(session.user.email.as_deref(), Some("kept@example.com"));
    }

    #[test]
    fn parse_api_error_maps_known_codes() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_NOT_FOUND","errors":[]}}"#;
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, body),
            "Bad user credentials (400)"
        );

        let body = r#"{"error":{"code":400,"message":"WEAK_PASSWORD : Password should be at least 6 characters"}}"#;
        assert!(parse_api_error(StatusCode::BAD_REQUEST, body).starts_with("WEAK_PASSWORD"));
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(1_700_000_000));
        assert!(!rendered.contains("secret-id-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn restore_without_stored_session_resolves_signed_out() {
        let handle = SessionHandle::new();
        let client =
            FirebaseAuthClient::new("key", MemorySessionStore::default(), handle.clone()).unwrap();

        assert!(client.restore_session().await.unwrap().is_none());
        assert_eq!(handle.state(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn restore_valid_session_publishes_user() {
        let store = MemorySessionStore::default();
        store
            .save_session(&session(now_unix_seconds() + 3_600))
            .unwrap();
        let handle = SessionHandle::new();
        let client = FirebaseAuthClient::new("key", store, handle.clone()).unwrap();

        let restored = client.restore_session().await.unwrap().unwrap();
        assert_eq!(restored.user.id, "user");
        assert_eq!(handle.current_user_id().as_deref(), Some("user"));
    }

    #[test]
    fn sign_out_clears_store_and_session() {
        let store = MemorySessionStore::default();
        store
            .save_session(&session(now_unix_seconds() + 3_600))
            .unwrap();
        let handle = SessionHandle::signed_in(AuthUser {
            id: "user".to_string(),
            email: None,
        });
        let client = FirebaseAuthClient::new("key", store.clone(), handle.clone()).unwrap();

        client.sign_out().unwrap();
        assert!(store.load_session().unwrap().is_none());
        assert_eq!(handle.state(), SessionState::SignedOut);
    }
}
