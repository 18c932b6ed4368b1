//! Shared session state published to every listener.

use std::sync::Arc;

use tokio::sync::watch;

use super::AuthUser;

/// Authentication state of the active client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No answer from the auth backend yet.
    #[default]
    Checking,
    SignedOut,
    SignedIn(AuthUser),
}

impl SessionState {
    #[must_use]
    pub const fn is_checking(&self) -> bool {
        matches!(self, Self::Checking)
    }

    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::SignedIn(user) => Some(user),
            Self::Checking | Self::SignedOut => None,
        }
    }
}

/// Cloneable handle to the session; every clone observes the same state.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: Arc<watch::Sender<SessionState>>,
}

impl SessionHandle {
    /// Create a handle in the `Checking` state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(SessionState::Checking)
    }

    #[must_use]
    pub fn with_state(state: SessionState) -> Self {
        let (sender, _receiver) = watch::channel(state);
        Self {
            sender: Arc::new(sender),
        }
    }

    #[must_use]
    pub fn signed_in(user: AuthUser) -> Self {
        Self::with_state(SessionState::SignedIn(user))
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.sender.borrow().clone()
    }

    #[must_use]
    pub fn current_user_id(&self) -> Option<String> {
        self.sender.borrow().user().map(|user| user.id.clone())
    }

    /// Subscribe to session changes. The receiver starts at the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.sender.subscribe()
    }

    pub fn set_signed_in(&self, user: AuthUser) {
        tracing::debug!("Session signed in as {}", user.id);
        self.sender.send_replace(SessionState::SignedIn(user));
    }

    pub fn set_signed_out(&self) {
        tracing::debug!("Session signed out");
        self.sender.send_replace(SessionState::SignedOut);
    }

    /// Wait until the session leaves `Checking` and return the resolved state.
    pub async fn resolved(&self) -> SessionState {
        let mut receiver = self.subscribe();
        // The sender lives as long as `self`, so the wait cannot observe a closed channel.
        let resolved = receiver
            .wait_for(|state| !state.is_checking())
            .await
            .map(|state| state.clone());
        resolved.unwrap_or(SessionState::SignedOut)
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn user(id: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            email: None,
        }
    }

    #[test]
    fn new_handle_is_checking_without_user() {
        let session = SessionHandle::new();
        assert!(session.state().is_checking());
        assert_eq!(session.current_user_id(), None);
    }

    #[test]
    fn clones_share_state() {
        let session = SessionHandle::new();
        let clone = session.clone();
        session.set_signed_in(user("owner"));
        assert_eq!(clone.current_user_id().as_deref(), Some("owner"));

        clone.set_signed_out();
        assert_eq!(session.state(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn resolved_waits_for_first_answer() {
        let session = SessionHandle::new();
        let publisher = session.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            publisher.set_signed_in(user("late"));
        });

        let state = session.resolved().await;
        assert_eq!(state.user().map(|u| u.id.as_str()), Some("late"));
    }

    #[tokio::test]
    async fn resolved_returns_immediately_when_known() {
        let session = SessionHandle::with_state(SessionState::SignedOut);
        assert_eq!(session.resolved().await, SessionState::SignedOut);
    }
}
