//! Auth status observer: exposes `logged_in` / `checking` to a UI tree.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::session::{SessionHandle, SessionState};

/// Snapshot consumed by views deciding whether to render private pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthStatus {
    pub logged_in: bool,
    pub checking: bool,
}

impl AuthStatus {
    const CHECKING: Self = Self {
        logged_in: false,
        checking: true,
    };
}

impl From<&SessionState> for AuthStatus {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Checking => Self::CHECKING,
            SessionState::SignedOut => Self {
                logged_in: false,
                checking: false,
            },
            SessionState::SignedIn(_) => Self {
                logged_in: true,
                checking: false,
            },
        }
    }
}

/// Subscribes to session changes for as long as it is alive.
///
/// Dropping the observer stops the subscription task, so no status is
/// published after the owning view goes away.
#[derive(Debug)]
pub struct AuthStatusObserver {
    status: watch::Receiver<AuthStatus>,
    task: JoinHandle<()>,
}

impl AuthStatusObserver {
    /// Start observing `session`. Must be called inside a Tokio runtime.
    pub fn subscribe(session: &SessionHandle) -> Self {
        let (publisher, status) = watch::channel(AuthStatus::CHECKING);
        let mut changes = session.subscribe();

        let task = tokio::spawn(async move {
            loop {
                let next = AuthStatus::from(&*changes.borrow_and_update());
                if publisher.send(next).is_err() {
                    // Every status receiver is gone.
                    break;
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        });

        Self { status, task }
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        *self.status.borrow()
    }

    /// Receiver for status changes, for views that re-render on change.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<AuthStatus> {
        self.status.clone()
    }

    /// Wait until the first session answer arrived.
    pub async fn checked(&mut self) -> AuthStatus {
        self.status
            .wait_for(|status| !status.checking)
            .await
            .map_or(AuthStatus::CHECKING, |status| *status)
    }
}

impl Drop for AuthStatusObserver {
    fn drop(&mut self) {
        self.task.abort();
    }
}
