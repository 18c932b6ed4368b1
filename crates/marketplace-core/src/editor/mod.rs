//! Create/edit listing flow.
//!
//! The editor owns a [`ListingDraft`] and moves through
//! `Idle -> Loading -> Ready -> Submitting -> Finished`. A failed submit
//! returns it to `Ready`; a failed load or ownership check finishes it with
//! a redirect.

mod draft;
mod error;

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;

use crate::auth::SessionState;
use crate::backend::Backend;
use crate::models::{ImageFile, ListingId, Route};
use crate::storage::{image_object_key, UploadProgress};

pub use draft::{DraftField, FieldInput, ListingDraft};
pub use error::{EditorError, EditorResult};

/// Callback receiving per-file upload progress.
pub type ProgressSink = Arc<dyn Fn(UploadProgress) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorPhase {
    Idle,
    Loading,
    /// Draft is editable.
    Ready,
    Submitting,
    Finished(Route),
}

impl fmt::Display for EditorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading => f.write_str("loading"),
            Self::Ready => f.write_str("ready"),
            Self::Submitting => f.write_str("submitting"),
            Self::Finished(route) => write!(f, "finished ({route})"),
        }
    }
}

/// Whether the submit creates a new document or overwrites one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(ListingId),
}

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub listing_id: ListingId,
    pub route: Route,
    pub notice: &'static str,
}

pub struct ListingEditor {
    backend: Backend,
    phase: EditorPhase,
    mode: EditorMode,
    draft: Option<ListingDraft>,
    progress: Option<ProgressSink>,
}

impl ListingEditor {
    #[must_use]
    pub const fn new(backend: Backend) -> Self {
        Self {
            backend,
            phase: EditorPhase::Idle,
            mode: EditorMode::Create,
            draft: None,
            progress: None,
        }
    }

    /// Forward upload progress to `sink` in addition to the debug log.
    #[must_use]
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    #[must_use]
    pub const fn phase(&self) -> &EditorPhase {
        &self.phase
    }

    #[must_use]
    pub const fn mode(&self) -> &EditorMode {
        &self.mode
    }

    /// The draft, only once the editor is past its load and guard.
    #[must_use]
    pub fn draft(&self) -> Option<&ListingDraft> {
        match self.phase {
            EditorPhase::Ready | EditorPhase::Submitting | EditorPhase::Finished(_) => {
                self.draft.as_ref()
            }
            EditorPhase::Idle | EditorPhase::Loading => None,
        }
    }

    /// Begin a new listing owned by the signed-in user.
    pub async fn start_create(&mut self) -> EditorResult<()> {
        self.expect_phase(&EditorPhase::Idle, "idle")?;
        self.phase = EditorPhase::Loading;
        self.mode = EditorMode::Create;

        match self.backend.session().resolved().await {
            SessionState::SignedIn(user) => {
                self.draft = Some(ListingDraft::blank(user.id));
                self.enter(EditorPhase::Ready);
                Ok(())
            }
            SessionState::Checking | SessionState::SignedOut => {
                self.reject(EditorError::NotSignedIn)
            }
        }
    }

    /// Load an existing listing for editing.
    ///
    /// The ownership guard runs once here, as the only way into `Ready`.
    pub async fn load(&mut self, id: &ListingId) -> EditorResult<()> {
        self.expect_phase(&EditorPhase::Idle, "idle")?;
        self.phase = EditorPhase::Loading;
        self.mode = EditorMode::Edit(id.clone());

        let listing = match self.backend.store().get_listing(id).await {
            Ok(Some(listing)) => listing,
            Ok(None) => return self.reject(EditorError::NotFound(id.clone())),
            Err(error) => {
                tracing::warn!("Failed to load listing {}: {}", id, error);
                self.phase = EditorPhase::Idle;
                return Err(EditorError::LoadFailed(error));
            }
        };
        let session = self.backend.session().resolved().await;
        let owner_matches = session
            .user()
            .is_some_and(|user| listing.fields.is_owned_by(&user.id));
        self.draft = Some(ListingDraft::from_fields(listing.fields));

        if session.user().is_none() {
            return self.reject(EditorError::NotSignedIn);
        }
        if !owner_matches {
            return self.reject(EditorError::NotOwner);
        }

        self.enter(EditorPhase::Ready);
        Ok(())
    }

    /// Apply one input event to the draft.
    pub fn apply(&mut self, input: FieldInput) -> EditorResult<()> {
        self.expect_phase(&EditorPhase::Ready, "ready")?;
        self.draft
            .as_mut()
            .ok_or(EditorError::InvalidState {
                actual: EditorPhase::Ready,
                expected: "a loaded draft",
            })?
            .apply(input)
    }

    /// Validate, upload attached images, then write the listing once.
    pub async fn submit(&mut self) -> EditorResult<SubmitOutcome> {
        self.expect_phase(&EditorPhase::Ready, "ready")?;
        self.enter(EditorPhase::Submitting);

        match self.run_submit().await {
            Ok((outcome, draft)) => {
                self.draft = Some(draft);
                self.enter(EditorPhase::Finished(outcome.route.clone()));
                Ok(outcome)
            }
            Err(error) => {
                if error.is_validation() {
                    tracing::info!("Listing draft rejected: {}", error);
                } else {
                    tracing::warn!("Listing submit failed: {}", error);
                }
                self.enter(EditorPhase::Ready);
                Err(error)
            }
        }
    }

    async fn run_submit(&self) -> EditorResult<(SubmitOutcome, ListingDraft)> {
        let mut draft = self.draft.clone().ok_or(EditorError::InvalidState {
            actual: EditorPhase::Submitting,
            expected: "a loaded draft",
        })?;
        let creating = self.mode == EditorMode::Create;
        draft.check(creating)?;

        let owner = self
            .backend
            .session()
            .current_user_id()
            .ok_or(EditorError::NotSignedIn)?;
        draft.user_ref.clone_from(&owner);

        if let Some(geocoder) = self.backend.geocoder() {
            let location = geocoder
                .locate(&draft.address)
                .await
                .map_err(EditorError::AddressLookup)?
                .ok_or(EditorError::AddressNotFound)?;
            draft.latitude = location.latitude;
            draft.longitude = location.longitude;
        }

        let image_urls = if draft.images.is_empty() {
            draft.image_urls.clone()
        } else {
            self.upload_images(&owner, &draft.images).await?
        };

        let fields = draft.to_fields(image_urls);
        let (listing_id, notice) = match &self.mode {
            EditorMode::Create => {
                let id = self
                    .backend
                    .store()
                    .create_listing(&fields)
                    .await
                    .map_err(EditorError::WriteFailed)?;
                tracing::info!("Created listing {}", id);
                (id, "Listing saved")
            }
            EditorMode::Edit(id) => {
                self.backend
                    .store()
                    .update_listing(id, &fields)
                    .await
                    .map_err(EditorError::WriteFailed)?;
                tracing::info!("Updated listing {}", id);
                (id.clone(), "Listing updated")
            }
        };

        draft.image_urls = fields.image_urls;
        draft.images.clear();
        let route = Route::Category {
            listing_type: fields.listing_type,
            listing_id: listing_id.clone(),
        };
        Ok((
            SubmitOutcome {
                listing_id,
                route,
                notice,
            },
            draft,
        ))
    }

    /// Upload every image concurrently; the first failure rejects them all.
    async fn upload_images(&self, owner: &str, images: &[ImageFile]) -> EditorResult<Vec<String>> {
        let sink = self.progress.clone();
        let report = move |progress: UploadProgress| {
            tracing::debug!(
                "Upload of {} is {:.0}% done",
                progress.file_name,
                progress.percent()
            );
            if let Some(sink) = &sink {
                sink(progress);
            }
        };
        let report = &report;

        let uploads = images.iter().map(|image| async move {
            let key = image_object_key(owner, &image.name)?;
            self.backend.storage().upload(&key, image, report).await
        });

        let urls = try_join_all(uploads)
            .await
            .map_err(EditorError::UploadFailed)?;
        tracing::info!("Uploaded {} images", urls.len());
        Ok(urls)
    }

    fn expect_phase(&self, expected: &EditorPhase, label: &'static str) -> EditorResult<()> {
        if &self.phase == expected {
            Ok(())
        } else {
            Err(EditorError::InvalidState {
                actual: self.phase.clone(),
                expected: label,
            })
        }
    }

    fn enter(&mut self, phase: EditorPhase) {
        tracing::debug!("Listing editor {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Finish with the error's redirect and hand the error back.
    fn reject<T>(&mut self, error: EditorError) -> EditorResult<T> {
        let route = error.redirect().unwrap_or(Route::Home);
        tracing::info!("Listing editor redirecting to {}: {}", route, error);
        self.enter(EditorPhase::Finished(route));
        Err(error)
    }
}

impl fmt::Debug for ListingEditor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ListingEditor")
            .field("phase", &self.phase)
            .field("mode", &self.mode)
            .field("draft", &self.draft)
            .finish_non_exhaustive()
    }
}
