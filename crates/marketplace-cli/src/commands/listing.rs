use std::path::PathBuf;
use std::sync::Arc;

use marketplace_core::editor::{EditorError, FieldInput, ListingEditor, SubmitOutcome};
use marketplace_core::storage::UploadProgress;
use marketplace_core::Backend;

use crate::commands::common::{apply_assignments, connect, parse_listing_id, read_images};
use crate::error::CliError;

/// Field edits and replacement images collected from the command line.
pub struct ListingChanges {
    pub assignments: Vec<String>,
    pub images: Vec<PathBuf>,
}

pub async fn run_create(changes: ListingChanges, global_profile: Option<&str>) -> Result<(), CliError> {
    let connection = connect(global_profile).await?;
    let outcome = create_listing(connection.backend, &changes).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_edit(
    id: &str,
    changes: ListingChanges,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let listing_id = parse_listing_id(id)?;
    let connection = connect(global_profile).await?;
    let mut editor = new_editor(connection.backend);
    editor.load(&listing_id).await.map_err(redirected)?;
    let outcome = submit_changes(&mut editor, &changes).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn create_listing(
    backend: Backend,
    changes: &ListingChanges,
) -> Result<SubmitOutcome, CliError> {
    let mut editor = new_editor(backend);
    editor.start_create().await.map_err(redirected)?;
    submit_changes(&mut editor, changes).await
}

pub async fn submit_changes(
    editor: &mut ListingEditor,
    changes: &ListingChanges,
) -> Result<SubmitOutcome, CliError> {
    apply_assignments(editor, &changes.assignments)?;
    if !changes.images.is_empty() {
        editor.apply(FieldInput::files(read_images(&changes.images)?))?;
    }
    Ok(editor.submit().await.map_err(redirected)?)
}

fn new_editor(backend: Backend) -> ListingEditor {
    ListingEditor::new(backend).with_progress(Arc::new(|progress: UploadProgress| {
        if progress.is_complete() {
            eprintln!("Uploaded {}", progress.file_name);
        }
    }))
}

fn redirected(error: EditorError) -> EditorError {
    if let Some(route) = error.redirect() {
        tracing::info!("Redirecting to {}", route);
    }
    error
}

fn print_outcome(outcome: &SubmitOutcome) {
    println!("{}", outcome.notice);
    println!("{}", outcome.route);
}
