//! Top-level error type for editor operations.

use thiserror::Error;

use crate::export::ExportError;
use crate::intake::IntakeError;

/// Errors returned by [`crate::Editor`].
#[derive(Error, Debug)]
pub enum EditorError {
    /// Upload failed
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// Export failed
    #[error(transparent)]
    Export(#[from] ExportError),
}
