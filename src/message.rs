//! Editor message types.
//!
//! Every UI event is a message, applied by [`crate::Editor::update`] in the
//! Elm architecture style.

use crate::intake::SelectedFile;
use crate::model::{BoundingRect, PointerEvent};

/// Messages that can be sent to update editor state.
#[derive(Debug, Clone)]
pub enum Message {
    // Image intake
    /// Files picked or dropped
    FilesSelected(Vec<SelectedFile>),
    /// Discard the pending selection
    CancelSelection,
    /// Upload the first pending file
    ConfirmUpload,
    /// Forget the current image
    ClearImage,

    // Overlay
    /// "Add Text" pressed
    AddText,
    /// Text input changed
    TextChanged(String),
    /// Font size set to a number
    FontSizeChanged(i32),
    /// Font size input changed (raw form value)
    FontSizeInput(String),
    /// Leave edit mode
    FinishEditing,
    /// Drag started on the text element
    DragStarted {
        /// Pointer position
        pointer: PointerEvent,
        /// Bounding box of the dragged text element
        element: BoundingRect,
    },
    /// Pointer moved over the image container during a drag
    DraggedOver {
        /// Pointer position
        pointer: PointerEvent,
        /// Bounding box of the image container
        container: BoundingRect,
    },
    /// Drag finished
    DragEnded,

    // Export
    /// Compose and download the result
    Export,
}

/// Result of applying a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing changed (no-op or ignored)
    Unchanged,
    /// State changed
    Changed,
    /// A new image was uploaded
    Uploaded {
        /// Data URL length in bytes
        size: usize,
    },
    /// The composite was exported
    Exported {
        /// Where the download went
        location: String,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
}

impl Outcome {
    pub(crate) fn changed_if(changed: bool) -> Self {
        if changed {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        }
    }
}
