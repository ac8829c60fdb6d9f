//! Line-oriented editing sessions.
//!
//! Each line is one command with shell-style quoting, mapped to a
//! [`Message`] and applied to an [`Editor`]. Used by the native CLI to
//! drive the same state machine the browser front-end drives with events.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::editor::Editor;
use crate::intake::SelectedFile;
use crate::message::{Message, Outcome};
use crate::model::{BoundingRect, PointerEvent};

/// Errors raised while parsing a session line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// Unbalanced quotes or a dangling escape
    #[error("Cannot split line: {0}")]
    Quoting(String),

    /// The command word is not known
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    /// Too few arguments
    #[error("'{command}' expects {expected}")]
    MissingArgument {
        /// Command word
        command: String,
        /// Usage hint
        expected: &'static str,
    },

    /// More arguments than the command takes
    #[error("'{command}' does not take '{value}'")]
    UnexpectedArgument {
        /// Command word
        command: String,
        /// First extra argument
        value: String,
    },

    /// A numeric argument did not parse
    #[error("'{value}' is not a number")]
    InvalidNumber {
        /// Offending argument
        value: String,
    },
}

/// A parsed session line.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Apply a message to the editor
    Apply(Message),
    /// Print the editor state
    Status,
    /// End the session
    Quit,
}

const DRAG_USAGE: &str = "<px> <py> <left> <top> <width> <height>";

/// Parse one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<SessionCommand>, SessionError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens = shlex::split(trimmed).ok_or_else(|| SessionError::Quoting(trimmed.to_string()))?;
    let Some((verb, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let message = match verb.as_str() {
        "select" => {
            if args.is_empty() {
                return Err(missing(verb, "<path>..."));
            }
            Message::FilesSelected(args.iter().map(SelectedFile::from_path).collect())
        }
        "cancel" => Message::CancelSelection,
        "upload" => Message::ConfirmUpload,
        "clear" => Message::ClearImage,
        "add-text" => Message::AddText,
        "text" => Message::TextChanged(args.join(" ")),
        "size" => match args.first() {
            Some(value) => Message::FontSizeInput(value.clone()),
            None => return Err(missing(verb, "<pixels>")),
        },
        "done" => Message::FinishEditing,
        "drag-start" => {
            let (pointer, element) = pointer_and_rect(verb, args)?;
            Message::DragStarted { pointer, element }
        }
        "drag-over" => {
            let (pointer, container) = pointer_and_rect(verb, args)?;
            Message::DraggedOver { pointer, container }
        }
        "drag-end" => Message::DragEnded,
        "export" => Message::Export,
        "status" => return Ok(Some(SessionCommand::Status)),
        "quit" | "exit" => return Ok(Some(SessionCommand::Quit)),
        other => return Err(SessionError::UnknownCommand(other.to_string())),
    };
    Ok(Some(SessionCommand::Apply(message)))
}

fn missing(command: &str, expected: &'static str) -> SessionError {
    SessionError::MissingArgument {
        command: command.to_string(),
        expected,
    }
}

fn pointer_and_rect(
    command: &str,
    args: &[String],
) -> Result<(PointerEvent, BoundingRect), SessionError> {
    if args.len() < 6 {
        return Err(missing(command, DRAG_USAGE));
    }
    if let Some(extra) = args.get(6) {
        return Err(SessionError::UnexpectedArgument {
            command: command.to_string(),
            value: extra.clone(),
        });
    }
    let mut values = [0.0f32; 6];
    for (slot, arg) in values.iter_mut().zip(args) {
        *slot = arg.parse().map_err(|_| SessionError::InvalidNumber {
            value: arg.clone(),
        })?;
    }
    let [px, py, left, top, width, height] = values;
    Ok((
        PointerEvent::new(px, py),
        BoundingRect::new(left, top, width, height),
    ))
}

/// Human-readable summary of the editor state.
pub fn status_report(editor: &Editor) -> String {
    let mut lines = Vec::new();
    match editor.image() {
        Some(image) => {
            let size = image
                .dimensions()
                .map(|(w, h)| format!("{}x{}", w, h))
                .unwrap_or_else(|e| format!("undecodable: {}", e));
            lines.push(format!(
                "image: {} {} ({} byte data URL)",
                image.mime().as_str(),
                size,
                image.data_url().len()
            ));
        }
        None => lines.push("image: none".to_string()),
    }

    let pending: Vec<&str> = editor.pending().iter().map(|f| f.name.as_str()).collect();
    if !pending.is_empty() {
        lines.push(format!("pending: {}", pending.join(", ")));
    }

    if let Some(style) = editor.overlay_style() {
        let annotation = editor.annotation();
        lines.push(format!(
            "text: {:?} at ({}, {}) {}px{}{}",
            annotation.text,
            style.left,
            style.top,
            style.font_size_px,
            if style.editable { " [editing]" } else { "" },
            if editor.is_dragging() { " [dragging]" } else { "" },
        ));
    }

    if let Some(error) = editor.last_error() {
        lines.push(format!("last error: {}", error));
    }
    lines.join("\n")
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Unchanged => "unchanged".to_string(),
        Outcome::Changed => "ok".to_string(),
        Outcome::Uploaded { size } => format!("uploaded ({} byte data URL)", size),
        Outcome::Exported {
            location,
            width,
            height,
        } => format!("exported {}x{} to {}", width, height, location),
    }
}

/// Run commands from `input` until EOF or `quit`, writing one response
/// line per command to `output`.
///
/// Parse and editor errors are reported and the session continues.
/// Returns the number of commands that failed.
pub fn run<R: BufRead, W: Write>(
    editor: &mut Editor,
    input: R,
    mut output: W,
) -> io::Result<usize> {
    let mut failures = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                failures += 1;
                writeln!(output, "line {}: {}", index + 1, e)?;
                continue;
            }
        };

        match command {
            SessionCommand::Quit => break,
            SessionCommand::Status => writeln!(output, "{}", status_report(editor))?,
            SessionCommand::Apply(message) => {
                log::debug!("line {}: {:?}", index + 1, message);
                match editor.update(message) {
                    Ok(outcome) => writeln!(output, "{}", describe(&outcome))?,
                    Err(e) => {
                        failures += 1;
                        writeln!(output, "line {}: {}", index + 1, e)?;
                    }
                }
            }
        }
    }
    output.flush()?;
    Ok(failures)
}
