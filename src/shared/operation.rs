/**
 * Text Operations
 *
 * This module defines the atomic edit primitive exchanged between editing
 * clients and the server: an insert of some text at a position, or the
 * deletion of a run of characters starting at a position.
 *
 * # Positions
 *
 * Positions and lengths count Unicode scalar values (`char`s), never bytes,
 * so an operation can never split a multi-byte character.
 *
 * # Wire Format
 *
 * ```json
 * {"kind":"insert","position":3,"text":"d"}
 * {"kind":"delete","position":0,"length":5}
 * ```
 */

use serde::{Deserialize, Serialize};
use crate::shared::error::EditError;

/// A single edit against a text document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    /// Insert text at a specific position
    Insert {
        /// Position in the document (character index)
        position: usize,
        /// Text to insert
        text: String,
    },
    /// Delete a run of characters
    Delete {
        /// Start position (inclusive)
        position: usize,
        /// Number of characters removed
        length: usize,
    },
}

impl Operation {
    /// Create a new insert operation
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Self::Insert {
            position,
            text: text.into(),
        }
    }

    /// Create a new delete operation
    pub fn delete(position: usize, length: usize) -> Self {
        Self::Delete { position, length }
    }

    pub fn position(&self) -> usize {
        match self {
            Self::Insert { position, .. } | Self::Delete { position, .. } => *position,
        }
    }

    /// Net change of the document length, in characters, when applied
    pub fn len_delta(&self) -> isize {
        match self {
            Self::Insert { text, .. } => char_len(text) as isize,
            Self::Delete { length, .. } => -(*length as isize),
        }
    }

    /// Check the operation against a document of `document_length` characters
    ///
    /// Empty inserts and zero-length deletes are rejected as malformed; they
    /// carry no edit and a client sending them is out of protocol.
    pub fn validate(&self, document_length: usize) -> Result<(), EditError> {
        match self {
            Self::Insert { position, text } => {
                if text.is_empty() {
                    return Err(EditError::malformed("insert text must not be empty"));
                }
                if *position > document_length {
                    return Err(EditError::out_of_range(*position, *position, document_length));
                }
            }
            Self::Delete { position, length } => {
                if *length == 0 {
                    return Err(EditError::malformed("delete length must be positive"));
                }
                let end = position
                    .checked_add(*length)
                    .ok_or_else(|| EditError::out_of_range(*position, usize::MAX, document_length))?;
                if end > document_length {
                    return Err(EditError::out_of_range(*position, end, document_length));
                }
            }
        }
        Ok(())
    }

    /// Apply the operation to `content` in place
    ///
    /// On error `content` is left untouched.
    pub fn apply_to(&self, content: &mut String) -> Result<(), EditError> {
        match self {
            Self::Insert { position, text } => {
                let offset = byte_offset(content, *position)
                    .ok_or_else(|| EditError::out_of_range(*position, *position, char_len(content)))?;
                content.insert_str(offset, text);
            }
            Self::Delete { position, length } => {
                let end = position.saturating_add(*length);
                let range = byte_offset(content, *position).zip(byte_offset(content, end));
                let (start_byte, end_byte) =
                    range.ok_or_else(|| EditError::out_of_range(*position, end, char_len(content)))?;
                content.replace_range(start_byte..end_byte, "");
            }
        }
        Ok(())
    }

    /// Apply the operation to a copy of `content`
    pub fn apply(&self, content: &str) -> Result<String, EditError> {
        let mut out = content.to_string();
        self.apply_to(&mut out)?;
        Ok(out)
    }
}

/// Apply a sequence of operations, in order, to a copy of `content`
pub fn apply_all<'a>(
    content: &str,
    operations: impl IntoIterator<Item = &'a Operation>,
) -> Result<String, EditError> {
    let mut out = content.to_string();
    for op in operations {
        op.apply_to(&mut out)?;
    }
    Ok(out)
}

/// Length of `text` in characters
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the character at `char_pos`, or of the end of the string
/// when `char_pos` equals its length
fn byte_offset(text: &str, char_pos: usize) -> Option<usize> {
    text.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .nth(char_pos)
}
