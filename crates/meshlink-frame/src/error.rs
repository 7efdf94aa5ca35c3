//! Codec error types.

use thiserror::Error;

use crate::MessageKind;

/// Errors that can occur when encoding a message.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The message could not be serialized.
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reasons a received frame does not carry a usable message.
///
/// Decoding never fails hard; every outcome that isn't a [`Message`](crate::Message)
/// is one of these. [`InvalidFrame::Empty`] means nothing was received, the other
/// variants mean something was received but it can't be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidFrame {
    /// The frame was empty or contained only zero padding.
    #[error("empty frame")]
    Empty,

    /// The frame was not valid UTF-8 JSON, or a known field had the wrong shape.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The frame parsed but has no recognizable `type`.
    #[error("unclassifiable frame: {0}")]
    Unclassifiable(String),

    /// A well-formed message of a kind that is not accepted in this direction.
    #[error("unexpected {0} message")]
    Unexpected(MessageKind),
}

impl InvalidFrame {
    /// Whether this is the "nothing received" case.
    pub fn is_empty(&self) -> bool {
        matches!(self, InvalidFrame::Empty)
    }

    /// Short label for logging and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            InvalidFrame::Empty => "empty",
            InvalidFrame::Malformed(_) => "malformed",
            InvalidFrame::Unclassifiable(_) => "unclassifiable",
            InvalidFrame::Unexpected(_) => "unexpected",
        }
    }
}
