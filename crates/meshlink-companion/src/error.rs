//! Decoding errors and firmware error codes.

use thiserror::Error;

use crate::constants::*;

/// A frame body that could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("truncated frame: need {expected} bytes, have {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("unknown command code 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("unknown response code 0x{0:02X}")]
    UnknownResponse(u8),

    #[error("text field is not UTF-8")]
    InvalidUtf8,
}

/// Reason carried by a `RESP_CODE_ERR` frame.
///
/// Codes the radio may add later decode as [`FirmwareErrorCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareErrorCode {
    UnsupportedCommand,
    NotFound,
    TableFull,
    BadState,
    FileIo,
    IllegalArgument,
    Other(u8),
}

const KNOWN_CODES: [(u8, FirmwareErrorCode, &str); 6] = [
    (ERR_CODE_UNSUPPORTED_CMD, FirmwareErrorCode::UnsupportedCommand, "unsupported command"),
    (ERR_CODE_NOT_FOUND, FirmwareErrorCode::NotFound, "not found"),
    (ERR_CODE_TABLE_FULL, FirmwareErrorCode::TableFull, "table full"),
    (ERR_CODE_BAD_STATE, FirmwareErrorCode::BadState, "bad state"),
    (ERR_CODE_FILE_IO_ERROR, FirmwareErrorCode::FileIo, "file i/o error"),
    (ERR_CODE_ILLEGAL_ARG, FirmwareErrorCode::IllegalArgument, "illegal argument"),
];

impl From<u8> for FirmwareErrorCode {
    fn from(code: u8) -> Self {
        KNOWN_CODES
            .iter()
            .find(|(raw, _, _)| *raw == code)
            .map(|(_, known, _)| *known)
            .unwrap_or(FirmwareErrorCode::Other(code))
    }
}

impl From<FirmwareErrorCode> for u8 {
    fn from(code: FirmwareErrorCode) -> Self {
        match code {
            FirmwareErrorCode::Other(raw) => raw,
            known => KNOWN_CODES
                .iter()
                .find(|(_, c, _)| *c == known)
                .map(|(raw, _, _)| *raw)
                .unwrap_or_default(),
        }
    }
}

impl std::fmt::Display for FirmwareErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match KNOWN_CODES.iter().find(|(_, c, _)| c == self) {
            Some((_, _, text)) => f.write_str(text),
            None => write!(f, "firmware error 0x{:02X}", u8::from(*self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_codes() {
        assert_eq!(FirmwareErrorCode::from(ERR_CODE_TABLE_FULL), FirmwareErrorCode::TableFull);
        assert_eq!(FirmwareErrorCode::from(0x42), FirmwareErrorCode::Other(0x42));
        assert_eq!(u8::from(FirmwareErrorCode::NotFound), ERR_CODE_NOT_FOUND);
        assert_eq!(FirmwareErrorCode::TableFull.to_string(), "table full");
        assert_eq!(FirmwareErrorCode::Other(0x42).to_string(), "firmware error 0x42");
    }
}
