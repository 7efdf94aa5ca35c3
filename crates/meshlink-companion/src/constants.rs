//! Wire codes.
//!
//! Only the codes the gateway sends or must recognise are listed; anything
//! else the radio emits is decoded as an unknown response or push.

// ============================================================================
// Commands (host → radio)
// ============================================================================

pub const CMD_APP_START: u8 = 1;
pub const CMD_SEND_CHANNEL_TXT_MSG: u8 = 3;
/// Pull one message from the radio's receive queue.
pub const CMD_SYNC_NEXT_MESSAGE: u8 = 10;

// ============================================================================
// Responses (radio → host)
// ============================================================================

pub const RESP_CODE_OK: u8 = 0;
/// Followed by one `ERR_CODE_*` byte.
pub const RESP_CODE_ERR: u8 = 1;
/// Reply to `CMD_APP_START`.
pub const RESP_CODE_SELF_INFO: u8 = 5;
/// A message was queued for transmission.
pub const RESP_CODE_SENT: u8 = 6;
pub const RESP_CODE_CONTACT_MSG_RECV: u8 = 7;
pub const RESP_CODE_CHANNEL_MSG_RECV: u8 = 8;
/// The receive queue is empty.
pub const RESP_CODE_NO_MORE_MESSAGES: u8 = 10;
pub const RESP_CODE_DISABLED: u8 = 15;
/// Same as the legacy receive codes with an SNR byte and two reserved bytes.
pub const RESP_CODE_CONTACT_MSG_RECV_V3: u8 = 16;
pub const RESP_CODE_CHANNEL_MSG_RECV_V3: u8 = 17;

// ============================================================================
// Pushes (radio → host, unsolicited, always >= 0x80)
// ============================================================================

pub const PUSH_CODE_SEND_CONFIRMED: u8 = 0x82;
/// Something arrived; drain with `CMD_SYNC_NEXT_MESSAGE`.
pub const PUSH_CODE_MSG_WAITING: u8 = 0x83;

// ============================================================================
// Firmware error codes
// ============================================================================

pub const ERR_CODE_UNSUPPORTED_CMD: u8 = 1;
pub const ERR_CODE_NOT_FOUND: u8 = 2;
pub const ERR_CODE_TABLE_FULL: u8 = 3;
pub const ERR_CODE_BAD_STATE: u8 = 4;
pub const ERR_CODE_FILE_IO_ERROR: u8 = 5;
pub const ERR_CODE_ILLEGAL_ARG: u8 = 6;

// ============================================================================
// Text types
// ============================================================================

pub const TXT_TYPE_PLAIN: u8 = 0;
pub const TXT_TYPE_CLI_DATA: u8 = 1;
/// Plain text preceded by a 4-byte signer prefix.
pub const TXT_TYPE_SIGNED_PLAIN: u8 = 2;

// ============================================================================
// Limits
// ============================================================================

pub const PUB_KEY_SIZE: usize = 32;
pub const PUB_KEY_PREFIX_SIZE: usize = 6;
/// Largest frame body either side may send.
pub const MAX_FRAME_SIZE: usize = 256;
/// Longest text the firmware accepts in one message.
pub const MAX_TEXT_LEN: usize = 160;
pub const PATH_LEN_FLOOD: u8 = 0xFF;
