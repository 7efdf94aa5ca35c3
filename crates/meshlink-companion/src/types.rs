//! Values carried inside responses.

use crate::constants::*;

/// A node's 32-byte identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKey(pub [u8; PUB_KEY_SIZE]);

impl PublicKey {
    /// `None` unless `slice` is exactly [`PUB_KEY_SIZE`] bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        slice.try_into().ok().map(PublicKey)
    }

    /// Leading bytes used to address contacts on the wire.
    pub fn prefix(&self) -> PublicKeyPrefix {
        let mut prefix = [0u8; PUB_KEY_PREFIX_SIZE];
        prefix.copy_from_slice(&self.0[..PUB_KEY_PREFIX_SIZE]);
        PublicKeyPrefix(prefix)
    }
}

/// The first [`PUB_KEY_PREFIX_SIZE`] bytes of a [`PublicKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKeyPrefix(pub [u8; PUB_KEY_PREFIX_SIZE]);

impl PublicKeyPrefix {
    /// Take the prefix from the start of `slice`.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        slice
            .get(..PUB_KEY_PREFIX_SIZE)?
            .try_into()
            .ok()
            .map(PublicKeyPrefix)
    }

    /// Lowercase hex, as shown in radio logs.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// What the radio reports about itself after `CMD_APP_START`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfInfo {
    pub advert_type: u8,
    pub tx_power_dbm: u8,
    pub max_tx_power_dbm: u8,
    pub public_key: PublicKey,
    pub freq_khz: u32,
    pub bandwidth_hz: u32,
    pub spreading_factor: u8,
    pub coding_rate: u8,
    pub node_name: String,
}

/// Payload kind of a text message.
///
/// Only [`TextType::Plain`] carries application text; the others are radio
/// management traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextType {
    Plain,
    CliData,
    SignedPlain,
    Unknown(u8),
}

impl From<u8> for TextType {
    fn from(raw: u8) -> Self {
        match raw {
            TXT_TYPE_PLAIN => TextType::Plain,
            TXT_TYPE_CLI_DATA => TextType::CliData,
            TXT_TYPE_SIGNED_PLAIN => TextType::SignedPlain,
            other => TextType::Unknown(other),
        }
    }
}

impl From<TextType> for u8 {
    fn from(text_type: TextType) -> Self {
        match text_type {
            TextType::Plain => TXT_TYPE_PLAIN,
            TextType::CliData => TXT_TYPE_CLI_DATA,
            TextType::SignedPlain => TXT_TYPE_SIGNED_PLAIN,
            TextType::Unknown(raw) => raw,
        }
    }
}

/// A direct message pulled with `CMD_SYNC_NEXT_MESSAGE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedContactMessage {
    pub sender_prefix: PublicKeyPrefix,
    /// Hops travelled, or [`PATH_LEN_FLOOD`].
    pub path_len: u8,
    pub text_type: TextType,
    /// Sender clock, unix seconds.
    pub timestamp: u32,
    /// SNR in quarter dB; v3 frames only.
    pub snr_x4: Option<i8>,
    pub text: String,
}

/// A channel message pulled with `CMD_SYNC_NEXT_MESSAGE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedChannelMessage {
    pub channel_idx: u8,
    /// Hops travelled, or [`PATH_LEN_FLOOD`].
    pub path_len: u8,
    pub text_type: TextType,
    /// Sender clock, unix seconds.
    pub timestamp: u32,
    /// SNR in quarter dB; v3 frames only.
    pub snr_x4: Option<i8>,
    pub text: String,
}

fn snr_db(snr_x4: Option<i8>) -> Option<f32> {
    snr_x4.map(|quarter_db| f32::from(quarter_db) / 4.0)
}

impl ReceivedContactMessage {
    /// SNR in dB.
    pub fn snr(&self) -> Option<f32> {
        snr_db(self.snr_x4)
    }
}

impl ReceivedChannelMessage {
    /// SNR in dB.
    pub fn snr(&self) -> Option<f32> {
        snr_db(self.snr_x4)
    }
}
