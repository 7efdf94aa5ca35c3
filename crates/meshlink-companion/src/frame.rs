//! Frame encoding/decoding utilities.
//!
//! Each frame starts with a direction byte, followed by a 2-byte length
//! (little-endian) and the frame data.
//!
//! ```text
//! +--------+--------+--------+-------------------+
//! | '<'/'>'| len_lo | len_hi | data[0..len]      |
//! +--------+--------+--------+-------------------+
//! ```
//!
//! Host→radio frames use `'<'`, radio→host frames use `'>'`.

use bytes::{Buf, BufMut, BytesMut};

use crate::constants::MAX_FRAME_SIZE;

/// Maximum number of bytes buffered while waiting for a complete frame.
pub const MAX_FRAMED_SIZE: usize = 1024;

/// Header byte of frames sent by the host.
pub const HOST_FRAME_HEADER: u8 = b'<';
/// Header byte of frames sent by the radio.
pub const RADIO_FRAME_HEADER: u8 = b'>';

/// A codec for reading and writing framed messages.
///
/// A codec created with [`FrameCodec::new`] sits on the host side and decodes
/// radio frames. [`FrameCodec::radio`] creates the opposite end, which is what a
/// simulated radio needs.
#[derive(Debug)]
pub struct FrameCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Header byte expected on incoming frames.
    inbound_header: u8,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Create a host-side codec (decodes radio→host frames).
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(MAX_FRAMED_SIZE),
            inbound_header: RADIO_FRAME_HEADER,
        }
    }

    /// Create a radio-side codec (decodes host→radio frames).
    pub fn radio() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(MAX_FRAMED_SIZE),
            inbound_header: HOST_FRAME_HEADER,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_FRAMED_SIZE {
            log::warn!(
                "companion frame buffer overflow ({} bytes), discarding",
                self.buffer.len()
            );
            self.buffer.clear();
        }
    }

    /// Try to decode a complete frame from the buffer.
    ///
    /// Returns `Some(frame_data)` if a complete frame is available,
    /// or `None` if more data is needed.
    pub fn decode(&mut self) -> Option<Vec<u8>> {
        loop {
            // Scan for the header byte, discarding any preceding garbage
            while !self.buffer.is_empty() && self.buffer[0] != self.inbound_header {
                self.buffer.advance(1);
            }

            // Need at least 3 bytes: header + 2 bytes length
            if self.buffer.len() < 3 {
                return None;
            }

            let len = u16::from_le_bytes([self.buffer[1], self.buffer[2]]) as usize;

            // A length beyond the protocol maximum means we locked onto a stray
            // header byte; skip it and resync.
            if len > MAX_FRAME_SIZE {
                log::debug!("skipping bogus frame header (len={})", len);
                self.buffer.advance(1);
                continue;
            }

            if self.buffer.len() < 3 + len {
                return None;
            }

            self.buffer.advance(3);
            return Some(self.buffer.split_to(len).to_vec());
        }
    }

    /// Encode a frame for host→radio transmission.
    pub fn encode(data: &[u8]) -> Vec<u8> {
        encode_with_header(HOST_FRAME_HEADER, data)
    }

    /// Encode a frame for radio→host transmission.
    pub fn encode_reply(data: &[u8]) -> Vec<u8> {
        encode_with_header(RADIO_FRAME_HEADER, data)
    }
}

fn encode_with_header(header: u8, data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(3 + data.len());
    buf.push(header);
    buf.put_u16_le(data.len() as u16);
    buf.extend_from_slice(data);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_codec_encode_decode() {
        let mut codec = FrameCodec::new();

        let data = b"Hello, World!";
        let encoded = FrameCodec::encode(data);

        assert_eq!(encoded.len(), 3 + data.len());
        assert_eq!(encoded[0], b'<');
        assert_eq!(encoded[1], data.len() as u8);
        assert_eq!(encoded[2], 0);

        // A host codec ignores host frames and decodes radio frames
        codec.push(&encoded);
        assert!(codec.decode().is_none());

        codec.push(&FrameCodec::encode_reply(data));
        let decoded = codec.decode().expect("should decode frame");
        assert_eq!(&decoded, data);
    }

    #[test]
    fn test_radio_codec_decodes_host_frames() {
        let mut codec = FrameCodec::radio();
        codec.push(&FrameCodec::encode(&[10]));
        assert_eq!(codec.decode(), Some(vec![10]));
    }

    #[test]
    fn test_frame_codec_partial() {
        let mut codec = FrameCodec::new();

        let data = b"Test data";
        let encoded = FrameCodec::encode_reply(data);

        codec.push(&encoded[..4]);
        assert!(codec.decode().is_none());

        codec.push(&encoded[4..]);
        let decoded = codec.decode().expect("should decode frame");
        assert_eq!(&decoded, data);
    }

    #[test]
    fn test_frame_codec_multiple_with_garbage() {
        let mut codec = FrameCodec::new();

        codec.push(b"noise");
        codec.push(&FrameCodec::encode_reply(b"First"));
        codec.push(&FrameCodec::encode_reply(b"Second"));

        assert_eq!(codec.decode().as_deref(), Some(&b"First"[..]));
        assert_eq!(codec.decode().as_deref(), Some(&b"Second"[..]));
        assert!(codec.decode().is_none());
    }

    #[test]
    fn test_frame_codec_resyncs_after_bogus_length() {
        let mut codec = FrameCodec::new();

        // '>' followed by a length far beyond MAX_FRAME_SIZE
        codec.push(&[b'>', 0xFF, 0xFF]);
        codec.push(&FrameCodec::encode_reply(b"ok"));

        assert_eq!(codec.decode().as_deref(), Some(&b"ok"[..]));
    }
}
