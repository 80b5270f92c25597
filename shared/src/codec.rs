//! Length-prefixed string framing used on every connection
//!
//! Each frame is a 2-byte big-endian length followed by that many bytes of
//! "modified UTF-8": the encoding used by `DataOutputStream::writeUTF` style
//! peers. It differs from standard UTF-8 in two places:
//! - U+0000 is written as the two bytes `C0 80`, so a payload never holds a NUL
//! - characters outside the BMP are written as a UTF-16 surrogate pair, each
//!   half as its own 3-byte sequence
//!
//! Malformed sequences and unpaired surrogates decode to U+FFFD. The length
//! prefix has already been honoured at that point, so one bad frame never
//! desynchronises the stream.
//!
//! The codec plugs into `FramedRead`/`FramedWrite`, so a reader with a partial
//! frame simply waits for more bytes instead of polling.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX: usize = 2;

/// Largest encoded payload a single frame can carry
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("encoded string is {0} bytes, frame limit is 65535")]
    FrameTooLong(usize),
}

/// Tokio codec for length-prefixed modified UTF-8 strings
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Codec;

impl Utf8Codec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for Utf8Codec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, CodecError> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let len = u16::from_be_bytes([src[0], src[1]]) as usize;
        let frame_len = LENGTH_PREFIX + len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        let payload = src.split_to(len);
        Ok(Some(decode_modified_utf8(&payload)))
    }
}

impl Encoder<String> for Utf8Codec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), CodecError> {
        let payload = encode_modified_utf8(&item);
        if payload.len() > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLong(payload.len()));
        }

        dst.reserve(LENGTH_PREFIX + payload.len());
        dst.put_u16(payload.len() as u16);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

/// Encodes a string as modified UTF-8 without the length prefix
pub fn encode_modified_utf8(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());

    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }

    out
}

/// Decodes a modified UTF-8 payload (no length prefix) back into a string
///
/// Anything that is not a well-formed sequence becomes U+FFFD, one per
/// offending byte, and unpaired surrogates likewise.
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let decoded = if b & 0x80 == 0 {
            Some((b as u16, 1))
        } else if b & 0xE0 == 0xC0 {
            continuation(bytes, i + 1).map(|b2| (((b as u16 & 0x1F) << 6) | b2, 2))
        } else if b & 0xF0 == 0xE0 {
            continuation(bytes, i + 1)
                .zip(continuation(bytes, i + 2))
                .map(|(b2, b3)| (((b as u16 & 0x0F) << 12) | (b2 << 6) | b3, 3))
        } else {
            None
        };

        match decoded {
            Some((unit, width)) => {
                units.push(unit);
                i += width;
            }
            None => {
                units.push(REPLACEMENT);
                i += 1;
            }
        }
    }

    String::from_utf16_lossy(&units)
}

const REPLACEMENT: u16 = 0xFFFD;

fn continuation(bytes: &[u8], index: usize) -> Option<u16> {
    match bytes.get(index) {
        Some(&b) if b & 0xC0 == 0x80 => Some((b & 0x3F) as u16),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    fn frame(text: &str) -> BytesMut {
        let mut buf = BytesMut::new();
        Utf8Codec.encode(text.to_string(), &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_ascii_frame_layout() {
        let buf = frame("r");
        assert_eq!(&buf[..], &[0x00, 0x01, b'r']);
    }

    #[test]
    fn test_nul_is_two_bytes() {
        assert_eq!(encode_modified_utf8("\0"), vec![0xC0, 0x80]);
        assert_eq!(decode_modified_utf8(&[0xC0, 0x80]), "\0");
    }

    #[test]
    fn test_supplementary_char_uses_surrogate_pair() {
        // U+1F3B2 GAME DIE -> D83C DFB2 -> two 3-byte sequences
        let encoded = encode_modified_utf8("\u{1F3B2}");
        assert_eq!(encoded, vec![0xED, 0xA0, 0xBC, 0xED, 0xBE, 0xB2]);
        assert_eq!(decode_modified_utf8(&encoded), "\u{1F3B2}");
    }

    #[test]
    fn test_two_byte_sequence() {
        let encoded = encode_modified_utf8("é");
        assert_eq!(encoded, vec![0xC3, 0xA9]);
    }

    #[test]
    fn test_partial_frame_waits_for_more_data() {
        let full = frame("Type 'r' to roll.");
        let mut partial = BytesMut::from(&full[..5]);

        assert!(Utf8Codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&full[5..]);
        let decoded = Utf8Codec.decode(&mut partial).unwrap();
        assert_eq!(decoded.as_deref(), Some("Type 'r' to roll."));
        assert!(partial.is_empty());
    }

    #[test]
    fn test_lone_prefix_byte_waits() {
        let mut buf = BytesMut::from(&[0x00][..]);
        assert!(Utf8Codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_empty_string_frame() {
        let mut buf = frame("");
        assert_eq!(&buf[..], &[0x00, 0x00]);
        assert_eq!(Utf8Codec.decode(&mut buf).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_oversized_string_rejected() {
        let text = "x".repeat(MAX_FRAME_LEN + 1);
        let mut buf = BytesMut::new();
        let err = Utf8Codec.encode(text, &mut buf).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLong(len) if len == MAX_FRAME_LEN + 1));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_malformed_bytes_become_replacement_chars() {
        assert_eq!(decode_modified_utf8(&[0xE2, 0x82]), "\u{FFFD}\u{FFFD}");
        // 4-byte UTF-8 is not modified UTF-8
        assert_eq!(
            decode_modified_utf8(&[0xF0, 0x9F, 0x8E, 0xB2]),
            "\u{FFFD}".repeat(4)
        );
        assert_eq!(decode_modified_utf8(&[b'h', 0xFF, b'i']), "h\u{FFFD}i");
    }

    #[test]
    fn test_unpaired_surrogate_becomes_replacement_char() {
        assert_eq!(decode_modified_utf8(&[0xED, 0xA0, 0xBC]), "\u{FFFD}");
        assert_eq!(
            decode_modified_utf8(&[b'a', 0xED, 0xBE, 0xB2, b'b']),
            "a\u{FFFD}b"
        );
    }

    #[tokio::test]
    async fn test_bad_frame_keeps_stream_in_sync() {
        let mut bytes = BytesMut::from(&[0x00, 0x03, 0xED, 0xA0, 0xBC][..]);
        bytes.extend_from_slice(&frame("r"));
        let data = bytes.to_vec();

        let mut reader = FramedRead::new(&data[..], Utf8Codec::new());
        assert_eq!(reader.next().await.unwrap().unwrap(), "\u{FFFD}");
        assert_eq!(reader.next().await.unwrap().unwrap(), "r");
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_framed_read_splits_consecutive_frames() {
        let mut bytes = frame("You are Player_0");
        bytes.extend_from_slice(&frame("NOT YOUR TURN!"));
        let data = bytes.to_vec();

        let mut reader = FramedRead::new(&data[..], Utf8Codec::new());
        assert_eq!(reader.next().await.unwrap().unwrap(), "You are Player_0");
        assert_eq!(reader.next().await.unwrap().unwrap(), "NOT YOUR TURN!");
        assert!(reader.next().await.is_none());
    }
}
