//! MRD stream framing
//!
//! Every frame starts with a 2-byte message id (little-endian) followed by
//! a payload whose layout depends on the id:
//!
//! | Frame       | id   | Payload                                     |
//! |-------------|------|---------------------------------------------|
//! | Header      | 3    | u32 length + XML document                   |
//! | Close       | 4    | none                                        |
//! | Acquisition | 1008 | acquisition header + trajectory + samples   |
//! | Image       | 1022 | image header + attributes + pixel data      |

use crate::error::{MrdError, Result};
use bytes::BufMut;

/// Size of the message id prefix in bytes
pub const MESSAGE_ID_SIZE: usize = 2;

/// Size of the XML header length prefix in bytes
pub const HEADER_LENGTH_SIZE: usize = 4;

/// Frame identifiers of the MRD streaming protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageId {
    Header = 3,
    Close = 4,
    Acquisition = 1008,
    Image = 1022,
}

impl MessageId {
    /// Create from the raw wire value
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            3 => Some(MessageId::Header),
            4 => Some(MessageId::Close),
            1008 => Some(MessageId::Acquisition),
            1022 => Some(MessageId::Image),
            _ => None,
        }
    }

    /// Raw wire value
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Little-endian encoding of the id
    pub fn to_bytes(self) -> [u8; MESSAGE_ID_SIZE] {
        self.as_u16().to_le_bytes()
    }
}

/// Result of reading one frame from the stream
///
/// A Close frame or the end of input at a frame boundary are ordinary
/// terminal outcomes, distinct from decode errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    /// A frame of the expected kind was decoded
    Message(T),
    /// The peer sent a Close frame
    Closed,
    /// The input ended cleanly between frames
    EndOfStream,
}

impl<T> ReadOutcome<T> {
    /// Return the decoded message, if any
    pub fn into_message(self) -> Option<T> {
        match self {
            ReadOutcome::Message(msg) => Some(msg),
            ReadOutcome::Closed | ReadOutcome::EndOfStream => None,
        }
    }

    /// True for [`ReadOutcome::Closed`] and [`ReadOutcome::EndOfStream`]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReadOutcome::Message(_))
    }

    /// The terminal outcome re-typed for a different message, or `None`
    /// when a message was decoded
    pub fn terminal<U>(&self) -> Option<ReadOutcome<U>> {
        match self {
            ReadOutcome::Message(_) => None,
            ReadOutcome::Closed => Some(ReadOutcome::Closed),
            ReadOutcome::EndOfStream => Some(ReadOutcome::EndOfStream),
        }
    }

    /// Map the contained message
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadOutcome<U> {
        match self {
            ReadOutcome::Message(msg) => ReadOutcome::Message(f(msg)),
            ReadOutcome::Closed => ReadOutcome::Closed,
            ReadOutcome::EndOfStream => ReadOutcome::EndOfStream,
        }
    }
}

/// Check a received id against the one the state machine expects
///
/// Close always wins over a mismatch, so a peer may end the stream at any
/// frame boundary.
pub fn expect_id(got: u16, expected: MessageId) -> Result<ReadOutcome<()>> {
    if got == MessageId::Close.as_u16() {
        return Ok(ReadOutcome::Closed);
    }
    if got != expected.as_u16() {
        return Err(MrdError::ProtocolMismatch {
            got,
            expected: expected.as_u16(),
        });
    }
    Ok(ReadOutcome::Message(()))
}

/// Validate an XML header length prefix
pub fn check_header_length(length: u32, max: usize) -> Result<usize> {
    let length = length as usize;
    if length == 0 {
        return Err(MrdError::InvalidHeader(
            "Expected header size > 0, got 0".to_string(),
        ));
    }
    if length > max {
        return Err(MrdError::BodyTooLarge { size: length, max });
    }
    Ok(length)
}

/// Validate a payload size derived from a frame header
pub fn check_frame_length(length: usize, max: usize) -> Result<usize> {
    if length > max {
        return Err(MrdError::BodyTooLarge { size: length, max });
    }
    Ok(length)
}

/// Encode a complete Header frame (id, length, XML)
pub fn encode_header_frame(xml: &[u8]) -> Result<Vec<u8>> {
    let length = u32::try_from(xml.len()).map_err(|_| MrdError::BodyTooLarge {
        size: xml.len(),
        max: u32::MAX as usize,
    })?;
    let mut buf = Vec::with_capacity(MESSAGE_ID_SIZE + HEADER_LENGTH_SIZE + xml.len());
    buf.put_u16_le(MessageId::Header.as_u16());
    buf.put_u32_le(length);
    buf.put_slice(xml);
    Ok(buf)
}

/// Encode a Close frame
pub fn encode_close_frame() -> [u8; MESSAGE_ID_SIZE] {
    MessageId::Close.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_values() {
        assert_eq!(MessageId::Header.as_u16(), 3);
        assert_eq!(MessageId::Close.as_u16(), 4);
        assert_eq!(MessageId::Acquisition.as_u16(), 1008);
        assert_eq!(MessageId::Image.as_u16(), 1022);
    }

    #[test]
    fn test_message_id_from_u16() {
        assert_eq!(MessageId::from_u16(1008), Some(MessageId::Acquisition));
        assert_eq!(MessageId::from_u16(1022), Some(MessageId::Image));
        assert_eq!(MessageId::from_u16(5), None);
    }

    #[test]
    fn test_little_endian_id() {
        // 1008 = 0x03F0
        assert_eq!(MessageId::Acquisition.to_bytes(), [0xF0, 0x03]);
        assert_eq!(encode_close_frame(), [0x04, 0x00]);
    }

    #[test]
    fn test_expect_id_match() {
        let outcome = expect_id(1008, MessageId::Acquisition).unwrap();
        assert_eq!(outcome, ReadOutcome::Message(()));
    }

    #[test]
    fn test_expect_id_close() {
        let outcome = expect_id(4, MessageId::Acquisition).unwrap();
        assert_eq!(outcome, ReadOutcome::Closed);
        assert!(outcome.is_terminal());
    }

    #[test]
    fn test_expect_id_mismatch() {
        let result = expect_id(1022, MessageId::Acquisition);
        assert!(matches!(
            result,
            Err(MrdError::ProtocolMismatch {
                got: 1022,
                expected: 1008
            })
        ));
    }

    #[test]
    fn test_header_length_checks() {
        assert_eq!(check_header_length(10, 100).unwrap(), 10);
        assert!(matches!(
            check_header_length(0, 100),
            Err(MrdError::InvalidHeader(_))
        ));
        assert!(matches!(
            check_header_length(101, 100),
            Err(MrdError::BodyTooLarge { size: 101, max: 100 })
        ));
    }

    #[test]
    fn test_encode_header_frame_layout() {
        let frame = encode_header_frame(b"<a/>").unwrap();
        assert_eq!(&frame[..2], &[0x03, 0x00]);
        assert_eq!(&frame[2..6], &[4, 0, 0, 0]);
        assert_eq!(&frame[6..], b"<a/>");
    }

    #[test]
    fn test_outcome_map() {
        let outcome = ReadOutcome::Message(2).map(|v| v * 3);
        assert_eq!(outcome.into_message(), Some(6));
        let closed: ReadOutcome<i32> = ReadOutcome::Closed;
        assert_eq!(closed.map(|v| v + 1), ReadOutcome::Closed);
    }

    #[test]
    fn test_outcome_terminal() {
        assert_eq!(ReadOutcome::Message(()).terminal::<u8>(), None);
        assert_eq!(
            ReadOutcome::<()>::EndOfStream.terminal::<u8>(),
            Some(ReadOutcome::EndOfStream)
        );
    }
}
