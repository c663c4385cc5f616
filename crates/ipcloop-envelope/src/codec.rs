use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{EnvelopeError, Result};
use crate::types::{is_reply, is_request, reply_type_for, WATCHDOG};

/// Width of the NUL-padded source name field.
pub const SOURCE_FIELD_SIZE: usize = 64;

/// Width of the content field.
pub const CONTENT_FIELD_SIZE: usize = 256;

/// Longest source name that fits the field with its terminating NUL.
pub const MAX_SOURCE_LEN: usize = SOURCE_FIELD_SIZE - 1;

/// Largest content payload.
pub const MAX_CONTENT_LEN: usize = CONTENT_FIELD_SIZE - 1;

/// Wire size of a request envelope.
pub const ENVELOPE_SIZE: usize = 4 + 4 + 2 + 2 + SOURCE_FIELD_SIZE + CONTENT_FIELD_SIZE;

/// Wire size of a reply.
pub const REPLY_SIZE: usize = 4 + 4 + 4 + 2 + 2 + CONTENT_FIELD_SIZE;

/// A request message.
///
/// Wire format (little-endian, 332 bytes):
/// ```text
/// ┌──────────┬─────────────┬─────────────┬──────────┬─────────────┬──────────────┐
/// │ type     │ correlation │ content_len │ reserved │ source      │ content      │
/// │ (4B i32) │ (4B u32)    │ (2B u16)    │ (2B)     │ (64B, NUL)  │ (256B)       │
/// └──────────┴─────────────┴─────────────┴──────────┴─────────────┴──────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Request type tag (below `REPLY_BASE`).
    pub msg_type: i32,
    /// Nonzero when the sender is waiting for a reply.
    pub correlation: u32,
    /// Channel name the reply should be sent to.
    pub source: String,
    /// Opaque payload, at most [`MAX_CONTENT_LEN`] bytes.
    pub content: Bytes,
}

impl Envelope {
    /// Create a request with no source and no correlation.
    pub fn new(msg_type: i32, content: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            correlation: 0,
            source: String::new(),
            content: content.into(),
        }
    }

    /// A watchdog heartbeat.
    pub fn watchdog() -> Self {
        Self::new(WATCHDOG, Bytes::new())
    }

    /// True when the sender registered a waiter for this request.
    pub fn expects_reply(&self) -> bool {
        self.correlation != 0
    }

    /// Content as UTF-8 text, if it is valid UTF-8.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Encode into the fixed wire layout.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        check_request_type(self.msg_type)?;
        check_content(&self.content)?;
        if self.source.len() > MAX_SOURCE_LEN {
            return Err(EnvelopeError::SourceTooLong {
                len: self.source.len(),
                max: MAX_SOURCE_LEN,
            });
        }

        dst.reserve(ENVELOPE_SIZE);
        dst.put_i32_le(self.msg_type);
        dst.put_u32_le(self.correlation);
        dst.put_u16_le(self.content.len() as u16);
        dst.put_u16_le(0);
        put_padded(dst, self.source.as_bytes(), SOURCE_FIELD_SIZE);
        put_padded(dst, &self.content, CONTENT_FIELD_SIZE);
        Ok(())
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(ENVELOPE_SIZE);
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode from the fixed wire layout. Trailing bytes are ignored.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        check_len(src, ENVELOPE_SIZE)?;

        let msg_type = src.get_i32_le();
        check_request_type(msg_type)?;
        let correlation = src.get_u32_le();
        let content_len = src.get_u16_le() as usize;
        src.advance(2);

        let source_field = &src[..SOURCE_FIELD_SIZE];
        let source_len = source_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SOURCE_FIELD_SIZE);
        if source_len > MAX_SOURCE_LEN {
            return Err(EnvelopeError::SourceTooLong {
                len: source_len,
                max: MAX_SOURCE_LEN,
            });
        }
        let source = std::str::from_utf8(&source_field[..source_len])
            .map_err(|_| EnvelopeError::InvalidSource)?
            .to_string();
        src.advance(SOURCE_FIELD_SIZE);

        let content = take_content(src, content_len)?;

        Ok(Self {
            msg_type,
            correlation,
            source,
            content,
        })
    }
}

/// A reply to a request.
///
/// Wire format (little-endian, 272 bytes):
/// ```text
/// ┌──────────┬─────────────┬──────────┬─────────────┬──────────┬──────────────┐
/// │ type     │ correlation │ result   │ content_len │ reserved │ content      │
/// │ (4B i32) │ (4B u32)    │ (4B i32) │ (2B u16)    │ (2B)     │ (256B)       │
/// └──────────┴─────────────┴──────────┴─────────────┴──────────┴──────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// `request type + REPLY_BASE`; filled in when the reply is sent.
    pub msg_type: i32,
    /// Correlation id copied from the request.
    pub correlation: u32,
    /// Application-defined result code.
    pub result: i32,
    /// Opaque payload, at most [`MAX_CONTENT_LEN`] bytes.
    pub content: Bytes,
}

impl Reply {
    /// Create a reply body. Type and correlation are stamped by the sender.
    pub fn new(result: i32, content: impl Into<Bytes>) -> Self {
        Self {
            msg_type: 0,
            correlation: 0,
            result,
            content: content.into(),
        }
    }

    /// Address this reply to `request`.
    pub fn answer(mut self, request: &Envelope) -> Self {
        self.msg_type = reply_type_for(request.msg_type);
        self.correlation = request.correlation;
        self
    }

    /// Content as UTF-8 text, if it is valid UTF-8.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Encode into the fixed wire layout.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        check_content(&self.content)?;

        dst.reserve(REPLY_SIZE);
        dst.put_i32_le(self.msg_type);
        dst.put_u32_le(self.correlation);
        dst.put_i32_le(self.result);
        dst.put_u16_le(self.content.len() as u16);
        dst.put_u16_le(0);
        put_padded(dst, &self.content, CONTENT_FIELD_SIZE);
        Ok(())
    }

    /// Encode into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(REPLY_SIZE);
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode from the fixed wire layout. Trailing bytes are ignored.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        check_len(src, REPLY_SIZE)?;

        let msg_type = src.get_i32_le();
        let correlation = src.get_u32_le();
        let result = src.get_i32_le();
        let content_len = src.get_u16_le() as usize;
        src.advance(2);
        let content = take_content(src, content_len)?;

        Ok(Self {
            msg_type,
            correlation,
            result,
            content,
        })
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Envelope),
    Reply(Reply),
}

/// Read the leading type tag without decoding the rest.
pub fn peek_type(src: &[u8]) -> Result<i32> {
    check_len(src, 4)?;
    Ok(i32::from_le_bytes([src[0], src[1], src[2], src[3]]))
}

/// Decode an inbound message, classifying it by its type tag.
fn check_request_type(msg_type: i32) -> Result<()> {
    if is_request(msg_type) {
        Ok(())
    } else if is_reply(msg_type) {
        Err(EnvelopeError::ReplyTypeAsRequest(msg_type))
    } else {
        Err(EnvelopeError::InvalidType(msg_type))
    }
}

pub fn decode_message(src: &[u8]) -> Result<Message> {
    if is_reply(peek_type(src)?) {
        Reply::decode(src).map(Message::Reply)
    } else {
        Envelope::decode(src).map(Message::Request)
    }
}

fn check_len(src: &[u8], expected: usize) -> Result<()> {
    if src.len() < expected {
        return Err(EnvelopeError::Truncated {
            expected,
            actual: src.len(),
        });
    }
    Ok(())
}

fn check_content(content: &[u8]) -> Result<()> {
    if content.len() > MAX_CONTENT_LEN {
        return Err(EnvelopeError::ContentTooLarge {
            size: content.len(),
            max: MAX_CONTENT_LEN,
        });
    }
    Ok(())
}

fn take_content(src: &[u8], len: usize) -> Result<Bytes> {
    if len > MAX_CONTENT_LEN {
        return Err(EnvelopeError::ContentTooLarge {
            size: len,
            max: MAX_CONTENT_LEN,
        });
    }
    Ok(Bytes::copy_from_slice(&src[..len]))
}

fn put_padded(dst: &mut BytesMut, data: &[u8], width: usize) {
    dst.put_slice(data);
    dst.put_bytes(0, width - data.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::REPLY_BASE;

    #[test]
    fn fixed_sizes() {
        assert_eq!(ENVELOPE_SIZE, 332);
        assert_eq!(REPLY_SIZE, 272);

        let env = Envelope::new(1, &b""[..]).to_bytes().unwrap();
        assert_eq!(env.len(), ENVELOPE_SIZE);
        let reply = Reply::new(0, &b""[..]).to_bytes().unwrap();
        assert_eq!(reply.len(), REPLY_SIZE);
    }

    #[test]
    fn envelope_field_layout() {
        let mut env = Envelope::new(5, &b"ping"[..]);
        env.correlation = 0x0102_0304;
        env.source = "bob".to_string();
        let wire = env.to_bytes().unwrap();

        assert_eq!(&wire[0..4], &5i32.to_le_bytes());
        assert_eq!(&wire[4..8], &0x0102_0304u32.to_le_bytes());
        assert_eq!(&wire[8..10], &4u16.to_le_bytes());
        assert_eq!(&wire[12..15], b"bob");
        assert!(wire[15..76].iter().all(|&b| b == 0));
        assert_eq!(&wire[76..80], b"ping");
        assert!(wire[80..].iter().all(|&b| b == 0));

        let decoded = Envelope::decode(&wire).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(decoded.content_str(), Some("ping"));
        assert!(decoded.expects_reply());
    }

    #[test]
    fn reply_answers_request() {
        let mut req = Envelope::new(5, &b"ping"[..]);
        req.correlation = 7;
        let reply = Reply::new(0, &b"pong"[..]).answer(&req);
        assert_eq!(reply.msg_type, 5 + REPLY_BASE);
        assert_eq!(reply.correlation, 7);

        let wire = reply.to_bytes().unwrap();
        assert_eq!(&wire[8..12], &0i32.to_le_bytes());
        match decode_message(&wire).unwrap() {
            Message::Reply(r) => {
                assert_eq!(r.msg_type, 10005);
                assert_eq!(r.content_str(), Some("pong"));
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn decode_message_routes_requests() {
        let wire = Envelope::watchdog().to_bytes().unwrap();
        match decode_message(&wire).unwrap() {
            Message::Request(env) => {
                assert_eq!(env.msg_type, WATCHDOG);
                assert!(!env.expects_reply());
                assert!(env.source.is_empty());
                assert!(env.content.is_empty());
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn rejects_reply_type_as_request() {
        let env = Envelope::new(REPLY_BASE + 1, &b""[..]);
        assert_eq!(
            env.to_bytes().unwrap_err(),
            EnvelopeError::ReplyTypeAsRequest(10001)
        );
    }

    #[test]
    fn rejects_negative_type_both_ways() {
        assert_eq!(
            Envelope::new(-1, &b""[..]).to_bytes().unwrap_err(),
            EnvelopeError::InvalidType(-1)
        );

        let mut wire = BytesMut::from(&Envelope::new(1, &b"x"[..]).to_bytes().unwrap()[..]);
        wire[0..4].copy_from_slice(&(-7i32).to_le_bytes());
        assert_eq!(decode_message(&wire).unwrap_err(), EnvelopeError::InvalidType(-7));
    }

    #[test]
    fn rejects_oversized_content() {
        let env = Envelope::new(1, vec![0u8; MAX_CONTENT_LEN + 1]);
        assert!(matches!(
            env.to_bytes(),
            Err(EnvelopeError::ContentTooLarge { size: 256, max: 255 })
        ));
        assert!(Envelope::new(1, vec![0u8; MAX_CONTENT_LEN])
            .to_bytes()
            .is_ok());
    }

    #[test]
    fn rejects_oversized_source() {
        let mut env = Envelope::new(1, &b""[..]);
        env.source = "s".repeat(MAX_SOURCE_LEN + 1);
        assert!(matches!(
            env.to_bytes(),
            Err(EnvelopeError::SourceTooLong { len: 64, max: 63 })
        ));
    }

    #[test]
    fn truncated_input() {
        let wire = Envelope::new(1, &b"x"[..]).to_bytes().unwrap();
        let err = decode_message(&wire[..ENVELOPE_SIZE - 1]).unwrap_err();
        assert_eq!(
            err,
            EnvelopeError::Truncated {
                expected: ENVELOPE_SIZE,
                actual: ENVELOPE_SIZE - 1
            }
        );
        assert!(matches!(
            peek_type(&[1, 2]),
            Err(EnvelopeError::Truncated { expected: 4, .. })
        ));
    }

    #[test]
    fn corrupt_length_and_source_rejected() {
        let mut wire = BytesMut::from(&Envelope::new(1, &b"x"[..]).to_bytes().unwrap()[..]);
        wire[8..10].copy_from_slice(&300u16.to_le_bytes());
        assert!(matches!(
            Envelope::decode(&wire),
            Err(EnvelopeError::ContentTooLarge { size: 300, .. })
        ));

        let mut wire = BytesMut::from(&Envelope::new(1, &b""[..]).to_bytes().unwrap()[..]);
        wire[12] = 0xFF;
        assert_eq!(Envelope::decode(&wire), Err(EnvelopeError::InvalidSource));

        let mut wire = BytesMut::from(&Envelope::new(1, &b""[..]).to_bytes().unwrap()[..]);
        wire[12..76].fill(b'a');
        assert!(matches!(
            Envelope::decode(&wire),
            Err(EnvelopeError::SourceTooLong { len: 64, .. })
        ));
    }
}
