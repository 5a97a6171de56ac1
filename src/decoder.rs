//! Incremental frame decoder.
//!
//! Frames arrive over a byte stream that gives no guarantee about where
//! chunk boundaries fall relative to frame boundaries: a single `read()`
//! might return half a header, three full frames, or a fragment spanning
//! the tail of one payload and the head of the next. [`FrameDecoder`] owns a
//! carry-over buffer so each call to [`FrameDecoder::decode`] can be fed
//! whatever bytes just arrived and pick up exactly where the last call left
//! off.

use crate::bytes_util::{apply_mask, read_u16_be, read_u64_be};
use crate::error::Error;
use crate::frame::{CloseCode, Frame, OpCode};
use crate::message::Message;
use bytes::{Buf, BytesMut};

/// One parsed and reassembled unit handed up to the connection layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    Message(Message),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { code: CloseCode, reason: String },
}

struct Accumulator {
    opcode: OpCode,
    payload: Vec<u8>,
}

enum ParseResult {
    NeedMore,
    Frame { consumed: usize, frame: Frame },
}

/// Parses a single frame out of `buf`, including a masked payload if
/// present. Server frames are never masked per RFC 6455, but this client
/// decodes the mask bit anyway so a misbehaving peer is rejected with a
/// protocol error rather than silently corrupting the payload.
fn parse_frame(buf: &[u8], max_frame_size: usize) -> Result<ParseResult, Error> {
    if buf.len() < 2 {
        return Ok(ParseResult::NeedMore);
    }

    let first = buf[0];
    let second = buf[1];

    let final_fragment = first & 0b1000_0000 != 0;
    let rsv = first & 0b0111_0000;
    if rsv != 0 {
        return Err(Error::RSVNotZero);
    }
    let opcode = OpCode::from(first & 0b0000_1111)?;

    if opcode.is_control() && !final_fragment {
        return Err(Error::ControlFramesFragmented);
    }

    let masked = second & 0b1000_0000 != 0;
    if masked {
        return Err(Error::MaskedFrameFromServer);
    }

    let len7 = (second & 0b0111_1111) as usize;
    if opcode.is_control() && len7 > 125 {
        return Err(Error::ControlFramePayloadSize);
    }

    let mut offset = 2usize;
    let payload_len: usize = if len7 == 126 {
        if buf.len() < offset + 2 {
            return Ok(ParseResult::NeedMore);
        }
        let len = read_u16_be(&buf[offset..]) as usize;
        offset += 2;
        len
    } else if len7 == 127 {
        if buf.len() < offset + 8 {
            return Ok(ParseResult::NeedMore);
        }
        let len = read_u64_be(&buf[offset..]) as usize;
        offset += 8;
        len as usize
    } else {
        len7
    };

    if payload_len > max_frame_size {
        return Err(Error::MaxFrameSize);
    }

    if buf.len() < offset + payload_len {
        return Ok(ParseResult::NeedMore);
    }

    let payload = buf[offset..offset + payload_len].to_vec();
    offset += payload_len;

    Ok(ParseResult::Frame {
        consumed: offset,
        frame: Frame::new(final_fragment, opcode, payload),
    })
}

/// A CLOSE frame's payload is an optional 2-byte big-endian code followed by
/// a UTF-8 reason string. An empty payload means no status was given.
fn parse_close_payload(payload: &[u8]) -> (CloseCode, String) {
    if payload.is_empty() {
        return (CloseCode::NoStatus, String::new());
    }
    if payload.len() < 2 {
        return (CloseCode::ProtocolError, String::new());
    }
    let code = CloseCode::from_received(read_u16_be(payload));
    match String::from_utf8(payload[2..].to_vec()) {
        Ok(reason) => (code, reason),
        Err(_) => (CloseCode::ProtocolError, String::new()),
    }
}

/// Owns the carry-over buffer and the in-progress fragmented-message
/// accumulator for one connection's inbound direction.
pub struct FrameDecoder {
    buffer: BytesMut,
    accumulator: Option<Accumulator>,
    max_frame_size: usize,
    max_message_size: usize,
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize, max_message_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            accumulator: None,
            max_frame_size,
            max_message_size,
        }
    }

    /// Feeds newly-read bytes into the decoder and returns every complete
    /// event that could be parsed out of the buffered data. Any trailing
    /// partial frame is retained for the next call.
    pub fn decode(&mut self, input: &[u8]) -> Result<Vec<DecodedEvent>, Error> {
        self.buffer.extend_from_slice(input);
        let mut events = Vec::new();

        loop {
            match parse_frame(&self.buffer, self.max_frame_size)? {
                ParseResult::NeedMore => break,
                ParseResult::Frame { consumed, frame } => {
                    self.buffer.advance(consumed);
                    if let Some(event) = self.handle_frame(frame)? {
                        events.push(event);
                    }
                }
            }
        }

        Ok(events)
    }

    fn handle_frame(&mut self, mut frame: Frame) -> Result<Option<DecodedEvent>, Error> {
        match frame.opcode {
            OpCode::Close => {
                let (code, reason) = parse_close_payload(&frame.payload);
                Ok(Some(DecodedEvent::Close { code, reason }))
            }
            OpCode::Ping => Ok(Some(DecodedEvent::Ping(frame.payload))),
            OpCode::Pong => Ok(Some(DecodedEvent::Pong(frame.payload))),
            OpCode::Continue => {
                let accumulator = self
                    .accumulator
                    .as_mut()
                    .ok_or(Error::InvalidContinuationFrame)?;
                accumulator.payload.append(&mut frame.payload);
                if accumulator.payload.len() > self.max_message_size {
                    return Err(Error::MaxMessageSize);
                }
                if frame.final_fragment {
                    let accumulator = self.accumulator.take().expect("checked above");
                    let message =
                        Message::from_frame(Frame::new(true, accumulator.opcode, accumulator.payload))?;
                    Ok(Some(DecodedEvent::Message(message)))
                } else {
                    Ok(None)
                }
            }
            OpCode::Text | OpCode::Binary => {
                if self.accumulator.is_some() {
                    return Err(Error::InvalidFrameFragmentation);
                }
                if frame.final_fragment {
                    Ok(Some(DecodedEvent::Message(Message::from_frame(frame)?)))
                } else {
                    self.accumulator = Some(Accumulator {
                        opcode: frame.opcode,
                        payload: frame.payload,
                    });
                    Ok(None)
                }
            }
        }
    }
}

/// Unmasks a payload in place. Exposed for the encoder side's symmetry with
/// [`apply_mask`]; this client never receives masked frames (servers must
/// not mask), but the helper lives here next to the frame-level parsing it
/// mirrors.
pub fn unmask(payload: &mut [u8], mask: [u8; 4]) {
    apply_mask(payload, mask);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unmasked_frame(fin: bool, opcode: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![(fin as u8) << 7 | opcode];
        assert!(payload.len() <= 125);
        out.push(payload.len() as u8);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn decodes_single_text_frame() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let bytes = unmasked_frame(true, 0x1, b"Hello");
        let events = decoder.decode(&bytes).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            DecodedEvent::Message(Message::Text("Hello".to_string()))
        );
    }

    #[test]
    fn reassembles_fragmented_message_across_continue_frames() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let mut bytes = unmasked_frame(false, 0x1, b"Hel");
        bytes.extend(unmasked_frame(true, 0x0, b"lo"));
        let events = decoder.decode(&bytes).unwrap();
        assert_eq!(
            events,
            vec![DecodedEvent::Message(Message::Text("Hello".to_string()))]
        );
    }

    #[test]
    fn split_header_across_two_chunks_is_buffered() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let bytes = unmasked_frame(true, 0x1, b"Hello");
        let (first, second) = bytes.split_at(1);
        assert!(decoder.decode(first).unwrap().is_empty());
        let events = decoder.decode(second).unwrap();
        assert_eq!(
            events,
            vec![DecodedEvent::Message(Message::Text("Hello".to_string()))]
        );
    }

    #[test]
    fn arbitrary_chunk_boundaries_still_decode() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let bytes = unmasked_frame(true, 0x2, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut events = Vec::new();
        for byte in &bytes {
            events.extend(decoder.decode(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(
            events,
            vec![DecodedEvent::Message(Message::Binary(vec![
                1, 2, 3, 4, 5, 6, 7, 8
            ]))]
        );
    }

    #[test]
    fn rsv_bit_set_is_a_protocol_error() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let mut bytes = unmasked_frame(true, 0x1, b"x");
        bytes[0] |= 0b0100_0000;
        assert!(matches!(decoder.decode(&bytes), Err(Error::RSVNotZero)));
    }

    #[test]
    fn masked_frame_from_server_is_rejected() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let mut bytes = unmasked_frame(true, 0x1, b"x");
        bytes[1] |= 0b1000_0000;
        assert!(matches!(
            decoder.decode(&bytes),
            Err(Error::MaskedFrameFromServer)
        ));
    }

    #[test]
    fn fragmented_control_frame_is_rejected() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let bytes = unmasked_frame(false, 0x9, b"ping");
        assert!(matches!(
            decoder.decode(&bytes),
            Err(Error::ControlFramesFragmented)
        ));
    }

    #[test]
    fn continuation_without_fragment_in_progress_is_rejected() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let bytes = unmasked_frame(true, 0x0, b"x");
        assert!(matches!(
            decoder.decode(&bytes),
            Err(Error::InvalidContinuationFrame)
        ));
    }

    #[test]
    fn text_frame_while_fragment_in_progress_is_rejected() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let mut bytes = unmasked_frame(false, 0x1, b"Hel");
        bytes.extend(unmasked_frame(true, 0x1, b"lo"));
        assert!(matches!(
            decoder.decode(&bytes),
            Err(Error::InvalidFrameFragmentation)
        ));
    }

    #[test]
    fn close_frame_with_code_and_reason() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let mut payload = 1000u16.to_be_bytes().to_vec();
        payload.extend_from_slice(b"bye");
        let bytes = unmasked_frame(true, 0x8, &payload);
        let events = decoder.decode(&bytes).unwrap();
        assert_eq!(
            events,
            vec![DecodedEvent::Close {
                code: CloseCode::Normal,
                reason: "bye".to_string()
            }]
        );
    }

    #[test]
    fn close_frame_with_empty_payload_reports_no_status() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let bytes = unmasked_frame(true, 0x8, &[]);
        let events = decoder.decode(&bytes).unwrap();
        assert_eq!(
            events,
            vec![DecodedEvent::Close {
                code: CloseCode::NoStatus,
                reason: String::new()
            }]
        );
    }

    #[test]
    fn close_frame_with_reserved_code_remaps_to_protocol_error() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let payload = 1005u16.to_be_bytes().to_vec();
        let bytes = unmasked_frame(true, 0x8, &payload);
        let events = decoder.decode(&bytes).unwrap();
        assert_eq!(
            events,
            vec![DecodedEvent::Close {
                code: CloseCode::ProtocolError,
                reason: String::new()
            }]
        );
    }

    #[test]
    fn invalid_utf8_text_frame_is_a_from_utf8_error() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        // 0xC3 0x28 is not valid UTF-8 (0xC3 starts a two-byte sequence that
        // 0x28 can't continue).
        let bytes = unmasked_frame(true, 0x1, &[0xC3, 0x28]);
        assert!(matches!(
            decoder.decode(&bytes),
            Err(Error::FromUtf8Error { .. })
        ));
    }

    #[test]
    fn oversize_frame_is_rejected_before_buffering_payload() {
        let mut decoder = FrameDecoder::new(4, 1 << 20);
        let bytes = unmasked_frame(true, 0x2, b"too long");
        assert!(matches!(decoder.decode(&bytes), Err(Error::MaxFrameSize)));
    }

    #[test]
    fn ping_and_pong_are_not_pushed_to_the_reassembly_stack() {
        let mut decoder = FrameDecoder::new(1 << 20, 1 << 20);
        let mut bytes = unmasked_frame(true, 0x9, b"ping-payload");
        bytes.extend(unmasked_frame(true, 0xA, b"pong-payload"));
        let events = decoder.decode(&bytes).unwrap();
        assert_eq!(
            events,
            vec![
                DecodedEvent::Ping(b"ping-payload".to_vec()),
                DecodedEvent::Pong(b"pong-payload".to_vec()),
            ]
        );
    }
}
