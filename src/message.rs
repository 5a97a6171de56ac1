use crate::error::Error;
use crate::frame::{Frame, OpCode};

/// A reassembled application message, as delivered to `on_text`/`on_data`
/// once the decoder has collected every fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    pub fn from_frame(frame: Frame) -> Result<Self, Error> {
        match frame.opcode {
            OpCode::Text => Ok(Message::Text(String::from_utf8(frame.payload)?)),
            OpCode::Binary => Ok(Message::Binary(frame.payload)),
            _ => Err(Error::InvalidOpcode),
        }
    }

    pub fn as_binary(&self) -> Vec<u8> {
        match self {
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Binary(data) => data.clone(),
        }
    }

    pub fn as_text(&self) -> Result<String, Error> {
        match self {
            Message::Text(text) => Ok(text.clone()),
            Message::Binary(data) => Ok(String::from_utf8(data.clone())?),
        }
    }

    /// Splits the message into one or more outbound frames, none larger than
    /// `max_frame_size`. A single frame is emitted when the payload already
    /// fits; otherwise the first frame carries the real opcode and every
    /// following frame is a `Continue`, with the last marked final.
    pub fn to_frames(self, max_frame_size: usize) -> Vec<Frame> {
        let (opcode, payload) = match self {
            Message::Text(text) => (OpCode::Text, text.into_bytes()),
            Message::Binary(data) => (OpCode::Binary, data),
        };

        if payload.is_empty() {
            return vec![Frame::new(true, opcode, payload)];
        }

        let mut frames: Vec<Frame> = payload
            .chunks(max_frame_size.max(1))
            .enumerate()
            .map(|(i, chunk)| {
                let op = if i == 0 { opcode } else { OpCode::Continue };
                Frame::new(false, op, chunk.to_vec())
            })
            .collect();

        if let Some(last_frame) = frames.last_mut() {
            last_frame.final_fragment = true;
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_message_is_a_single_final_frame() {
        let frames = Message::Text("hi".into()).to_frames(1024);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].final_fragment);
        assert_eq!(frames[0].opcode, OpCode::Text);
    }

    #[test]
    fn oversized_message_fragments_with_continue_frames() {
        let frames = Message::Binary(vec![0u8; 10]).to_frames(4);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].opcode, OpCode::Binary);
        assert!(!frames[0].final_fragment);
        assert_eq!(frames[1].opcode, OpCode::Continue);
        assert!(!frames[1].final_fragment);
        assert_eq!(frames[2].opcode, OpCode::Continue);
        assert!(frames[2].final_fragment);
    }

    #[test]
    fn round_trips_through_from_frame() {
        let frame = Frame::new(true, OpCode::Text, b"hello".to_vec());
        let message = Message::from_frame(frame).unwrap();
        assert_eq!(message.as_text().unwrap(), "hello");
    }
}
