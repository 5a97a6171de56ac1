//! Frame encoding and the serialized write pump.
//!
//! RFC 6455 requires every client-to-server frame to be masked with a fresh
//! random 32-bit key. [`Writer`] handles that; [`WritePump`] fans the
//! single underlying write half in behind an mpsc queue so `write_text`,
//! `write_ping`, pong replies, and the close handshake can all be triggered
//! from different call sites without interleaving partial frames on the
//! wire.

use crate::bytes_util::apply_mask;
use crate::error::Error;
use crate::frame::Frame;
use crate::stream::SocketFlowStream;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;

/// Encodes a frame as it goes out to the server: header, extended length
/// if needed, masking key, then the masked payload.
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let mut rng = StdRng::from_rng(rand::thread_rng());
    let mask = [
        rng.random::<u8>(),
        rng.random::<u8>(),
        rng.random::<u8>(),
        rng.random::<u8>(),
    ];

    let first_byte = (frame.final_fragment as u8) << 7 | frame.opcode.as_u8();
    let payload_len = frame.payload.len();

    let mut out = Vec::with_capacity(14 + payload_len);
    out.push(first_byte);

    if payload_len <= 125 {
        out.push(0b1000_0000 | payload_len as u8);
    } else if payload_len <= 65535 {
        out.push(126 | 0b1000_0000);
        out.extend_from_slice(&(payload_len as u16).to_be_bytes());
    } else {
        out.push(127 | 0b1000_0000);
        out.extend_from_slice(&(payload_len as u64).to_be_bytes());
    }

    out.extend_from_slice(&mask);

    let mut masked_payload = frame.payload.clone();
    apply_mask(&mut masked_payload, mask);
    out.extend_from_slice(&masked_payload);

    out
}

/// Owns the outbound half of the socket. Not meant to be shared directly;
/// `WritePump` serializes access to it.
pub struct Writer {
    write_half: WriteHalf<SocketFlowStream>,
}

impl Writer {
    pub fn new(write_half: WriteHalf<SocketFlowStream>) -> Self {
        Self { write_half }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        let bytes = encode_frame(frame);
        self.write_half.write_all(&bytes).await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), Error> {
        self.write_half.shutdown().await?;
        Ok(())
    }
}

/// A handle to the background task draining outbound frames. Cheaply
/// cloneable; every clone enqueues onto the same underlying channel, so
/// frames from different call sites are still written one at a time.
#[derive(Clone)]
pub struct WritePump {
    tx: mpsc::Sender<Frame>,
}

impl WritePump {
    /// Spawns the writer task and returns a handle to it. The task exits
    /// once every handle clone has been dropped and the queue drains.
    pub fn spawn(mut writer: Writer) -> Self {
        let (tx, mut rx) = mpsc::channel::<Frame>(64);

        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(err) = writer.write_frame(&frame).await {
                    log::warn!("write pump stopping after send error: {err}");
                    break;
                }
            }
        });

        Self { tx }
    }

    pub async fn send(&self, frame: Frame) -> Result<(), Error> {
        self.tx
            .send(frame)
            .await
            .map_err(|source| Error::SendError { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::OpCode;

    #[test]
    fn masked_frame_round_trips_through_unmask() {
        let frame = Frame::new(true, OpCode::Text, b"hello".to_vec());
        let encoded = encode_frame(&frame);

        assert_eq!(encoded[0], 0b1000_0001);
        assert_eq!(encoded[1] & 0b1000_0000, 0b1000_0000);

        let len = (encoded[1] & 0b0111_1111) as usize;
        let mask = [encoded[2], encoded[3], encoded[4], encoded[5]];
        let mut payload = encoded[6..6 + len].to_vec();
        apply_mask(&mut payload, mask);
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn extended_length_is_used_above_125_bytes() {
        let frame = Frame::new(true, OpCode::Binary, vec![0u8; 200]);
        let encoded = encode_frame(&frame);
        assert_eq!(encoded[1] & 0b0111_1111, 126);
    }
}
