//! Async client-side WebSocket endpoint for the Tokio stack.
//!
//! Implements the [WebSocket Protocol RFC](https://datatracker.ietf.org/doc/html/rfc6455)
//! opening handshake, frame codec, fragmentation reassembly, and control-frame
//! handling, talking plain TCP or TLS (via `rustls`) underneath. Connect with
//! [`WebSocket::new`], set a delegate or per-event closures, then
//! [`WebSocket::connect`]:
//!
//! ```no_run
//! use socket_flow::connection::WebSocket;
//!
//! # async fn run() -> Result<(), socket_flow::error::Error> {
//! let mut ws = WebSocket::new("ws://localhost:9000/");
//! ws.on_text(|text| println!("got: {text}"));
//! ws.connect().await?;
//! ws.write_text("hello").await?;
//! # Ok(())
//! # }
//! ```

mod bytes_util;
pub mod config;
pub mod connection;
pub mod decoder;
pub mod delegate;
pub mod error;
pub mod executor;
pub mod frame;
mod handshake;
pub mod message;
mod request;
mod stream;
pub mod tls;
mod utils;
mod write;

pub use config::ClientConfig;
pub use connection::{ConnectionState, WebSocket};
pub use delegate::WebSocketDelegate;
pub use error::Error;
pub use message::Message;
pub use tls::TrustPredicate;
