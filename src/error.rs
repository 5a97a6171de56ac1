use crate::frame::{CloseCode, Frame};
use httparse::Error as HttpParseError;
use pki_types::InvalidDnsNameError;
use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio::time::error::Elapsed;
use url::ParseError;

/// Internal (non-close-code) error codes, surfaced alongside [`Error`] in the
/// `on_disconnect` callback when the failure didn't originate from a received
/// CLOSE frame. Numbering starts at 1, mirroring the reference client's error
/// domain convention.
pub const OUTPUT_STREAM_WRITE_ERROR: i32 = 1;

#[derive(Error, Debug)]
pub enum Error {
    // Sender / Receiver Errors
    #[error("{source}")]
    SendError {
        #[from]
        source: SendError<Frame>,
    },

    #[error("channel communication error")]
    CommunicationError,

    // General Errors
    #[error("{source}")]
    Timeout {
        #[from]
        source: Elapsed,
    },

    #[error("IO error happened: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    #[error("{source}")]
    FromUtf8Error {
        #[from]
        source: FromUtf8Error,
    },

    // Handshake errors
    #[error("server responded with a non-101 status during handshake: {0}")]
    NonSwitchingProtocolsStatus(u16),

    #[error("connection: upgrade header missing in the response")]
    NoConnectionHeaderPresent,

    #[error("upgrade: websocket header missing in the response")]
    NoUpgradeHeaderPresent,

    #[error("couldn't find Sec-WebSocket-Accept header in the response")]
    NoSecWebsocketAccept,

    #[error("Sec-WebSocket-Accept value does not match the expected handshake key digest")]
    InvalidAcceptKey,

    #[error("server did not upgrade the connection")]
    NoUpgrade,

    // Framing errors
    #[error("RSV bit set without a negotiated extension")]
    RSVNotZero,

    #[error("MASK bit set on a frame received from the server")]
    MaskedFrameFromServer,

    #[error("control frames must not be fragmented")]
    ControlFramesFragmented,

    #[error("control frame with invalid payload size, can't be greater than 125")]
    ControlFramePayloadSize,

    #[error("fragment_size: `{0}` can't be greater than max_frame_size: `{1}`")]
    CustomFragmentSizeExceeded(usize, usize),

    #[error("max frame size reached")]
    MaxFrameSize,

    #[error("max message size reached")]
    MaxMessageSize,

    // Fragmentation errors
    #[error("invalid frame while there is a fragmented message in progress")]
    InvalidFrameFragmentation,

    #[error("incoming fragmented message but there is one already in progress")]
    FragmentedInProgress,

    #[error("invalid continuation frame: no fragmented message to continue")]
    InvalidContinuationFrame,

    #[error("invalid opcode")]
    InvalidOpcode,

    #[error("invalid close code: {0}")]
    InvalidCloseCode(u16),

    // HTTP / URL errors
    #[error("{source}")]
    URLParseError {
        #[from]
        source: ParseError,
    },

    #[error("invalid scheme in WebSocket URL")]
    InvalidSchemeURL,

    #[error("URL has no host")]
    URLNoHost,

    #[error("{source}")]
    HttpParseError {
        #[from]
        source: HttpParseError,
    },

    #[error("incomplete HTTP response")]
    IncompleteHTTPResponse,

    #[error("HTTP response headers exceeded the maximum handshake buffer size")]
    HandshakeBufferExceeded,

    // TLS / certificate errors
    #[error("{source}")]
    DomainError {
        #[from]
        source: InvalidDnsNameError,
    },

    #[error("{source}")]
    TLSError {
        #[from]
        source: rustls::Error,
    },

    #[error("peer certificate rejected by trust predicate for host `{0}`")]
    CertificateRejected(String),

    #[error("invalid TLS client configuration: {0}")]
    TlsConfigError(String),

    #[error("use_tls = `{0}` argument does not match the passed URL scheme: `{1}`")]
    SchemeAgainstTlsConfig(bool, String),

    #[error("connection is not open")]
    NotConnected,
}

impl Error {
    /// The close code this client echoes back to the server when this error
    /// aborts the read loop. Invalid UTF-8 in a TEXT/CONTINUATION payload
    /// gets the dedicated Encoding code (1007); every other decode failure
    /// is a generic protocol error (1002).
    pub fn close_code(&self) -> CloseCode {
        match self {
            Error::FromUtf8Error { .. } => CloseCode::Encoding,
            _ => CloseCode::ProtocolError,
        }
    }
}
