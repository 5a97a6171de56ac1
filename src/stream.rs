//! The duplex byte stream the rest of the crate reads and writes, hiding
//! whether TLS is in the loop.

use crate::error::Error;
use std::io::Result as IoResult;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// A plain TCP stream or a TLS stream over TCP, dispatched to by
/// delegation so the rest of the crate can treat a connection uniformly
/// regardless of scheme.
#[derive(Debug)]
pub enum SocketFlowStream {
    Plain(TcpStream),
    Secure(Box<TlsStream<TcpStream>>),
}

impl SocketFlowStream {
    pub fn peer_addr(&self) -> IoResult<std::net::SocketAddr> {
        match self {
            SocketFlowStream::Plain(stream) => stream.peer_addr(),
            SocketFlowStream::Secure(stream) => stream.get_ref().0.peer_addr(),
        }
    }
}

impl AsyncRead for SocketFlowStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<IoResult<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            SocketFlowStream::Secure(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketFlowStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<IoResult<usize>> {
        match self.get_mut() {
            SocketFlowStream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            SocketFlowStream::Secure(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            SocketFlowStream::Secure(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        match self.get_mut() {
            SocketFlowStream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            SocketFlowStream::Secure(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Opens the TCP connection for `host:port`, wrapping it in TLS via
/// `connector` when `use_tls` is set. The handshake HTTP exchange happens
/// on top of whatever this returns.
pub async fn connect(
    host: &str,
    port: u16,
    use_tls: bool,
    connector: Option<&tokio_rustls::TlsConnector>,
    server_name: pki_types::ServerName<'static>,
) -> Result<SocketFlowStream, Error> {
    let tcp = TcpStream::connect((host, port)).await?;
    tcp.set_nodelay(true)?;

    if use_tls {
        let connector = connector.expect("TLS connector required when use_tls is set");
        let tls_stream = connector.connect(server_name, tcp).await?;
        Ok(SocketFlowStream::Secure(Box::new(tls_stream)))
    } else {
        Ok(SocketFlowStream::Plain(tcp))
    }
}
