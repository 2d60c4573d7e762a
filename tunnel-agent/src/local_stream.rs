use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

use crate::cli::Config;
use crate::error::AgentError;

/// The local side of the tunnel: whatever byte stream gets relayed against
/// the Connector channel.
pub enum LocalStream {
    Tcp(TcpStream),
    ConnectOnWrite(ConnectOnWriteStream),
    Stdio(StdioStream),
}

impl LocalStream {
    pub async fn from_config(config: &Config) -> Result<Self, AgentError> {
        match (&config.listen, &config.proxy) {
            (Some(_), Some(_)) => Err(AgentError::ConflictingLocalMode),
            (Some(addr), None) => {
                info!(%addr, "listening for a local TCP connection");
                let listener = TcpListener::bind(addr).await?;
                let (stream, peer) = listener.accept().await?;
                info!(%peer, "accepted local TCP connection");
                Ok(LocalStream::Tcp(stream))
            }
            (None, Some(addr)) => Ok(LocalStream::ConnectOnWrite(ConnectOnWriteStream::new(
                addr.clone(),
            ))),
            (None, None) => Ok(LocalStream::Stdio(StdioStream::new())),
        }
    }
}

impl AsyncRead for LocalStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LocalStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            LocalStream::ConnectOnWrite(s) => Pin::new(s).poll_read(cx, buf),
            LocalStream::Stdio(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for LocalStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            LocalStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            LocalStream::ConnectOnWrite(s) => Pin::new(s).poll_write(cx, buf),
            LocalStream::Stdio(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LocalStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            LocalStream::ConnectOnWrite(s) => Pin::new(s).poll_flush(cx),
            LocalStream::Stdio(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LocalStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            LocalStream::ConnectOnWrite(s) => Pin::new(s).poll_shutdown(cx),
            LocalStream::Stdio(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Defers the TCP dial until the first outbound byte, so an idle channel
/// never opens a connection to `addr` at all. Mirrors `wwscat`'s `COWConn`.
pub struct ConnectOnWriteStream {
    addr: String,
    conn: Option<TcpStream>,
    connecting: Option<Pin<Box<dyn std::future::Future<Output = io::Result<TcpStream>> + Send>>>,
}

impl ConnectOnWriteStream {
    fn new(addr: String) -> Self {
        Self {
            addr,
            conn: None,
            connecting: None,
        }
    }
}

impl AsyncRead for ConnectOnWriteStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match &mut this.conn {
            Some(tcp) => Pin::new(tcp).poll_read(cx, buf),
            None => Poll::Pending,
        }
    }
}

impl AsyncWrite for ConnectOnWriteStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        if this.conn.is_none() {
            if this.connecting.is_none() {
                info!(addr = %this.addr, "connecting on first outbound byte");
                let addr = this.addr.clone();
                this.connecting = Some(Box::pin(async move { TcpStream::connect(addr).await }));
            }

            match this.connecting.as_mut().unwrap().as_mut().poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => {
                    this.connecting = None;
                    return Poll::Ready(Err(e));
                }
                Poll::Ready(Ok(stream)) => {
                    this.connecting = None;
                    this.conn = Some(stream);
                }
            }
        }

        Pin::new(this.conn.as_mut().unwrap()).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().conn {
            Some(tcp) => Pin::new(tcp).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().conn {
            Some(tcp) => Pin::new(tcp).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

/// Relays against the process's own stdin/stdout, the default local mode
/// when neither `--listen` nor `--proxy` is given. Mirrors `wwscat`'s
/// `StdioConn`.
pub struct StdioStream {
    stdin: tokio::io::Stdin,
    stdout: tokio::io::Stdout,
}

impl StdioStream {
    fn new() -> Self {
        Self {
            stdin: tokio::io::stdin(),
            stdout: tokio::io::stdout(),
        }
    }
}

impl AsyncRead for StdioStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stdin).poll_read(cx, buf)
    }
}

impl AsyncWrite for StdioStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().stdout).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stdout).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stdout).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use super::ConnectOnWriteStream;

    #[tokio::test]
    async fn connect_on_write_defers_dial_until_first_write() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            socket
        });

        let mut stream = ConnectOnWriteStream::new(addr.to_string());
        assert!(stream.conn.is_none(), "must not dial before first write");

        stream.write_all(b"hello").await.unwrap();
        assert!(stream.conn.is_some(), "first write should have dialed");

        accept.await.unwrap();
    }
}
