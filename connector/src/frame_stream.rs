use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::sync::ReusableBoxFuture;

use crate::client::{ClientEndpoint, Frame};

/// Stashes the tail of a frame that didn't fit in the caller's buffer so the
/// next `poll_read` can hand it out before pulling a new frame.
#[derive(Default)]
struct ReadBuffer(Option<Vec<u8>>);

impl ReadBuffer {
    fn take_data(&mut self) -> Option<Vec<u8>> {
        self.0.take()
    }

    fn put_data(&mut self, target: &mut ReadBuf<'_>, bytes: Vec<u8>) -> Poll<io::Result<()>> {
        let n = target.remaining().min(bytes.len());
        target.put_slice(&bytes[..n]);
        if n < bytes.len() {
            self.0 = Some(bytes[n..].to_vec());
        }
        Poll::Ready(Ok(()))
    }
}

async fn read_one_frame(client: Arc<ClientEndpoint>) -> io::Result<Option<Vec<u8>>> {
    match client.read_frame().await {
        Ok(Some(Frame::Binary(b))) => Ok(Some(b)),
        Ok(Some(Frame::Text(t))) => Ok(Some(t.into_bytes())),
        Ok(None) => Ok(None),
        Err(e) => Err(io::Error::other(e.to_string())),
    }
}

async fn write_one_frame(client: Arc<ClientEndpoint>, data: Vec<u8>) -> io::Result<()> {
    client
        .write_frame(Frame::Binary(data))
        .await
        .map_err(|e| io::Error::other(e.to_string()))
}

/// Bridges a message-framed WebSocket (via [`ClientEndpoint`]) into a byte
/// stream. The SSH client implementation wants `AsyncRead + AsyncWrite`; the
/// underlying transport only offers whole frames, so each poll drives an
/// in-flight read or write future to completion via a reusable boxed future,
/// the same shape `microsoft-dev-tunnels` uses for its forwarded-port I/O.
pub struct FrameStream {
    client: Arc<ClientEndpoint>,
    read_buf: ReadBuffer,
    read_fut: ReusableBoxFuture<'static, io::Result<Option<Vec<u8>>>>,
    read_fut_active: bool,
    write_fut: ReusableBoxFuture<'static, io::Result<()>>,
    write_fut_active: bool,
}

impl FrameStream {
    pub fn new(client: Arc<ClientEndpoint>) -> Self {
        Self {
            client,
            read_buf: ReadBuffer::default(),
            read_fut: ReusableBoxFuture::new(std::future::pending()),
            read_fut_active: false,
            write_fut: ReusableBoxFuture::new(std::future::pending()),
            write_fut_active: false,
        }
    }
}

impl AsyncRead for FrameStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(data) = self.read_buf.take_data() {
            return self.read_buf.put_data(buf, data);
        }

        if !self.read_fut_active {
            let client = self.client.clone();
            self.read_fut.set(read_one_frame(client));
            self.read_fut_active = true;
        }

        match self.read_fut.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                self.read_fut_active = false;
                match result {
                    Ok(Some(data)) => self.read_buf.put_data(buf, data),
                    Ok(None) => Poll::Ready(Ok(())),
                    Err(e) => Poll::Ready(Err(e)),
                }
            }
        }
    }
}

impl AsyncWrite for FrameStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if !self.write_fut_active {
            let client = self.client.clone();
            self.write_fut.set(write_one_frame(client, buf.to_vec()));
            self.write_fut_active = true;
        }

        match self.write_fut.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                self.write_fut_active = false;
                Poll::Ready(result.map(|()| buf.len()))
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
