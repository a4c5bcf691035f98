use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hyper::rt::{Read, ReadBufCursor, Write};
use hyper::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tower_service::Service;
use tracing::debug;

use super::error::BoxError;
use crate::target::{TargetSpec, TransportKind};

type Dialing = Pin<Box<dyn Future<Output = Result<BackendStream, BoxError>> + Send>>;

/// 백엔드 연결 전략.
///
/// `Tcp`/`Unix`는 클라이언트가 넘겨주는 URI를 무시하고 항상 설정된 주소로 연결합니다.
/// 요청 URI의 호스트는 커넥션 풀 키로만 쓰이는 내부 표식입니다.
#[derive(Clone)]
pub enum Dialer {
    Resolve(HttpConnector),
    Tcp(Arc<str>),
    Unix(Arc<str>),
}

impl Dialer {
    pub fn for_target(target: &TargetSpec) -> Self {
        match target.kind() {
            TransportKind::Http => Dialer::Resolve(HttpConnector::new()),
            TransportKind::Tcp => Dialer::Tcp(Arc::from(target.address())),
            TransportKind::Unix => Dialer::Unix(Arc::from(target.address())),
        }
    }
}

impl Service<Uri> for Dialer {
    type Response = BackendStream;
    type Error = BoxError;
    type Future = Dialing;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match self {
            Dialer::Resolve(connector) => {
                Service::<Uri>::poll_ready(connector, cx).map_err(Into::into)
            }
            Dialer::Tcp(_) | Dialer::Unix(_) => Poll::Ready(Ok(())),
        }
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        match self {
            Dialer::Resolve(connector) => {
                let connecting = connector.call(uri);
                Box::pin(async move { Ok(BackendStream::Tcp(connecting.await?)) })
            }
            Dialer::Tcp(address) => Box::pin(connect_tcp(address.clone())),
            Dialer::Unix(path) => Box::pin(connect_unix(path.clone())),
        }
    }
}

async fn connect_tcp(address: Arc<str>) -> Result<BackendStream, BoxError> {
    debug!(backend = %address, "tcp 백엔드 연결");
    let stream = TcpStream::connect(&*address).await?;
    Ok(BackendStream::Tcp(TokioIo::new(stream)))
}

#[cfg(unix)]
async fn connect_unix(path: Arc<str>) -> Result<BackendStream, BoxError> {
    debug!(backend = %path, "unix 소켓 백엔드 연결");
    let stream = UnixStream::connect(&*path).await?;
    Ok(BackendStream::Unix(TokioIo::new(stream)))
}

#[cfg(not(unix))]
async fn connect_unix(path: Arc<str>) -> Result<BackendStream, BoxError> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("unix socket {} is not supported on this platform", path),
    )
    .into())
}

/// 백엔드와 맺은 연결
pub enum BackendStream {
    Tcp(TokioIo<TcpStream>),
    #[cfg(unix)]
    Unix(TokioIo<UnixStream>),
}

impl Connection for BackendStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl Read for BackendStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            BackendStream::Tcp(io) => Pin::new(io).poll_read(cx, buf),
            #[cfg(unix)]
            BackendStream::Unix(io) => Pin::new(io).poll_read(cx, buf),
        }
    }
}

impl Write for BackendStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            BackendStream::Tcp(io) => Pin::new(io).poll_write(cx, buf),
            #[cfg(unix)]
            BackendStream::Unix(io) => Pin::new(io).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            BackendStream::Tcp(io) => Pin::new(io).poll_flush(cx),
            #[cfg(unix)]
            BackendStream::Unix(io) => Pin::new(io).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            BackendStream::Tcp(io) => Pin::new(io).poll_shutdown(cx),
            #[cfg(unix)]
            BackendStream::Unix(io) => Pin::new(io).poll_shutdown(cx),
        }
    }

    fn is_write_vectored(&self) -> bool {
        match self {
            BackendStream::Tcp(io) => io.is_write_vectored(),
            #[cfg(unix)]
            BackendStream::Unix(io) => io.is_write_vectored(),
        }
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            BackendStream::Tcp(io) => Pin::new(io).poll_write_vectored(cx, bufs),
            #[cfg(unix)]
            BackendStream::Unix(io) => Pin::new(io).poll_write_vectored(cx, bufs),
        }
    }
}
