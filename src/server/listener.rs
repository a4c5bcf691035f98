use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use super::error::Error;
use super::handler::serve_connection;
use super::Result;
use crate::proxy::ProxyHandler;
use crate::tls::{self, TlsMaterial};

const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);
const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerKind {
    Plain,
    Tls(TlsMaterial),
}

/// 프론트엔드 리스너 하나의 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub kind: ListenerKind,
    pub bind_address: String,
}

impl ListenerConfig {
    pub fn plain(bind_address: &str) -> Self {
        Self {
            kind: ListenerKind::Plain,
            bind_address: bind_address.to_string(),
        }
    }

    pub fn tls(bind_address: &str, material: TlsMaterial) -> Self {
        Self {
            kind: ListenerKind::Tls(material),
            bind_address: bind_address.to_string(),
        }
    }

    /// 바인딩 전에 TLS 자료를 읽어 둡니다.
    pub(super) fn prepare(&self) -> Result<PreparedListener> {
        let acceptor = match &self.kind {
            ListenerKind::Plain => None,
            ListenerKind::Tls(material) => {
                let acceptor = tls::load_acceptor(material).map_err(|error| Error::TlsError {
                    addr: self.bind_address.clone(),
                    error,
                })?;
                Some(acceptor)
            }
        };

        Ok(PreparedListener {
            bind_address: self.bind_address.clone(),
            acceptor,
        })
    }
}

/// `:8080` 처럼 호스트가 없는 주소는 모든 IPv4 인터페이스에 바인딩
pub fn normalize_bind_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

pub(super) struct PreparedListener {
    bind_address: String,
    acceptor: Option<TlsAcceptor>,
}

impl PreparedListener {
    pub(super) async fn bind(self) -> Result<BoundListener> {
        let listener = TcpListener::bind(normalize_bind_address(&self.bind_address))
            .await
            .map_err(|e| {
                error!(error = %e, addr = %self.bind_address, "포트 바인딩 실패");
                Error::BindError {
                    addr: self.bind_address.clone(),
                    error: e,
                }
            })?;

        let local_addr = listener.local_addr().map_err(|e| Error::BindError {
            addr: self.bind_address.clone(),
            error: e,
        })?;

        Ok(BoundListener {
            listener,
            acceptor: self.acceptor,
            bind_address: self.bind_address,
            local_addr,
        })
    }
}

/// 바인딩이 끝나 연결을 받을 수 있는 리스너
pub struct BoundListener {
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    bind_address: String,
    local_addr: SocketAddr,
}

impl BoundListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn scheme(&self) -> &'static str {
        if self.acceptor.is_some() {
            "https"
        } else {
            "http"
        }
    }

    /// accept 루프. 리스너가 더 이상 연결을 받을 수 없을 때만 반환합니다.
    pub async fn run(self, proxy: Arc<ProxyHandler>) -> Result<Infallible> {
        info!(addr = %self.local_addr, scheme = self.scheme(), "{} on {}", self.scheme(), self.bind_address);

        let mut backoff: Option<Duration> = None;
        loop {
            let (stream, remote_addr) = match self.listener.accept().await {
                Ok(accepted) => {
                    backoff = None;
                    accepted
                }
                Err(e) if is_connection_error(&e) => {
                    debug!(error = %e, "연결 수락 중 클라이언트 연결 끊김");
                    continue;
                }
                Err(e) if is_resource_exhausted(&e) => {
                    let delay = backoff.map_or(MIN_ACCEPT_BACKOFF, |d| (d * 2).min(MAX_ACCEPT_BACKOFF));
                    warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "연결 수락 실패, 재시도");
                    backoff = Some(delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    error!(error = %e, addr = %self.bind_address, "연결 수락 실패");
                    return Err(Error::AcceptError {
                        addr: self.bind_address.clone(),
                        error: e,
                    });
                }
            };

            let proxy = proxy.clone();
            let acceptor = self.acceptor.clone();
            tokio::spawn(handle_stream(proxy, acceptor, stream, remote_addr));
        }
    }
}

async fn handle_stream(
    proxy: Arc<ProxyHandler>,
    acceptor: Option<TlsAcceptor>,
    stream: TcpStream,
    remote_addr: SocketAddr,
) {
    let result = match acceptor {
        None => serve_connection(proxy, TokioIo::new(stream), remote_addr).await,
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => serve_connection(proxy, TokioIo::new(tls_stream), remote_addr).await,
            Err(e) => {
                warn!(error = %e, remote = %remote_addr, "TLS 핸드쉐이크 실패");
                return;
            }
        },
    };

    if let Err(err) = result {
        debug!(error = %err, remote = %remote_addr, "연결 처리 실패");
    }
}

// 해당 연결에만 영향을 주는 오류
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

// 파일 디스크립터 고갈 (EMFILE/ENFILE 등)
fn is_resource_exhausted(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(23) | Some(24)) || e.kind() == io::ErrorKind::OutOfMemory
}
