use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use tracing::debug;

use crate::proxy::ProxyHandler;

/// 수락된 연결 하나를 HTTP/1.1로 처리합니다.
///
/// 프로토콜 업그레이드(`101 Switching Protocols`)를 위해 연결을 끝까지 넘겨줍니다.
pub async fn serve_connection<I>(
    proxy: Arc<ProxyHandler>,
    io: I,
    remote_addr: SocketAddr,
) -> Result<(), hyper::Error>
where
    I: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
{
    debug!(remote = %remote_addr, "연결 처리 시작");

    let service = service_fn(move |req| {
        let proxy = proxy.clone();
        async move { proxy.handle(req, remote_addr).await }
    });

    http1::Builder::new()
        .serve_connection(io, service)
        .with_upgrades()
        .await
}
