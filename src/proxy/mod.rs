pub mod dialer;
pub mod error;
mod headers;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Incoming;
use hyper::http::uri::{Authority, Scheme};
use hyper::upgrade::OnUpgrade;
use hyper::{Request, Response, StatusCode, Uri, Version};
use hyper_util::client::legacy;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::logging::{log_request, RequestLog};
use crate::target::{TargetSpec, TransportKind};

pub use dialer::{BackendStream, Dialer};
pub use error::ProxyError;

pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

// tcp/unix 타겟에서 커넥션 풀 키로만 쓰이는 내부 호스트
const SYNTHETIC_AUTHORITY: &str = "backend";

#[derive(Debug, Clone)]
enum UriRewrite {
    SingleHost {
        authority: Authority,
        base_path: String,
        base_query: Option<String>,
    },
    Synthetic,
}

impl UriRewrite {
    fn single_host(raw: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidUrl {
            url: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("호스트가 없음".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(UriRewrite::SingleHost {
            authority,
            base_path: url.path().to_string(),
            base_query: url.query().map(str::to_string),
        })
    }

    fn apply(&self, uri: &Uri) -> Result<Uri, hyper::http::Error> {
        match self {
            UriRewrite::SingleHost { authority, base_path, base_query } => {
                let path = join_path(base_path, uri.path());
                let path_and_query = match join_query(base_query.as_deref(), uri.query()) {
                    Some(query) => format!("{}?{}", path, query),
                    None => path,
                };
                Uri::builder()
                    .scheme(Scheme::HTTP)
                    .authority(authority.clone())
                    .path_and_query(path_and_query)
                    .build()
            }
            UriRewrite::Synthetic => {
                let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
                Uri::builder()
                    .scheme(Scheme::HTTP)
                    .authority(SYNTHETIC_AUTHORITY)
                    .path_and_query(path_and_query)
                    .build()
            }
        }
    }
}

fn join_path(base: &str, request: &str) -> String {
    match (base.ends_with('/'), request.starts_with('/')) {
        (true, true) => format!("{}{}", base, &request[1..]),
        (false, false) => format!("{}/{}", base, request),
        _ => format!("{}{}", base, request),
    }
}

fn join_query(base: Option<&str>, request: Option<&str>) -> Option<String> {
    let base = base.unwrap_or_default();
    let request = request.unwrap_or_default();
    let joined = if base.is_empty() || request.is_empty() {
        format!("{}{}", base, request)
    } else {
        format!("{}&{}", base, request)
    };
    (!joined.is_empty()).then_some(joined)
}

/// 모든 요청을 단일 백엔드로 전달하는 핸들러.
///
/// 생성 시점에는 네트워크 I/O가 없고, 백엔드 연결은 요청마다 `Dialer`가 엽니다.
/// 모든 리스너와 커넥션이 하나의 인스턴스를 공유합니다.
#[derive(Clone)]
pub struct ProxyHandler {
    client: legacy::Client<Dialer, Incoming>,
    rewrite: UriRewrite,
    backend: Arc<str>,
}

impl ProxyHandler {
    pub fn new(target: &TargetSpec) -> Result<Self, ProxyError> {
        let rewrite = match target.kind() {
            TransportKind::Http => UriRewrite::single_host(target.address())?,
            TransportKind::Tcp | TransportKind::Unix => UriRewrite::Synthetic,
        };

        let client = legacy::Client::builder(TokioExecutor::new())
            .build::<_, Incoming>(Dialer::for_target(target));

        Ok(Self {
            client,
            rewrite,
            backend: Arc::from(target.to_string()),
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    #[instrument(skip_all, fields(method = %req.method(), path = %req.uri().path()))]
    pub async fn handle(
        &self,
        req: Request<Incoming>,
        client_addr: SocketAddr,
    ) -> Result<Response<ProxyBody>, Infallible> {
        let start_time = Instant::now();
        let mut log = RequestLog::new(Uuid::new_v4().to_string());
        log.with_request(&req);
        log.with_backend(&self.backend);

        let response = match self.forward(req, client_addr).await {
            Ok(response) => response,
            Err(e) => {
                log.with_error(&e);
                error_response(&e)
            }
        };
        log.with_response(response.status());

        log.duration_ms = start_time.elapsed().as_millis() as u64;
        log_request(&log);

        Ok(response)
    }

    async fn forward(
        &self,
        mut req: Request<Incoming>,
        client_addr: SocketAddr,
    ) -> Result<Response<ProxyBody>, ProxyError> {
        let upgrade = headers::upgrade_type(req.headers());
        let client_upgrade = upgrade.as_ref().map(|_| hyper::upgrade::on(&mut req));

        let (mut parts, body) = req.into_parts();
        parts.uri = self.rewrite.apply(&parts.uri)?;
        parts.version = Version::HTTP_11;
        headers::prepare_request(&mut parts.headers, client_addr.ip(), upgrade.as_deref());

        let mut response = self.client.request(Request::from_parts(parts, body)).await?;

        if response.status() == StatusCode::SWITCHING_PROTOCOLS {
            return switch_protocols(upgrade, client_upgrade, response);
        }

        headers::remove_hop_by_hop(response.headers_mut());
        Ok(response.map(|body| body.boxed()))
    }
}

fn switch_protocols(
    requested: Option<String>,
    client_upgrade: Option<OnUpgrade>,
    mut response: Response<Incoming>,
) -> Result<Response<ProxyBody>, ProxyError> {
    let returned = headers::upgrade_type(response.headers()).unwrap_or_default();

    let client_upgrade = match (requested, client_upgrade) {
        (Some(requested), Some(client_upgrade)) if requested.eq_ignore_ascii_case(&returned) => {
            client_upgrade
        }
        (requested, _) => {
            return Err(ProxyError::UpgradeMismatch {
                requested: requested.unwrap_or_default(),
                returned,
            })
        }
    };

    let backend_upgrade = hyper::upgrade::on(&mut response);
    tokio::spawn(tunnel(client_upgrade, backend_upgrade));

    let (parts, _) = response.into_parts();
    Ok(Response::from_parts(parts, empty()))
}

async fn tunnel(client: OnUpgrade, backend: OnUpgrade) {
    let (client, backend) = match tokio::try_join!(client, backend) {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "프로토콜 업그레이드 실패");
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut backend = TokioIo::new(backend);
    match tokio::io::copy_bidirectional(&mut client, &mut backend).await {
        Ok((from_client, from_backend)) => {
            debug!(from_client, from_backend, "업그레이드된 연결 종료");
        }
        Err(e) => {
            debug!(error = %e, "업그레이드된 연결 오류");
        }
    }
}

fn empty() -> ProxyBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

fn full(message: String) -> ProxyBody {
    Full::new(Bytes::from(message)).map_err(|never| match never {}).boxed()
}

pub fn error_response(error: &ProxyError) -> Response<ProxyBody> {
    let status = match error {
        ProxyError::Backend(_) | ProxyError::UpgradeMismatch { .. } => StatusCode::BAD_GATEWAY,
        ProxyError::Request(_) | ProxyError::InvalidUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut response = Response::new(full(error.to_string()));
    *response.status_mut() = status;
    response
}
