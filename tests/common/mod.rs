#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use sockproxy::proxy::ProxyHandler;
use sockproxy::server::{self, ListenerConfig, Supervisor};
use sockproxy::target::TargetSpec;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// 요청 내용을 헤더로 돌려주는 테스트 백엔드
async fn echo(mut req: Request<Incoming>, label: &'static str) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.uri().path() == "/upgrade" {
        let on_upgrade = hyper::upgrade::on(&mut req);
        tokio::spawn(async move {
            if let Ok(upgraded) = on_upgrade.await {
                let mut io = TokioIo::new(upgraded);
                let mut buf = [0u8; 1024];
                while let Ok(n) = io.read(&mut buf).await {
                    if n == 0 || io.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        });

        return Ok(Response::builder()
            .status(StatusCode::SWITCHING_PROTOCOLS)
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "echo")
            .body(Full::default())
            .unwrap());
    }

    let header_value = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    let method = req.method().to_string();
    let path = req.uri().path_and_query().map(|pq| pq.to_string()).unwrap_or_default();
    let host = header_value("host");
    let forwarded_for = header_value("x-forwarded-for");
    let custom = header_value("x-custom");
    let saw_proxy_auth = req.headers().contains_key(header::PROXY_AUTHORIZATION);

    let body = req.into_body().collect().await.map(|c| c.to_bytes()).unwrap_or_default();

    Ok(Response::builder()
        .header("x-backend", label)
        .header("x-echo-method", method)
        .header("x-echo-path", path)
        .header("x-echo-host", host)
        .header("x-echo-forwarded-for", forwarded_for)
        .header("x-echo-custom", custom)
        .header("x-echo-proxy-auth", saw_proxy_auth.to_string())
        .header("keep-alive", "timeout=5")
        .body(Full::new(body))
        .unwrap())
}

async fn serve_backend<I>(io: I, label: &'static str)
where
    I: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
{
    let _ = http1::Builder::new()
        .serve_connection(io, service_fn(move |req| echo(req, label)))
        .with_upgrades()
        .await;
}

pub async fn spawn_tcp_backend(label: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_backend(TokioIo::new(stream), label));
        }
    });

    addr
}

#[cfg(unix)]
pub fn spawn_unix_backend(path: &Path, label: &'static str) {
    let listener = tokio::net::UnixListener::bind(path).unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_backend(TokioIo::new(stream), label));
        }
    });
}

/// 첫 청크를 보내고 `pause` 뒤에 두 번째 청크를 보내는 백엔드.
/// 응답 본문이 버퍼링 없이 흘러가는지 확인할 때 사용합니다.
pub async fn spawn_chunked_backend(first: &'static str, second: &'static str, pause: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                // 요청 헤더 끝까지 읽기
                let mut head = Vec::new();
                let mut byte = [0u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    if stream.read_exact(&mut byte).await.is_err() {
                        return;
                    }
                    head.push(byte[0]);
                }

                let start = format!(
                    "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{}\r\n",
                    first.len(),
                    first
                );
                if stream.write_all(start.as_bytes()).await.is_err() {
                    return;
                }
                let _ = stream.flush().await;

                tokio::time::sleep(pause).await;

                let rest = format!("{:x}\r\n{}\r\n0\r\n\r\n", second.len(), second);
                let _ = stream.write_all(rest.as_bytes()).await;
            });
        }
    });

    addr
}

/// 아무도 듣고 있지 않은 로컬 주소
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// 주어진 리스너 설정으로 프록시를 띄우고 바인딩된 주소를 돌려줍니다.
pub async fn start_proxy_with(target: &str, configs: Vec<ListenerConfig>) -> Vec<SocketAddr> {
    let target = TargetSpec::parse(target).unwrap();
    let proxy = Arc::new(ProxyHandler::new(&target).unwrap());

    let listeners = Supervisor::new(configs).bind().await.unwrap();
    let addrs = listeners.iter().map(|l| l.local_addr()).collect();
    tokio::spawn(server::serve(listeners, proxy));

    addrs
}

pub async fn start_proxy(target: &str) -> SocketAddr {
    start_proxy_with(target, vec![ListenerConfig::plain("127.0.0.1:0")]).await[0]
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// 테스트용 CA와 그 CA가 서명한 서버/클라이언트 인증서
pub struct TestPki {
    pub ca_cert_pem: String,
    pub ca_cert_der: Vec<u8>,
    pub server_cert_pem: String,
    pub server_key_pem: String,
    pub client_cert_der: Vec<u8>,
    pub client_key_der: Vec<u8>,
}

impl TestPki {
    pub fn generate() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.distinguished_name.push(DnType::CommonName, "sockproxy test ca");
        ca_params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let server_key = KeyPair::generate().unwrap();
        let mut server_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        server_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let server_cert = server_params.signed_by(&server_key, &ca_cert, &ca_key).unwrap();

        let client_key = KeyPair::generate().unwrap();
        let mut client_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        client_params.distinguished_name.push(DnType::CommonName, "sockproxy test client");
        client_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
        let client_cert = client_params.signed_by(&client_key, &ca_cert, &ca_key).unwrap();

        Self {
            ca_cert_pem: ca_cert.pem(),
            ca_cert_der: ca_cert.der().to_vec(),
            server_cert_pem: server_cert.pem(),
            server_key_pem: server_key.serialize_pem(),
            client_cert_der: client_cert.der().to_vec(),
            client_key_der: client_key.serialize_der(),
        }
    }

    /// ca.pem, server-cert.pem, server-key.pem 파일을 디렉터리에 씁니다.
    pub fn write_to(&self, dir: &Path) {
        std::fs::write(dir.join("ca.pem"), &self.ca_cert_pem).unwrap();
        std::fs::write(dir.join("server-cert.pem"), &self.server_cert_pem).unwrap();
        std::fs::write(dir.join("server-key.pem"), &self.server_key_pem).unwrap();
    }
}
