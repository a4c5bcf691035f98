use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_rustls::rustls::server::AllowAnyAuthenticatedClient;
use tokio_rustls::rustls::{self, Certificate, PrivateKey, RootCertStore};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info};

/// TLS 리스너 하나에 필요한 인증서 경로
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    /// 클라이언트 인증서를 검증할 CA 번들
    pub ca_path: Option<PathBuf>,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub require_client_cert: bool,
}

#[derive(Debug)]
pub enum TlsError {
    FileError {
        path: PathBuf,
        error: io::Error,
    },
    NoCertificates {
        path: PathBuf,
    },
    NoPrivateKey {
        path: PathBuf,
    },
    InvalidCa {
        path: PathBuf,
    },
    /// 클라이언트 인증서를 요구하지만 CA 번들이 없음
    MissingClientCa,
    Config(rustls::Error),
}

impl fmt::Display for TlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileError { path, error } =>
                write!(f, "TLS 파일 {} 오류: {}", path.display(), error),
            Self::NoCertificates { path } =>
                write!(f, "인증서를 찾을 수 없음: {}", path.display()),
            Self::NoPrivateKey { path } =>
                write!(f, "개인키를 찾을 수 없음: {}", path.display()),
            Self::InvalidCa { path } =>
                write!(f, "유효하지 않은 CA 번들: {}", path.display()),
            Self::MissingClientCa =>
                write!(f, "클라이언트 인증서 검증에는 CA 번들이 필요합니다"),
            Self::Config(e) => write!(f, "TLS 설정 오류: {}", e),
        }
    }
}

impl std::error::Error for TlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileError { error, .. } => Some(error),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

pub fn load_acceptor(material: &TlsMaterial) -> Result<TlsAcceptor, TlsError> {
    let config = load_server_config(material)?;
    info!(
        cert = %material.cert_path.display(),
        client_auth = material.require_client_cert,
        "TLS 설정 로드 완료"
    );
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_server_config(material: &TlsMaterial) -> Result<rustls::ServerConfig, TlsError> {
    let client_roots = material
        .ca_path
        .as_deref()
        .map(load_client_roots)
        .transpose()?;
    let certs = load_certs(&material.cert_path)?;
    let key = load_private_key(&material.key_path)?;

    let builder = rustls::ServerConfig::builder().with_safe_defaults();
    let builder = match (material.require_client_cert, client_roots) {
        (true, Some(roots)) => {
            builder.with_client_cert_verifier(Arc::new(AllowAnyAuthenticatedClient::new(roots)))
        }
        (true, None) => return Err(TlsError::MissingClientCa),
        (false, _) => builder.with_no_client_auth(),
    };

    let mut config = builder
        .with_single_cert(certs, key)
        .map_err(TlsError::Config)?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(config)
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|error| TlsError::FileError {
            path: path.to_path_buf(),
            error,
        })
}

fn read_certs(path: &Path) -> Result<Vec<Vec<u8>>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::certs(&mut reader).map_err(|error| TlsError::FileError {
        path: path.to_path_buf(),
        error,
    })
}

fn load_client_roots(path: &Path) -> Result<RootCertStore, TlsError> {
    let ders = read_certs(path)?;
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(&ders);
    debug!(path = %path.display(), added, ignored, "클라이언트 CA 로드");

    if added == 0 {
        return Err(TlsError::InvalidCa {
            path: path.to_path_buf(),
        });
    }
    Ok(roots)
}

fn load_certs(path: &Path) -> Result<Vec<Certificate>, TlsError> {
    let certs: Vec<Certificate> = read_certs(path)?.into_iter().map(Certificate).collect();
    if certs.is_empty() {
        return Err(TlsError::NoCertificates {
            path: path.to_path_buf(),
        });
    }
    Ok(certs)
}

// PKCS#8, PKCS#1(RSA), SEC1(EC) 형식 모두 허용
fn load_private_key(path: &Path) -> Result<PrivateKey, TlsError> {
    let mut reader = open(path)?;
    let items = rustls_pemfile::read_all(&mut reader).map_err(|error| TlsError::FileError {
        path: path.to_path_buf(),
        error,
    })?;

    items
        .into_iter()
        .find_map(|item| match item {
            rustls_pemfile::Item::PKCS8Key(key)
            | rustls_pemfile::Item::RSAKey(key)
            | rustls_pemfile::Item::ECKey(key) => Some(PrivateKey(key)),
            _ => None,
        })
        .ok_or_else(|| TlsError::NoPrivateKey {
            path: path.to_path_buf(),
        })
}
