use crate::tls::TlsError;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// TLS 인증서/키/CA 로드 실패
    TlsError {
        addr: String,
        error: TlsError,
    },
    BindError {
        addr: String,
        error: std::io::Error,
    },
    /// 더 이상 연결을 받을 수 없는 accept 오류
    AcceptError {
        addr: String,
        error: std::io::Error,
    },
    /// 리스너 태스크가 패닉 또는 취소로 종료됨
    JoinError(tokio::task::JoinError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TlsError { addr, error } => write!(f, "TLS Error on {}: {}", addr, error),
            Error::BindError { addr, error } => write!(f, "Bind Error on {}: {}", addr, error),
            Error::AcceptError { addr, error } => write!(f, "Accept Error on {}: {}", addr, error),
            Error::JoinError(e) => write!(f, "Listener task failed: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::TlsError { error, .. } => Some(error),
            Error::BindError { error, .. } | Error::AcceptError { error, .. } => Some(error),
            Error::JoinError(e) => Some(e),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::JoinError(err)
    }
}
