use std::fmt;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
pub enum ProxyError {
    /// http 타겟 주소를 URL로 해석할 수 없음 (시작 시점 오류)
    InvalidUrl {
        url: String,
        reason: String,
    },
    /// 백엔드 연결 또는 응답 실패
    Backend(hyper_util::client::legacy::Error),
    /// 백엔드로 보낼 요청을 만들 수 없음
    Request(hyper::http::Error),
    /// 백엔드가 요청과 다른 프로토콜로 업그레이드를 응답
    UpgradeMismatch {
        requested: String,
        returned: String,
    },
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::InvalidUrl { url, reason } =>
                write!(f, "유효하지 않은 타겟 URL {}: {}", url, reason),
            ProxyError::Backend(e) => write!(f, "백엔드 요청 실패: {}", e),
            ProxyError::Request(e) => write!(f, "백엔드 요청 생성 실패: {}", e),
            ProxyError::UpgradeMismatch { requested, returned } =>
                write!(f, "업그레이드 프로토콜 불일치: 요청 {:?}, 백엔드 응답 {:?}", requested, returned),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Backend(e) => Some(e),
            ProxyError::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl From<hyper_util::client::legacy::Error> for ProxyError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        ProxyError::Backend(err)
    }
}

impl From<hyper::http::Error> for ProxyError {
    fn from(err: hyper::http::Error) -> Self {
        ProxyError::Request(err)
    }
}
