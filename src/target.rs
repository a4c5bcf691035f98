use std::fmt;
use std::str::FromStr;

const SCHEME_SEPARATOR: &str = "://";

/// 백엔드에 연결하는 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Tcp,
    Unix,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::Tcp => "tcp",
            TransportKind::Unix => "unix",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "http" => Some(TransportKind::Http),
            "tcp" => Some(TransportKind::Tcp),
            "unix" => Some(TransportKind::Unix),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// `http`, `tcp`, `unix` 이외의 스킴
    UnsupportedScheme { raw: String },
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetError::UnsupportedScheme { raw } => write!(f, "unsupported target {}", raw),
        }
    }
}

impl std::error::Error for TargetError {}

/// 프록시가 모든 요청을 전달할 단일 백엔드.
///
/// `http` 타겟은 나중에 URL로 다시 파싱되므로 원본 문자열 전체를 주소로 유지합니다.
/// `tcp`/`unix` 타겟은 `://` 뒤의 나머지를 그대로 주소로 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    kind: TransportKind,
    address: String,
}

impl TargetSpec {
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let Some(pos) = raw.find(SCHEME_SEPARATOR) else {
            return Ok(Self {
                kind: TransportKind::Tcp,
                address: raw.to_string(),
            });
        };

        let kind = TransportKind::from_token(&raw[..pos]).ok_or_else(|| {
            TargetError::UnsupportedScheme {
                raw: raw.to_string(),
            }
        })?;

        let address = match kind {
            TransportKind::Http => raw,
            TransportKind::Tcp | TransportKind::Unix => &raw[pos + SCHEME_SEPARATOR.len()..],
        };

        Ok(Self {
            kind,
            address: address.to_string(),
        })
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportKind::Http => f.write_str(&self.address),
            kind => write!(f, "{}{}{}", kind, SCHEME_SEPARATOR, self.address),
        }
    }
}
