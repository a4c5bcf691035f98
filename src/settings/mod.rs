use std::{env, fs, path::Path};
use serde::Deserialize;
use tracing::debug;

use crate::server::ListenerConfig;
use crate::target::TargetSpec;

mod server;
pub mod logging;
mod tls;
mod error;

pub use server::ServerSettings;
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use tls::TlsSettings;
pub use error::SettingsError;

pub type Result<T> = std::result::Result<T, SettingsError>;
pub use server::parse_env_var;

/// 시작 시 한 번 만들어지고 이후 변경되지 않는 전체 설정
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Settings {
    // 리스너/타겟 설정
    #[serde(default)]
    pub server: ServerSettings,

    // TLS 설정
    #[serde(default)]
    pub tls: TlsSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if let Ok(config_path) = env::var("PROXY_CONFIG_FILE") {
            Self::from_toml_file(&config_path)
        } else {
            Self::from_env()
        }
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        let settings: Self = toml::from_str(&content)
            .map_err(|e| SettingsError::ParseError { source: e })?;

        debug!(path = %path.as_ref().display(), "설정 파일 로드");
        Ok(settings)
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerSettings::from_env()?,
            tls: TlsSettings::from_env()?,
            logging: LogSettings::from_env()?,
        })
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.target()?;

        if self.server.https_enabled() {
            self.tls.validate()?;
        }

        Ok(())
    }

    pub fn target(&self) -> Result<TargetSpec> {
        let raw = self.server.target.as_deref().ok_or_else(|| SettingsError::EnvVarMissing {
            var_name: "target".to_string(),
        })?;
        Ok(TargetSpec::parse(raw)?)
    }

    /// 활성화된 리스너 목록 (평문 먼저, 그다음 TLS)
    pub fn listener_configs(&self) -> Vec<ListenerConfig> {
        let mut configs = Vec::new();

        if !self.server.http_addr.is_empty() {
            configs.push(ListenerConfig::plain(&self.server.http_addr));
        }

        if self.server.https_enabled() {
            configs.push(ListenerConfig::tls(&self.server.https_addr, self.tls.material()));
        }

        configs
    }
}
