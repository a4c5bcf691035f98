use std::path::PathBuf;
use directories::BaseDirs;
use serde::Deserialize;
use super::{server::parse_env_var, SettingsError};
use crate::tls::TlsMaterial;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TlsSettings {
    /// 클라이언트 인증서 CA 번들 (빈 경로면 사용하지 않음)
    #[serde(default = "default_ca_path")]
    pub ca_path: PathBuf,

    /// 서버 인증서 파일 경로
    #[serde(default = "default_cert_path")]
    pub cert_path: PathBuf,

    /// 개인키 파일 경로
    #[serde(default = "default_key_path")]
    pub key_path: PathBuf,

    /// 클라이언트 인증서 요구 여부
    #[serde(default = "default_client_auth")]
    pub client_auth: bool,
}

impl TlsSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            ca_path: parse_env_var("PROXY_TLS_CA", default_ca_path)?,
            cert_path: parse_env_var("PROXY_TLS_CERT", default_cert_path)?,
            key_path: parse_env_var("PROXY_TLS_KEY", default_key_path)?,
            client_auth: parse_env_var("PROXY_TLS_CLIENT_AUTH", default_client_auth)?,
        })
    }

    /// HTTPS 리스너를 켤 때 필요한 값 검증
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.cert_path.as_os_str().is_empty() {
            return Err(SettingsError::EnvVarMissing {
                var_name: "tls_cert".to_string(),
            });
        }

        if self.key_path.as_os_str().is_empty() {
            return Err(SettingsError::EnvVarMissing {
                var_name: "tls_key".to_string(),
            });
        }

        Ok(())
    }

    pub fn material(&self) -> TlsMaterial {
        let ca_path = Some(self.ca_path.clone()).filter(|path| !path.as_os_str().is_empty());
        TlsMaterial {
            ca_path,
            cert_path: self.cert_path.clone(),
            key_path: self.key_path.clone(),
            require_client_cert: self.client_auth,
        }
    }
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            ca_path: default_ca_path(),
            cert_path: default_cert_path(),
            key_path: default_key_path(),
            client_auth: default_client_auth(),
        }
    }
}

// docker 데몬 TLS 설정과 같은 위치 (~/.docker)
fn docker_config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".docker"))
        .unwrap_or_else(|| PathBuf::from(".docker"))
}

fn default_ca_path() -> PathBuf {
    docker_config_dir().join("ca.pem")
}

fn default_cert_path() -> PathBuf {
    docker_config_dir().join("server-cert.pem")
}

fn default_key_path() -> PathBuf {
    docker_config_dir().join("server-key.pem")
}

fn default_client_auth() -> bool {
    true
}
