use serde::Deserialize;
use std::env;
use super::SettingsError;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    /// 평문 HTTP 바인드 주소 (빈 문자열이면 비활성화)
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// HTTPS 바인드 주소 (빈 문자열이면 비활성화)
    #[serde(default)]
    pub https_addr: String,

    /// 백엔드 타겟 (`http://`, `tcp://`, `unix://` 또는 `host:port`)
    #[serde(default)]
    pub target: Option<String>,
}

fn default_http_addr() -> String {
    ":80".to_string()
}

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            http_addr: parse_env_var("PROXY_HTTP_ADDR", default_http_addr)?,
            https_addr: parse_env_var("PROXY_HTTPS_ADDR", String::new)?,
            target: env::var("PROXY_TARGET").ok(),
        })
    }

    pub fn https_enabled(&self) -> bool {
        !self.https_addr.is_empty()
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        // 같은 주소에 두 리스너를 바인딩할 수 없음
        if !self.http_addr.is_empty() && self.http_addr == self.https_addr {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "http_addr/https_addr".to_string(),
                value: self.http_addr.clone(),
                reason: "HTTP와 HTTPS 주소는 달라야 합니다".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            https_addr: String::new(),
            target: None,
        }
    }
}
