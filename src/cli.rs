use std::path::PathBuf;

use clap::Parser;

use crate::settings::{logging::parse_log_level, Settings, SettingsError};

const TARGET_HELP: &str = "--target=http://example.com\n--target=tcp://127.0.0.1:80\n--target=unix:///var/run/docker.sock";

/// 명령행 옵션. 지정된 값만 설정 파일/환경 변수 값을 덮어씁니다.
#[derive(Debug, Default, Parser)]
#[command(name = "sockproxy", version, about = "HTTP(S) front end for a single HTTP, TCP or unix socket backend")]
pub struct Cli {
    /// 평문 HTTP 바인드 주소 (빈 값이면 비활성화)
    #[arg(long = "http_addr", value_name = "ADDR")]
    pub http_addr: Option<String>,

    /// HTTPS 바인드 주소 (빈 값이면 비활성화)
    #[arg(long = "https_addr", value_name = "ADDR")]
    pub https_addr: Option<String>,

    #[arg(long, value_name = "TARGET", long_help = TARGET_HELP)]
    pub target: Option<String>,

    /// 클라이언트 인증서 CA 번들 (빈 값이면 사용하지 않음)
    #[arg(long = "tls_ca", value_name = "PATH")]
    pub tls_ca: Option<String>,

    #[arg(long = "tls_cert", value_name = "PATH")]
    pub tls_cert: Option<PathBuf>,

    #[arg(long = "tls_key", value_name = "PATH")]
    pub tls_key: Option<PathBuf>,

    /// 클라이언트 인증서 요구 여부 (`--tls_client_auth=false`로 끔)
    #[arg(long = "tls_client_auth", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub tls_client_auth: Option<bool>,

    /// TOML 설정 파일
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long = "log_level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[arg(long = "log_format", value_name = "FORMAT")]
    pub log_format: Option<String>,
}

impl Cli {
    /// 설정 파일(또는 환경 변수) 위에 명령행 값을 덮어써 최종 설정을 만듭니다.
    pub fn into_settings(self) -> Result<Settings, SettingsError> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_toml_file(path)?,
            None => Settings::load()?,
        };
        self.apply(&mut settings)?;
        Ok(settings)
    }

    fn apply(self, settings: &mut Settings) -> Result<(), SettingsError> {
        if let Some(addr) = self.http_addr {
            settings.server.http_addr = addr;
        }
        if let Some(addr) = self.https_addr {
            settings.server.https_addr = addr;
        }
        if let Some(target) = self.target {
            settings.server.target = Some(target);
        }
        if let Some(path) = self.tls_ca {
            settings.tls.ca_path = PathBuf::from(path);
        }
        if let Some(path) = self.tls_cert {
            settings.tls.cert_path = path;
        }
        if let Some(path) = self.tls_key {
            settings.tls.key_path = path;
        }
        if let Some(client_auth) = self.tls_client_auth {
            settings.tls.client_auth = client_auth;
        }
        if let Some(level) = self.log_level {
            settings.logging.level = parse_log_level("--log_level", &level)?;
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format.parse().map_err(|reason| SettingsError::EnvVarInvalid {
                var_name: "--log_format".to_string(),
                value: format.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}
