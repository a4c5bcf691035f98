use std::path::Path;

use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, span, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use crate::settings::{LogFormat, LogOutput, LogSettings};

/// 전역 로거를 초기화합니다.
///
/// `RUST_LOG`가 설정되어 있으면 설정 파일의 로그 레벨보다 우선합니다.
/// 반환되는 guard가 drop되면 남은 로그를 비우므로 프로세스가 끝날 때까지 유지해야 합니다.
pub fn init_logging(settings: &LogSettings) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str().to_lowercase()));

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| "sockproxy.log".as_ref());
            tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::new(Rfc3339))
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true);

    match settings.format {
        LogFormat::Text => builder.with_ansi(matches!(settings.output, LogOutput::Stdout)).init(),
        LogFormat::Json => builder.json().init(),
    }

    guard
}

#[derive(Debug)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub host: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub backend: Option<String>,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(request_id: String) -> Self {
        debug!(request_id = %request_id, "Creating new request log");
        Self {
            request_id,
            method: String::new(),
            path: String::new(),
            host: String::new(),
            status_code: 0,
            duration_ms: 0,
            backend: None,
            error: None,
        }
    }

    pub fn with_request<B>(&mut self, req: &hyper::Request<B>) {
        self.method = req.method().to_string();
        self.path = req.uri().path().to_string();
        if let Some(host) = req.headers().get(hyper::header::HOST) {
            self.host = host.to_str().unwrap_or_default().to_string();
        }

        debug!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            host = %self.host,
            "Received request"
        );
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
    }

    pub fn with_backend(&mut self, backend: &str) {
        self.backend = Some(backend.to_string());
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        let error_msg = error.to_string();
        error!(
            request_id = %self.request_id,
            error = %error_msg,
            "Request error occurred"
        );
        self.error = Some(error_msg);
    }
}

pub fn log_request(log: &RequestLog) {
    let level = if log.error.is_some() {
        Level::ERROR
    } else if log.status_code >= 400 {
        Level::WARN
    } else {
        Level::INFO
    };

    let span = span!(
        Level::INFO,
        "request",
        request_id = %log.request_id,
        method = %log.method,
        path = %log.path,
        host = %log.host,
        status = %log.status_code,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(
            backend = ?log.backend,
            error = ?log.error,
            "Request failed"
        ),
        Level::WARN => warn!(
            backend = ?log.backend,
            "Request completed with warning"
        ),
        _ => info!(
            backend = ?log.backend,
            "Request completed successfully"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_log_collects_fields() {
        let req = hyper::Request::builder()
            .method("POST")
            .uri("/containers/create?name=web")
            .header(hyper::header::HOST, "docker.local")
            .body(())
            .unwrap();

        let mut log = RequestLog::new("req-1".to_string());
        log.with_request(&req);
        log.with_backend("unix:///var/run/docker.sock");
        log.with_response(hyper::StatusCode::CREATED);

        assert_eq!(log.method, "POST");
        assert_eq!(log.path, "/containers/create");
        assert_eq!(log.host, "docker.local");
        assert_eq!(log.status_code, 201);
        assert_eq!(log.backend.as_deref(), Some("unix:///var/run/docker.sock"));
        assert!(log.error.is_none());

        log.with_error("connection refused");
        assert_eq!(log.error.as_deref(), Some("connection refused"));
    }
}
