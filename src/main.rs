use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use sockproxy::cli::Cli;
use sockproxy::logging::init_logging;
use sockproxy::proxy::ProxyHandler;
use sockproxy::server::Supervisor;
use tracing::{error, info};

const USAGE_ERROR: u8 = 2;

fn usage() -> ExitCode {
    let _ = Cli::command().print_help();
    ExitCode::from(USAGE_ERROR)
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Cli::parse().into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            return ExitCode::from(USAGE_ERROR);
        }
    };

    if settings.server.target.as_deref().map_or(true, str::is_empty) {
        return usage();
    }

    if let Err(e) = settings.validate() {
        eprintln!("설정 검증 실패: {}", e);
        return ExitCode::from(USAGE_ERROR);
    }

    // 로그 guard는 main이 끝날 때까지 유지
    let _log_guard = init_logging(&settings.logging);

    let target = match settings.target() {
        Ok(target) => target,
        Err(e) => {
            error!(error = %e, "타겟 파싱 실패");
            return ExitCode::from(USAGE_ERROR);
        }
    };

    let proxy = match ProxyHandler::new(&target) {
        Ok(proxy) => Arc::new(proxy),
        Err(e) => {
            error!(error = %e, "프록시 생성 실패");
            return ExitCode::FAILURE;
        }
    };

    let listeners = settings.listener_configs();
    if listeners.is_empty() {
        error!("http_addr와 https_addr가 모두 비어 있습니다");
        return usage();
    }

    info!(backend = %proxy.backend(), listeners = listeners.len(), "프록시 시작");

    match Supervisor::new(listeners).run(proxy).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "리스너 실패로 프로세스를 종료합니다");
            ExitCode::FAILURE
        }
    }
}
