//! sockproxy는 HTTP(S) 요청을 단일 백엔드로 전달하는 리버스 프록시입니다.
//!
//! 백엔드는 HTTP 서버, TCP 주소, 또는 유닉스 도메인 소켓일 수 있어서
//! `/var/run/docker.sock` 처럼 소켓으로만 열려 있는 데몬을 HTTP/HTTPS로 노출할 수 있습니다.
//!
//! # 주요 기능
//!
//! - `http://`, `tcp://`, `unix://` 타겟
//! - 평문 HTTP와 상호 TLS(mTLS) 리스너 동시 실행
//! - 리스너 하나라도 실패하면 전체 프로세스 종료
//!
//! # 예제
//!
//! ```
//! use sockproxy::target::{TargetSpec, TransportKind};
//!
//! let target = TargetSpec::parse("unix:///var/run/docker.sock").unwrap();
//! assert_eq!(target.kind(), TransportKind::Unix);
//! assert_eq!(target.address(), "/var/run/docker.sock");
//!
//! // 스킴이 없으면 tcp
//! let target = TargetSpec::parse("127.0.0.1:2375").unwrap();
//! assert_eq!(target.kind(), TransportKind::Tcp);
//! ```
//!
//! # 리스너 실행
//!
//! ```no_run
//! use std::sync::Arc;
//! use sockproxy::{proxy::ProxyHandler, server::{ListenerConfig, Supervisor}, target::TargetSpec};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let target = TargetSpec::parse("tcp://127.0.0.1:2375")?;
//! let proxy = Arc::new(ProxyHandler::new(&target)?);
//!
//! Supervisor::new(vec![ListenerConfig::plain(":8080")])
//!     .run(proxy)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod logging;
pub mod proxy;
pub mod server;
pub mod settings;
pub mod target;
pub mod tls;
