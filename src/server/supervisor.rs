use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use super::listener::{BoundListener, ListenerConfig};
use super::Result;
use crate::proxy::ProxyHandler;

/// 설정된 모든 리스너를 같은 프록시 핸들러로 동시에 실행합니다.
///
/// 리스너 하나라도 실패하면 나머지를 중단하고 오류를 반환합니다.
/// 일부 리스너만 살아 있는 상태로는 동작하지 않습니다.
pub struct Supervisor {
    configs: Vec<ListenerConfig>,
}

impl Supervisor {
    pub fn new(configs: Vec<ListenerConfig>) -> Self {
        Self { configs }
    }

    /// 모든 TLS 자료를 먼저 읽고, 전부 성공한 뒤에 바인딩합니다.
    pub async fn bind(&self) -> Result<Vec<BoundListener>> {
        let prepared = self
            .configs
            .iter()
            .map(ListenerConfig::prepare)
            .collect::<Result<Vec<_>>>()?;

        let mut listeners = Vec::with_capacity(prepared.len());
        for listener in prepared {
            listeners.push(listener.bind().await?);
        }
        Ok(listeners)
    }

    pub async fn run(self, proxy: Arc<ProxyHandler>) -> Result<()> {
        if self.configs.is_empty() {
            return Ok(());
        }

        let listeners = self.bind().await?;
        serve(listeners, proxy).await
    }
}

/// 바인딩된 리스너들을 각각의 태스크로 실행하고 첫 번째 종료를 기다립니다.
pub async fn serve(listeners: Vec<BoundListener>, proxy: Arc<ProxyHandler>) -> Result<()> {
    if listeners.is_empty() {
        return Ok(());
    }

    info!(count = listeners.len(), backend = %proxy.backend(), "리스너 시작");

    let runs = listeners
        .into_iter()
        .map(|listener| listener.run(proxy.clone()))
        .collect();
    supervise(runs).await
}

// 어느 하나라도 끝나면 나머지를 중단
pub(super) async fn supervise<F>(runs: Vec<F>) -> Result<()>
where
    F: Future<Output = Result<Infallible>> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for run in runs {
        tasks.spawn(run);
    }

    let outcome = match tasks.join_next().await {
        Some(Ok(Ok(never))) => match never {},
        Some(Ok(Err(e))) => Err(e),
        Some(Err(e)) => Err(e.into()),
        None => Ok(()),
    };

    if let Err(e) = &outcome {
        error!(error = %e, "리스너 종료, 나머지 리스너를 중단합니다");
    }
    tasks.abort_all();

    outcome
}
