use std::future::Future;
use std::sync::Arc;

use log::{debug, error};
use tokio::task::JoinHandle;

use crate::error::{Result, ScanError};
use crate::state::{CancellationController, ScanStats};
use crate::structs::LookupResult;
use crate::wordlist::CandidateSource;

/// 固定数量的解析worker
///
/// 每个worker反复从共享字典取下一个候选、解析、把非空结果交给回调，
/// 直到字典读完或者收到中断。
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// 启动所有worker后立即返回，不等待完成
    pub fn start<R, Fut, S>(
        workers: usize,
        source: Arc<CandidateSource>,
        stats: Arc<ScanStats>,
        controller: Arc<CancellationController>,
        resolve: R,
        on_result: S,
    ) -> Result<Self>
    where
        R: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<LookupResult>> + Send + 'static,
        S: Fn(LookupResult) + Send + Sync + 'static,
    {
        if workers == 0 {
            return Err(ScanError::InvalidWorkerCount(workers));
        }

        let resolve = Arc::new(resolve);
        let on_result = Arc::new(on_result);

        let handles = (0..workers)
            .map(|id| {
                let source = source.clone();
                let stats = stats.clone();
                let controller = controller.clone();
                let resolve = resolve.clone();
                let on_result = on_result.clone();

                tokio::spawn(async move {
                    let mut handled = 0u64;
                    while controller.is_running() {
                        let Some(candidate) = source.next_candidate().await else {
                            break;
                        };
                        // 等锁期间可能已经收到中断，此时不再派发
                        if !controller.is_running() {
                            break;
                        }

                        stats.record_attempt();
                        handled += 1;
                        if let Some(result) = resolve(candidate).await {
                            stats.record_result();
                            on_result(result);
                        }
                    }
                    debug!("worker {} exited after {} candidates", id, handled);
                })
            })
            .collect();

        Ok(WorkerPool { handles })
    }

    /// 等待所有worker退出（字典读完或中断后排空）
    pub async fn wait(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("worker task failed: {}", e);
            }
        }
    }
}
