use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::dns_resolver::{Classifier, DnsResolver, RecordLookup};
use crate::error::Result;
use crate::input::ScanConfig;
use crate::pool::WorkerPool;
use crate::state::{CancellationController, ScanState, ScanStats, StatsSnapshot};
use crate::structs::LookupResult;
use crate::wildcard::{detect_wildcard, WildcardBaseline};
use crate::wordlist::CandidateSource;

/// 扫描结束的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Interrupted,
}

/// 子域名扫描引擎
///
/// 一个实例对应一次扫描：先做泛解析检测，再用固定数量的worker跑完字典。
pub struct ScanEngine {
    config: ScanConfig,
    lookup: Arc<dyn RecordLookup>,
    baseline: Option<WildcardBaseline>,
    stats: Arc<ScanStats>,
    controller: Arc<CancellationController>,
    final_stats: OnceLock<StatsSnapshot>,
    outcome: OnceLock<ScanOutcome>,
    started: Instant,
}

impl ScanEngine {
    pub fn new(config: ScanConfig, lookup: Arc<dyn RecordLookup>) -> Self {
        ScanEngine {
            config,
            lookup,
            baseline: None,
            stats: Arc::new(ScanStats::new()),
            controller: Arc::new(CancellationController::new()),
            final_stats: OnceLock::new(),
            outcome: OnceLock::new(),
            started: Instant::now(),
        }
    }

    /// 使用系统（或配置里指定的）DNS服务器创建引擎
    pub fn with_system_resolver(config: ScanConfig) -> Result<Self> {
        let resolver = DnsResolver::new(config.timeout, config.retries, &config.resolvers)?;
        Ok(Self::new(config, Arc::new(resolver)))
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn controller(&self) -> Arc<CancellationController> {
        self.controller.clone()
    }

    pub fn baseline(&self) -> Option<&WildcardBaseline> {
        self.baseline.as_ref()
    }

    /// 在启动worker之前探测一次泛解析
    ///
    /// 探测出错时按"没有泛解析"继续扫描，并记录警告。
    pub async fn setup_wildcard_detection(&mut self) -> Option<&WildcardBaseline> {
        self.started = Instant::now();
        self.baseline = match detect_wildcard(&*self.lookup, &self.config.base_domain).await {
            Ok(baseline) => baseline,
            Err(e) => {
                warn!(
                    "wildcard detection for {} failed ({}), assuming no wildcard",
                    self.config.base_domain, e
                );
                None
            }
        };
        self.baseline.as_ref()
    }

    /// 运行扫描直到字典读完或被中断
    ///
    /// 每个引擎只扫描一次，结束后再调用直接返回第一次的结果。
    pub async fn run<S>(&self, on_result: S) -> Result<ScanOutcome>
    where
        S: Fn(LookupResult) + Send + Sync + 'static,
    {
        if let Some(outcome) = self.outcome.get() {
            debug!("scan already finished ({:?}), not restarting", outcome);
            return Ok(*outcome);
        }

        let source = Arc::new(CandidateSource::open(&self.config.wordlist).await?);
        let classifier = Arc::new(Classifier::new(
            self.lookup.clone(),
            self.config.base_domain.clone(),
            self.config.options,
            self.baseline.clone(),
        ));

        info!(
            "scanning {} with {} workers using {}",
            self.config.base_domain,
            self.config.workers,
            self.config.wordlist.display()
        );

        let pool = WorkerPool::start(
            self.config.workers,
            source,
            self.stats.clone(),
            self.controller.clone(),
            move |candidate: String| {
                let classifier = classifier.clone();
                async move { classifier.resolve(&candidate).await }
            },
            on_result,
        )?;
        pool.wait().await;

        let outcome = *self.outcome.get_or_init(|| match self.controller.terminate() {
            ScanState::Running => ScanOutcome::Completed,
            _ => ScanOutcome::Interrupted,
        });
        let stats = self.finish();
        debug!("scan {:?}: {:?}", outcome, stats);
        Ok(outcome)
    }

    /// 运行扫描并把结果收集起来返回
    pub async fn collect(&self) -> Result<(ScanOutcome, Vec<LookupResult>)> {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = results.clone();
        let outcome = self
            .run(move |result| {
                if let Ok(mut results) = sink.lock() {
                    results.push(result);
                }
            })
            .await?;

        let results = match results.lock() {
            Ok(mut results) => std::mem::take(&mut *results),
            Err(_) => Vec::new(),
        };
        Ok((outcome, results))
    }

    /// 最终统计只记录一次，之后的调用返回同一个快照
    fn finish(&self) -> StatsSnapshot {
        *self.final_stats.get_or_init(|| self.stats.snapshot())
    }

    /// 扫描结束后返回最终统计，扫描中返回实时快照
    pub fn stats(&self) -> StatsSnapshot {
        match self.final_stats.get() {
            Some(stats) => *stats,
            None => self.stats.snapshot(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// 便捷函数：使用系统解析器扫描并返回所有结果
pub async fn search_subdomains(config: ScanConfig) -> Result<Vec<LookupResult>> {
    let mut engine = ScanEngine::with_system_resolver(config)?;
    engine.setup_wildcard_detection().await;
    let (_, results) = engine.collect().await?;
    Ok(results)
}
