//! 线程安全的扫描状态
//!
//! 扫描统计和取消控制都属于一次扫描会话，通过 `Arc` 显式传给各个worker，
//! 不使用全局静态变量。

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use serde::Serialize;

/// 某一时刻的统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub results: u64,
}

/// 扫描统计：发出的请求数和命中的结果数
///
/// worker 先增加请求数再解析，命中后才增加结果数；
/// 快照先读结果数再读请求数，所以读到的请求数永远不小于结果数。
#[derive(Debug, Default)]
pub struct ScanStats {
    requests: AtomicU64,
    results: AtomicU64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_result(&self) {
        self.results.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let results = self.results.load(Ordering::SeqCst);
        let requests = self.requests.load(Ordering::SeqCst);
        StatsSnapshot { requests, results }
    }
}

/// 扫描生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Running,
    Interrupting,
    Terminated,
}

impl ScanState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ScanState::Running,
            1 => ScanState::Interrupting,
            _ => ScanState::Terminated,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ScanState::Running => 0,
            ScanState::Interrupting => 1,
            ScanState::Terminated => 2,
        }
    }
}

/// 取消控制器：Running -> Interrupting -> Terminated
///
/// worker 在每次取候选之前检查状态；正在进行的查询会完成，但不会再取新的候选。
#[derive(Debug)]
pub struct CancellationController {
    state: AtomicU8,
}

impl CancellationController {
    pub fn new() -> Self {
        CancellationController {
            state: AtomicU8::new(ScanState::Running.as_u8()),
        }
    }

    pub fn state(&self) -> ScanState {
        ScanState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ScanState::Running
    }

    /// 请求中断；只有第一次从 Running 切换时返回 `true`
    pub fn interrupt(&self) -> bool {
        self.state
            .compare_exchange(
                ScanState::Running.as_u8(),
                ScanState::Interrupting.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// 进入终止状态，返回终止前的状态
    pub fn terminate(&self) -> ScanState {
        ScanState::from_u8(self.state.swap(ScanState::Terminated.as_u8(), Ordering::SeqCst))
    }
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new()
    }
}
