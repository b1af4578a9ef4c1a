use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 单条DNS查询的失败原因
///
/// 候选域名的逐类型查询会吸收这两种错误；只有泛解析探测需要区分它们。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// NXDOMAIN 或者该类型下没有记录
    #[error("no records found")]
    NotFound,
    /// 超时、SERVFAIL、网络错误等
    #[error("lookup failed: {0}")]
    Failed(String),
}

/// 扫描过程中会向上传播的错误
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid or empty domain specified: {0:?}")]
    InvalidDomain(String),

    #[error("cannot open wordlist {}: {source}", path.display())]
    Wordlist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid worker count: {0}")]
    InvalidWorkerCount(usize),

    #[error("invalid resolver address: {0}")]
    InvalidResolver(String),

    #[error("wildcard probe failed: {0}")]
    Wildcard(#[from] LookupError),

    #[error("export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
