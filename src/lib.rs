//! # dnssearch
//!
//! 基于字典的子域名枚举工具库：固定数量的worker并发解析候选子域名，
//! 并用扫描前探测到的泛解析基线过滤误报。
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use dnssearch::{ScanConfig, ScanEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::new("example.com", "names.txt");
//!     let mut engine = ScanEngine::with_system_resolver(config)?;
//!
//!     if let Some(baseline) = engine.setup_wildcard_detection().await {
//!         println!("wildcard: {:?}", baseline.addresses());
//!     }
//!
//!     engine.run(|result| println!("{}", result.hostname)).await?;
//!     let stats = engine.stats();
//!     println!("{} requests, {} results", stats.requests, stats.results);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod dns_resolver;
pub mod error;
pub mod input;
pub mod logger;
pub mod output;
pub mod pool;
pub mod state;
pub mod structs;
pub mod wildcard;
pub mod wordlist;

// 重新导出主要的公共API
pub use api::{search_subdomains, ScanEngine, ScanOutcome};
pub use dns_resolver::{Classifier, DnsResolver, RecordLookup};
pub use error::{LookupError, Result, ScanError};
pub use input::{normalize_domain, OutputFormat, ScanConfig};
pub use output::{export_results, Formatter};
pub use pool::WorkerPool;
pub use state::{CancellationController, ScanState, ScanStats, StatsSnapshot};
pub use structs::{LookupOptions, LookupResult};
pub use wildcard::{detect_wildcard, WildcardBaseline};
pub use wordlist::CandidateSource;
