use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{trace, warn};
use trust_dns_resolver::config::*;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::{LookupError, Result, ScanError};
use crate::structs::{LookupOptions, LookupResult};
use crate::wildcard::WildcardBaseline;

/// DNS查询接口
///
/// 每种记录类型独立查询，没有内部可变状态，可以被多个worker并发调用。
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// A记录，按应答顺序返回地址字符串
    async fn lookup_a(&self, host: &str) -> std::result::Result<Vec<String>, LookupError>;

    /// TXT记录，每条记录的字符串片段拼接为一项
    async fn lookup_txt(&self, host: &str) -> std::result::Result<Vec<String>, LookupError>;

    /// CNAME记录的目标，已去掉结尾的点
    async fn lookup_cname(&self, host: &str) -> std::result::Result<Option<String>, LookupError>;
}

/// 基于 trust-dns 的解析器
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
    deadline: Duration,
}

impl DnsResolver {
    /// `nameservers` 为空时使用系统配置，读取失败再退回库的默认配置
    ///
    /// `retries` 是首次查询之外的重试次数。
    pub fn new(timeout: Duration, retries: usize, nameservers: &[String]) -> Result<Self> {
        let mut options = ResolverOpts::default();
        options.timeout = timeout;
        options.attempts = query_attempts(retries);

        let config = if nameservers.is_empty() {
            match trust_dns_resolver::system_conf::read_system_conf() {
                Ok((config, _)) => config,
                Err(e) => {
                    warn!("cannot read system resolver configuration ({}), using defaults", e);
                    ResolverConfig::default()
                }
            }
        } else {
            let ips = parse_nameservers(nameservers)?;
            ResolverConfig::from_parts(
                None,
                vec![],
                NameServerConfigGroup::from_ips_clear(&ips, 53, true),
            )
        };

        // 库内部的重试之外再加一层总超时，保证单个名称不会卡住worker
        let rounds = u32::try_from(options.attempts).unwrap_or(u32::MAX).saturating_add(1);
        let deadline = timeout.saturating_mul(rounds);

        Ok(DnsResolver {
            resolver: TokioAsyncResolver::tokio(config, options),
            deadline,
        })
    }

    async fn query(&self, host: &str, record_type: RecordType) -> std::result::Result<Vec<RData>, LookupError> {
        let name = fqdn(host);
        let lookup = tokio::time::timeout(self.deadline, self.resolver.lookup(name, record_type))
            .await
            .map_err(|_| LookupError::Failed("timeout".to_string()))?
            .map_err(map_error)?;

        Ok(lookup.iter().cloned().collect())
    }
}

#[async_trait]
impl RecordLookup for DnsResolver {
    async fn lookup_a(&self, host: &str) -> std::result::Result<Vec<String>, LookupError> {
        let addresses: Vec<String> = self
            .query(host, RecordType::A)
            .await?
            .into_iter()
            .filter_map(|record| match record {
                RData::A(ip) => Some(ip.to_string()),
                _ => None,
            })
            .collect();

        if addresses.is_empty() {
            return Err(LookupError::NotFound);
        }
        Ok(addresses)
    }

    async fn lookup_txt(&self, host: &str) -> std::result::Result<Vec<String>, LookupError> {
        let records: Vec<String> = self
            .query(host, RecordType::TXT)
            .await?
            .into_iter()
            .filter_map(|record| match record {
                RData::TXT(txt) => Some(
                    txt.iter()
                        .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                        .collect::<Vec<_>>()
                        .join(""),
                ),
                _ => None,
            })
            .collect();

        if records.is_empty() {
            return Err(LookupError::NotFound);
        }
        Ok(records)
    }

    async fn lookup_cname(&self, host: &str) -> std::result::Result<Option<String>, LookupError> {
        let cname = self
            .query(host, RecordType::CNAME)
            .await?
            .into_iter()
            .find_map(|record| match record {
                RData::CNAME(cname) => Some(cname.to_string().trim_end_matches('.').to_string()),
                _ => None,
            });
        Ok(cname)
    }
}

fn query_attempts(retries: usize) -> usize {
    retries.saturating_add(1)
}

fn map_error(err: ResolveError) -> LookupError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => LookupError::NotFound,
        _ => LookupError::Failed(err.to_string()),
    }
}

/// 补上结尾的点，避免解析器追加搜索域
fn fqdn(host: &str) -> String {
    format!("{}.", host.trim_end_matches('.'))
}

fn parse_nameservers(nameservers: &[String]) -> Result<Vec<IpAddr>> {
    nameservers
        .iter()
        .map(|server| {
            server
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ScanError::InvalidResolver(server.clone()))
        })
        .collect()
}

fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// 单个候选域名的解析与分类
///
/// 泛解析基线在构造时固定，之后只读。
pub struct Classifier {
    lookup: Arc<dyn RecordLookup>,
    base_domain: String,
    options: LookupOptions,
    baseline: Option<WildcardBaseline>,
}

impl Classifier {
    pub fn new(
        lookup: Arc<dyn RecordLookup>,
        base_domain: impl Into<String>,
        options: LookupOptions,
        baseline: Option<WildcardBaseline>,
    ) -> Self {
        Classifier {
            lookup,
            base_domain: base_domain.into(),
            options,
            baseline,
        }
    }

    pub fn hostname(&self, candidate: &str) -> String {
        format!("{}.{}", candidate, self.base_domain)
    }

    pub async fn resolve(&self, candidate: &str) -> Option<LookupResult> {
        self.classify(self.hostname(candidate)).await
    }

    /// 查询启用的记录类型并分类
    ///
    /// A记录与泛解析基线相同时整个结果丢弃，其他记录类型也不保留。
    /// 所有查询错误都视为"不存在"。
    pub async fn classify(&self, hostname: String) -> Option<LookupResult> {
        let mut result = LookupResult::new(hostname);

        if self.options.a {
            match self.lookup.lookup_a(&result.hostname).await {
                Ok(addresses) => {
                    if let Some(baseline) = &self.baseline {
                        if baseline.matches(&addresses) {
                            trace!("{} matches wildcard baseline, skipped", result.hostname);
                            return None;
                        }
                    }
                    result.addresses = addresses;
                }
                Err(e) => trace!("A {}: {}", result.hostname, e),
            }
        }

        if self.options.txt {
            match self.lookup.lookup_txt(&result.hostname).await {
                Ok(records) => result.txt_records = records,
                Err(e) => trace!("TXT {}: {}", result.hostname, e),
            }
        }

        if self.options.cname {
            match self.lookup.lookup_cname(&result.hostname).await {
                Ok(Some(cname)) if normalize_name(&cname) != normalize_name(&result.hostname) => {
                    result.cname = Some(cname);
                }
                Ok(_) => {}
                Err(e) => trace!("CNAME {}: {}", result.hostname, e),
            }
        }

        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }
}
