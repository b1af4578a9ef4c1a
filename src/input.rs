use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::warn;

use crate::error::{Result, ScanError};
use crate::structs::LookupOptions;

/// 输出格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    Txt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(format!("unsupported output format: {}. supported: json, csv, txt", s)),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dnssearch")]
#[command(version)]
#[command(about = "A subdomain enumeration tool", long_about = None, arg_required_else_help = true)]
pub struct Opts {
    /// base domain to start enumeration from
    #[arg(short, long)]
    pub domain: String,

    /// wordlist file to use for enumeration
    #[arg(short, long, default_value = "names.txt")]
    pub wordlist: PathBuf,

    /// number of concurrent consumers
    #[arg(short, long, default_value_t = 8)]
    pub consumers: usize,

    /// show A results
    #[arg(long = "a", default_value_t = true, action = ArgAction::Set)]
    pub search_a: bool,

    /// search for TXT records
    #[arg(long = "txt")]
    pub search_txt: bool,

    /// show CNAME results
    #[arg(long = "cname")]
    pub search_cname: bool,

    /// extract the registrable domain from the provided one
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub force_tld: bool,

    /// per-query timeout in seconds
    #[arg(long, default_value_t = 3)]
    pub timeout: u64,

    /// retries per query after the first attempt
    #[arg(long, default_value_t = 1)]
    pub retries: usize,

    /// nameserver IPs to use instead of the system configuration
    #[arg(short, long)]
    pub resolvers: Vec<String>,

    /// export results to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// export format (json, csv, txt)
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// only print discovered hostnames
    #[arg(short, long)]
    pub silent: bool,

    /// debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// 校验后的扫描配置，创建后不再修改
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub base_domain: String,
    pub wordlist: PathBuf,
    pub workers: usize,
    pub options: LookupOptions,
    pub timeout: Duration,
    pub retries: usize,
    pub resolvers: Vec<String>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub silent: bool,
}

impl ScanConfig {
    pub fn new(base_domain: impl Into<String>, wordlist: impl Into<PathBuf>) -> Self {
        ScanConfig {
            base_domain: base_domain.into(),
            wordlist: wordlist.into(),
            workers: 8,
            options: LookupOptions::default(),
            timeout: Duration::from_secs(3),
            retries: 1,
            resolvers: Vec::new(),
            output: None,
            format: OutputFormat::Json,
            silent: false,
        }
    }
}

impl Opts {
    /// 校验命令行参数并规范化域名
    pub fn into_config(self) -> Result<ScanConfig> {
        let base_domain = normalize_domain(&self.domain, self.force_tld)
            .ok_or_else(|| ScanError::InvalidDomain(self.domain.clone()))?;

        let workers = if self.consumers == 0 {
            warn!("consumers must be at least 1, using 1");
            1
        } else {
            self.consumers
        };

        let mut options = LookupOptions {
            a: self.search_a,
            txt: self.search_txt,
            cname: self.search_cname,
        };
        if !options.any() {
            warn!("no record type selected, searching A records");
            options.a = true;
        }

        Ok(ScanConfig {
            base_domain,
            wordlist: self.wordlist,
            workers,
            options,
            timeout: Duration::from_secs(self.timeout.max(1)),
            retries: self.retries,
            resolvers: self.resolvers,
            output: self.output,
            format: self.format,
            silent: self.silent,
        })
    }
}

// 常见的二级公共后缀，例如 co.uk、com.cn
const SECOND_LEVEL_LABELS: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu"];

/// 规范化用户输入的域名
///
/// 去掉协议、路径、端口和多余的点；`force_tld` 时只保留可注册域名部分。
pub fn normalize_domain(input: &str, force_tld: bool) -> Option<String> {
    let mut domain = input.trim().to_ascii_lowercase();
    if let Some(idx) = domain.find("://") {
        domain = domain[idx + 3..].to_string();
    }
    if let Some(idx) = domain.find(['/', '?', '#']) {
        domain.truncate(idx);
    }
    if let Some(idx) = domain.rfind(':') {
        domain.truncate(idx);
    }
    let domain = domain.trim_matches('.');

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.iter().any(|l| l.is_empty() || !is_valid_label(l)) {
        return None;
    }

    if !force_tld {
        return Some(domain.to_string());
    }
    if labels.len() < 2 {
        return None;
    }

    let n = labels.len();
    let keep = if n >= 3 && labels[n - 1].len() == 2 && SECOND_LEVEL_LABELS.contains(&labels[n - 2]) {
        3
    } else {
        2
    };
    Some(labels[n - keep..].join("."))
}

fn is_valid_label(label: &str) -> bool {
    label.len() <= 63
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
