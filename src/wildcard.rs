use std::collections::BTreeSet;

use log::{debug, info};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::dns_resolver::RecordLookup;
use crate::error::LookupError;

/// 泛解析基线：随机子域名解析出来的地址集合
///
/// 扫描开始前生成一次，之后只读，所有worker共享。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardBaseline {
    addresses: Vec<String>,
}

impl WildcardBaseline {
    pub fn new(addresses: Vec<String>) -> Self {
        WildcardBaseline { addresses }
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// 按集合比较，DNS应答顺序变化或重复的地址不影响判断
    pub fn matches(&self, addresses: &[String]) -> bool {
        if self.addresses.is_empty() {
            return false;
        }
        let baseline: BTreeSet<&str> = self.addresses.iter().map(String::as_str).collect();
        let answer: BTreeSet<&str> = addresses.iter().map(String::as_str).collect();
        baseline == answer
    }
}

/// 生成探测用的随机标签：16字节密码学随机数的十六进制
pub fn random_label() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 检测基础域名是否存在泛解析
///
/// 返回 `Ok(None)` 表示随机名称不存在（正常情况），`Ok(Some(..))` 表示存在泛解析，
/// 其他解析错误原样返回，由调用方决定如何处理。
pub async fn detect_wildcard(
    lookup: &dyn RecordLookup,
    base_domain: &str,
) -> Result<Option<WildcardBaseline>, LookupError> {
    let probe = format!("{}.{}", random_label(), base_domain);
    debug!("probing wildcard with {}", probe);

    match lookup.lookup_a(&probe).await {
        Ok(addresses) if addresses.is_empty() => Ok(None),
        Ok(addresses) => {
            info!("wildcard DNS detected for {}: {:?}", base_domain, addresses);
            Ok(Some(WildcardBaseline::new(addresses)))
        }
        Err(LookupError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}
