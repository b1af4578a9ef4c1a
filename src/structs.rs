use serde::{Deserialize, Serialize};

/// 一个候选子域名的命中结果
///
/// 只有至少一种记录类型查到数据时才会构造，空结果用 `None` 表示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub txt_records: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
}

impl LookupResult {
    pub fn new(hostname: impl Into<String>) -> Self {
        LookupResult {
            hostname: hostname.into(),
            addresses: Vec::new(),
            txt_records: Vec::new(),
            cname: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.txt_records.is_empty() && self.cname.is_none()
    }
}

/// 需要查询的记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    pub a: bool,
    pub txt: bool,
    pub cname: bool,
}

impl LookupOptions {
    pub fn any(&self) -> bool {
        self.a || self.txt || self.cname
    }
}

impl Default for LookupOptions {
    fn default() -> Self {
        LookupOptions {
            a: true,
            txt: false,
            cname: false,
        }
    }
}
