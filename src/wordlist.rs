use std::borrow::Cow;
use std::path::Path;

use log::{debug, warn};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use crate::error::{Result, ScanError};

type LineReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// 字典读取器：按文件顺序惰性产出候选子域名
///
/// 多个worker共享同一个游标，每一行只会交给一个worker。
/// 按原始字节读取，非UTF-8的行做有损转换后照常派发。
pub struct CandidateSource {
    reader: Mutex<Option<LineReader>>,
}

impl CandidateSource {
    /// 打开字典文件，打不开时直接失败
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|source| ScanError::Wordlist {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        CandidateSource {
            reader: Mutex::new(Some(Box::new(reader))),
        }
    }

    /// 取下一个候选，空行跳过；读到文件末尾或IO出错后一直返回 `None`
    pub async fn next_candidate(&self) -> Option<String> {
        let mut guard = self.reader.lock().await;
        let mut buf = Vec::new();
        loop {
            let reader = guard.as_mut()?;
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    *guard = None;
                    return None;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    if let Cow::Owned(_) = line {
                        debug!("wordlist line is not valid UTF-8: {:?}", line);
                    }
                    let candidate = line.trim();
                    if !candidate.is_empty() {
                        return Some(candidate.to_string());
                    }
                }
                Err(e) => {
                    warn!("stop reading wordlist: {}", e);
                    *guard = None;
                    return None;
                }
            }
        }
    }
}
