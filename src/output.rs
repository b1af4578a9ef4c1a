use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use colored::*;
use serde::Serialize;

use crate::error::{Result, ScanError};
use crate::input::OutputFormat;
use crate::state::StatsSnapshot;
use crate::structs::{LookupOptions, LookupResult};
use crate::wildcard::WildcardBaseline;

/// 终端输出
#[derive(Debug, Clone)]
pub struct Formatter {
    options: LookupOptions,
    silent: bool,
}

impl Formatter {
    pub fn new(options: LookupOptions, silent: bool) -> Self {
        Formatter { options, silent }
    }

    pub fn print_banner(&self, version: &str) {
        if self.silent {
            return;
        }
        println!("{} v{}\n", "dnssearch".red(), version);
    }

    pub fn print_wildcard(&self, baseline: &WildcardBaseline) {
        if self.silent {
            return;
        }
        println!("Detected Wildcard : {:?}\n", baseline.addresses());
    }

    pub fn print_result(&self, result: &LookupResult) {
        println!("{}", self.format_result(result));
    }

    /// 只显示启用且非空的记录类型
    pub fn format_result(&self, result: &LookupResult) -> String {
        if self.silent {
            return result.hostname.clone();
        }

        let mut line = format!("{:>25}", result.hostname).green().to_string();
        if self.options.a && !result.addresses.is_empty() {
            line.push_str(&format!(" : A {:?}", result.addresses));
        }
        if self.options.txt && !result.txt_records.is_empty() {
            line.push_str(&format!(" : TXT {:?}", result.txt_records));
        }
        if self.options.cname {
            if let Some(cname) = &result.cname {
                line.push_str(&format!(" : CNAME {}", cname));
            }
        }
        line
    }

    pub fn print_interrupt(&self) {
        eprintln!("{}", "\nINTERRUPTING ...".red());
    }

    pub fn print_stats(&self, stats: StatsSnapshot, elapsed: Duration) {
        if self.silent {
            return;
        }
        println!("{}", "\nDONE".green());
        println!();
        println!("Requests : {}", stats.requests);
        println!("Results  : {}", stats.results);
        println!("Time     : {:.3} s", elapsed.as_secs_f64());
        if let Some(rate) = requests_per_second(stats, elapsed) {
            println!("Req/s    : {:.2}", rate);
        }
    }

    pub fn print_error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }
}

fn requests_per_second(stats: StatsSnapshot, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    (secs > 0.0).then(|| stats.requests as f64 / secs)
}

/// 完整的导出数据结构
#[derive(Debug, Serialize)]
struct ExportData<'a> {
    domain: &'a str,
    export_time: String,
    elapsed_secs: f64,
    stats: StatsSnapshot,
    results: &'a [LookupResult],
}

/// 导出结果到文件
pub fn export_results(
    domain: &str,
    results: &[LookupResult],
    stats: StatsSnapshot,
    elapsed: Duration,
    output_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let data = ExportData {
        domain,
        export_time: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        elapsed_secs: elapsed.as_secs_f64(),
        stats,
        results,
    };

    let content = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&data).map_err(|e| ScanError::Export(e.to_string()))?
        }
        OutputFormat::Csv => export_to_csv(&data),
        OutputFormat::Txt => export_to_txt(&data),
    };

    let mut file = File::create(output_path)
        .map_err(|e| ScanError::Export(format!("{}: {}", output_path.display(), e)))?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn export_to_csv(data: &ExportData) -> String {
    let mut csv = String::from("Hostname,Addresses,TXT,CNAME\n");
    for result in data.results {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            escape_csv(&result.hostname),
            escape_csv(&result.addresses.join(" ")),
            escape_csv(&result.txt_records.join(" | ")),
            escape_csv(result.cname.as_deref().unwrap_or(""))
        ));
    }
    csv
}

fn export_to_txt(data: &ExportData) -> String {
    let mut txt = String::new();
    txt.push_str(&format!("dnssearch report for {}\n", data.domain));
    txt.push_str(&format!("Exported : {}\n", data.export_time));
    txt.push_str(&format!("Requests : {}\n", data.stats.requests));
    txt.push_str(&format!("Results  : {}\n", data.stats.results));
    txt.push_str(&format!("Time     : {:.3} s\n", data.elapsed_secs));
    txt.push_str(&format!("{}\n", "=".repeat(60)));

    for result in data.results {
        txt.push_str(&result.hostname);
        if !result.addresses.is_empty() {
            txt.push_str(&format!(" : A {:?}", result.addresses));
        }
        if !result.txt_records.is_empty() {
            txt.push_str(&format!(" : TXT {:?}", result.txt_records));
        }
        if let Some(cname) = &result.cname {
            txt.push_str(&format!(" : CNAME {}", cname));
        }
        txt.push('\n');
    }
    txt
}

/// CSV转义
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
