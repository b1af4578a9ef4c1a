use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dnssearch::{
    LookupError, LookupOptions, LookupResult, RecordLookup, ScanConfig, ScanEngine, ScanError,
    ScanOutcome, StatsSnapshot,
};
use tempfile::NamedTempFile;

/// 内存中的区域数据；设置了 wildcard 时所有不存在的名称都解析到它
#[derive(Default)]
struct Zone {
    a: HashMap<String, Vec<String>>,
    txt: HashMap<String, Vec<String>>,
    wildcard: Option<Vec<String>>,
    probe_fails: bool,
    delay: Duration,
    queried: Mutex<Vec<String>>,
}

impl Zone {
    fn with_a(mut self, host: &str, addrs: &[&str]) -> Self {
        self.a.insert(host.to_string(), addrs.iter().map(|s| s.to_string()).collect());
        self
    }

    fn queried_candidates(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

fn is_probe(host: &str) -> bool {
    let label = host.split('.').next().unwrap_or_default();
    label.len() == 32 && label.chars().all(|c| c.is_ascii_hexdigit())
}

#[async_trait]
impl RecordLookup for Zone {
    async fn lookup_a(&self, host: &str) -> Result<Vec<String>, LookupError> {
        if is_probe(host) {
            if self.probe_fails {
                return Err(LookupError::Failed("SERVFAIL".to_string()));
            }
        } else {
            self.queried.lock().unwrap().push(host.to_string());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match (self.a.get(host), &self.wildcard) {
            (Some(addrs), _) => Ok(addrs.clone()),
            (None, Some(wildcard)) => Ok(wildcard.clone()),
            (None, None) => Err(LookupError::NotFound),
        }
    }

    async fn lookup_txt(&self, host: &str) -> Result<Vec<String>, LookupError> {
        self.txt.get(host).cloned().ok_or(LookupError::NotFound)
    }

    async fn lookup_cname(&self, _host: &str) -> Result<Option<String>, LookupError> {
        Err(LookupError::NotFound)
    }
}

fn wordlist(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn config(file: &NamedTempFile, workers: usize) -> ScanConfig {
    let mut config = ScanConfig::new("example.com", file.path());
    config.workers = workers;
    config
}

#[tokio::test]
async fn scan_without_wildcard() {
    let file = wordlist(&["www", "mail", "nope", "", "api"]);
    let zone = Arc::new(
        Zone::default()
            .with_a("www.example.com", &["10.0.0.1"])
            .with_a("api.example.com", &["10.0.0.2", "10.0.0.3"]),
    );

    let mut engine = ScanEngine::new(config(&file, 2), zone.clone());
    assert!(engine.setup_wildcard_detection().await.is_none());

    let (outcome, results) = engine.collect().await.unwrap();
    assert_eq!(outcome, ScanOutcome::Completed);

    let hosts: HashSet<String> = results.iter().map(|r| r.hostname.clone()).collect();
    assert_eq!(
        hosts,
        HashSet::from(["www.example.com".to_string(), "api.example.com".to_string()])
    );
    assert_eq!(
        engine.stats(),
        StatsSnapshot {
            requests: 4,
            results: 2
        }
    );
    assert_eq!(zone.queried_candidates().len(), 4);
}

#[tokio::test]
async fn wildcard_answers_are_filtered() {
    let file = wordlist(&["www", "random1", "random2", "shop", "multi"]);
    let zone = Zone {
        wildcard: Some(vec!["1.2.3.4".to_string()]),
        ..Default::default()
    }
    .with_a("www.example.com", &["9.9.9.9"])
    .with_a("multi.example.com", &["1.2.3.4", "5.6.7.8"])
    .with_a("shop.example.com", &["1.2.3.4"]);

    let mut engine = ScanEngine::new(config(&file, 3), Arc::new(zone));
    let baseline = engine.setup_wildcard_detection().await.unwrap();
    assert_eq!(baseline.addresses(), ["1.2.3.4".to_string()]);

    let (_, results) = engine.collect().await.unwrap();
    let mut hosts: Vec<&str> = results.iter().map(|r| r.hostname.as_str()).collect();
    hosts.sort();
    assert_eq!(hosts, vec!["multi.example.com", "www.example.com"]);

    let stats = engine.stats();
    assert_eq!(stats.requests, 5);
    assert_eq!(stats.results, 2);
}

#[tokio::test]
async fn failed_probe_means_no_wildcard() {
    let file = wordlist(&["www"]);
    let zone = Zone {
        probe_fails: true,
        ..Default::default()
    }
    .with_a("www.example.com", &["10.0.0.1"]);

    let mut engine = ScanEngine::new(config(&file, 1), Arc::new(zone));
    assert!(engine.setup_wildcard_detection().await.is_none());
    assert!(engine.baseline().is_none());

    let (_, results) = engine.collect().await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn missing_wordlist_aborts_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScanConfig::new("example.com", dir.path().join("missing.txt"));
    let engine = ScanEngine::new(config, Arc::new(Zone::default()));

    let err = engine.run(|_: LookupResult| {}).await.unwrap_err();
    assert!(matches!(err, ScanError::Wordlist { .. }));
    assert_eq!(engine.stats(), StatsSnapshot::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn any_worker_count_covers_every_line_once() {
    let names: Vec<String> = (0..12).map(|i| format!("n{}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let file = wordlist(&refs);

    for workers in 1..=names.len() {
        let zone = Arc::new(Zone::default().with_a("n3.example.com", &["10.1.1.1"]));
        let engine = ScanEngine::new(config(&file, workers), zone.clone());
        let (outcome, results) = engine.collect().await.unwrap();

        assert_eq!(outcome, ScanOutcome::Completed);
        assert_eq!(results.len(), 1);

        let mut queried = zone.queried_candidates();
        queried.sort();
        let mut expected: Vec<String> = names.iter().map(|n| format!("{}.example.com", n)).collect();
        expected.sort();
        assert_eq!(queried, expected, "workers = {}", workers);
        assert_eq!(engine.stats().requests, names.len() as u64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interrupt_drains_and_reports_once() {
    let names: Vec<String> = (0..200).map(|i| format!("h{}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let file = wordlist(&refs);

    let zone = Arc::new(Zone {
        delay: Duration::from_millis(20),
        ..Default::default()
    });
    let engine = ScanEngine::new(config(&file, 4), zone.clone());

    let controller = engine.controller();
    let interrupter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(controller.interrupt());
        // 第二次信号不会产生任何效果
        assert!(!controller.interrupt());
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), engine.run(|_: LookupResult| {}))
        .await
        .expect("scan should return promptly after interrupt")
        .unwrap();
    interrupter.await.unwrap();

    assert_eq!(outcome, ScanOutcome::Interrupted);

    let stats = engine.stats();
    let queried = zone.queried_candidates();
    assert!(stats.requests < names.len() as u64);
    assert_eq!(stats.requests, queried.len() as u64);
    let unique: HashSet<&String> = queried.iter().collect();
    assert_eq!(unique.len(), queried.len());

    // 最终统计只记录一次
    assert_eq!(engine.stats(), stats);
    assert!(!engine.controller().interrupt());
}

#[tokio::test]
async fn txt_only_scan_reports_txt_records() {
    let file = wordlist(&["_dmarc", "www"]);
    let mut zone = Zone::default().with_a("www.example.com", &["10.0.0.1"]);
    zone.txt.insert(
        "_dmarc.example.com".to_string(),
        vec!["v=DMARC1; p=none".to_string()],
    );

    let mut config = config(&file, 2);
    config.options = LookupOptions {
        a: false,
        txt: true,
        cname: false,
    };
    let engine = ScanEngine::new(config, Arc::new(zone));
    let (_, results) = engine.collect().await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].hostname, "_dmarc.example.com");
    assert_eq!(results[0].txt_records, vec!["v=DMARC1; p=none".to_string()]);
    assert!(results[0].addresses.is_empty());
}

#[tokio::test]
async fn second_run_keeps_first_outcome() {
    let file = wordlist(&["www", "api"]);
    let zone = Arc::new(Zone::default().with_a("www.example.com", &["10.0.0.1"]));
    let engine = ScanEngine::new(config(&file, 2), zone.clone());

    let (outcome, results) = engine.collect().await.unwrap();
    assert_eq!(outcome, ScanOutcome::Completed);
    assert_eq!(results.len(), 1);
    let stats = engine.stats();

    let (outcome, results) = engine.collect().await.unwrap();
    assert_eq!(outcome, ScanOutcome::Completed);
    assert!(results.is_empty());
    assert_eq!(engine.stats(), stats);
    assert_eq!(zone.queried_candidates().len(), 2);
}
