use std::sync::{Arc, Mutex};

use clap::Parser;
use log::{debug, info};

use dnssearch::input::Opts;
use dnssearch::logger;
use dnssearch::{
    export_results, CancellationController, Formatter, LookupResult, Result, ScanEngine, ScanOutcome,
};

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    logger::init_logger(logger::level_from_flags(opts.verbose, opts.silent));

    if let Err(e) = run_scan(opts).await {
        Formatter::new(Default::default(), false).print_error(&e.to_string());
        std::process::exit(1);
    }
}

/// 执行子域名扫描主逻辑
async fn run_scan(opts: Opts) -> Result<()> {
    let config = opts.into_config()?;
    let formatter = Arc::new(Formatter::new(config.options, config.silent));
    formatter.print_banner(env!("CARGO_PKG_VERSION"));

    let mut engine = ScanEngine::with_system_resolver(config)?;
    if let Some(baseline) = engine.setup_wildcard_detection().await {
        formatter.print_wildcard(baseline);
    }

    spawn_signal_listener(engine.controller(), formatter.clone());

    // 只有需要导出时才保留结果
    let collected = engine
        .config()
        .output
        .is_some()
        .then(|| Arc::new(Mutex::new(Vec::new())));

    let sink = {
        let formatter = formatter.clone();
        let collected = collected.clone();
        move |result: LookupResult| {
            formatter.print_result(&result);
            if let Some(collected) = &collected {
                if let Ok(mut results) = collected.lock() {
                    results.push(result);
                }
            }
        }
    };

    let outcome = engine.run(sink).await?;
    if outcome == ScanOutcome::Interrupted {
        info!("scan interrupted, in-flight lookups drained");
    }

    let stats = engine.stats();
    formatter.print_stats(stats, engine.elapsed());

    if let (Some(path), Some(collected)) = (&engine.config().output, collected) {
        let results = match collected.lock() {
            Ok(results) => results.clone(),
            Err(_) => Vec::new(),
        };
        export_results(
            &engine.config().base_domain,
            &results,
            stats,
            engine.elapsed(),
            path,
            engine.config().format,
        )?;
        info!("results exported to {}", path.display());
    }

    Ok(())
}

/// 监听中断信号；只有第一次信号会触发中断，之后的信号忽略
fn spawn_signal_listener(controller: Arc<CancellationController>, formatter: Arc<Formatter>) {
    tokio::spawn(async move {
        while wait_for_signal().await.is_ok() {
            if controller.interrupt() {
                formatter.print_interrupt();
            } else {
                debug!("already shutting down, signal ignored");
            }
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
