use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use std::io::Write;
use std::sync::Mutex;

/// 带颜色标签的终端日志，输出到 stderr，避免和结果输出混在一起
pub struct Logger {
    use_colors: bool,
    max_level: LevelFilter,
    mutex: Mutex<()>,
}

impl Logger {
    pub fn new(max_level: LevelFilter) -> Self {
        Logger {
            use_colors: true,
            max_level,
            mutex: Mutex::new(()),
        }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(level: Level) -> &'static str {
        match level {
            Level::Error => "ERROR",
            Level::Warn => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    fn wrap(&self, level: Level) -> String {
        let label = Self::label(level);
        if !self.use_colors {
            return label.to_string();
        }

        match level {
            Level::Error => label.red().to_string(),
            Level::Warn => label.yellow().to_string(),
            Level::Info => label.blue().to_string(),
            Level::Debug => label.magenta().to_string(),
            Level::Trace => label.normal().to_string(),
        }
    }

    fn format(&self, record: &Record) -> String {
        format!("[{}] {}", self.wrap(record.level()), record.args())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.format(record);
        // 多个worker同时写日志时保证整行输出
        let _guard = self.mutex.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(std::io::stderr(), "{}", line);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// 安装全局日志器；重复调用时保留第一次的配置
pub fn init_logger(level: LevelFilter) {
    if log::set_boxed_logger(Box::new(Logger::new(level))).is_ok() {
        log::set_max_level(level);
    }
}

/// 根据命令行开关选择日志级别
pub fn level_from_flags(verbose: bool, silent: bool) -> LevelFilter {
    if silent {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}
