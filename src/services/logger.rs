use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// Step runs default to debug so the engine's captured stdout tells the whole story.
    pub fn from_env() -> Self {
        std::env::var(crate::constants::env::LOG_LEVEL)
            .ok()
            .and_then(|raw| Self::parse(&raw))
            .unwrap_or(LogLevel::Debug)
    }

    fn rank(self) -> u8 {
        match self {
            LogLevel::Error => 0,
            LogLevel::Warn => 1,
            LogLevel::Info => 2,
            LogLevel::Debug => 3,
        }
    }

    fn allows(self, other: LogLevel) -> bool {
        other.rank() <= self.rank()
    }

    fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    error: u64,
    warn: u64,
    info: u64,
    debug: u64,
}

#[derive(Debug, Clone)]
pub struct Logger {
    context: String,
    level: LogLevel,
    counters: Arc<Mutex<Counters>>,
    capture: Option<Arc<Mutex<Vec<String>>>>,
}

impl Logger {
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
            level: LogLevel::from_env(),
            counters: Arc::new(Mutex::new(Counters::default())),
            capture: None,
        }
    }

    /// Records lines in memory instead of writing them to stdout.
    pub fn capturing(context: &str) -> Self {
        let mut logger = Self::new(context);
        logger.level = LogLevel::Debug;
        logger.capture = Some(Arc::new(Mutex::new(Vec::new())));
        logger
    }

    pub fn child(&self, suffix: &str) -> Self {
        let context = if suffix.is_empty() {
            self.context.clone()
        } else {
            format!("{}:{}", self.context, suffix)
        };
        Self {
            context,
            level: self.level,
            counters: self.counters.clone(),
            capture: self.capture.clone(),
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    fn log(&self, level: LogLevel, message: &str, meta: Option<&serde_json::Value>) {
        if !self.level.allows(level) {
            return;
        }
        if let Ok(mut counters) = self.counters.lock() {
            match level {
                LogLevel::Error => counters.error += 1,
                LogLevel::Warn => counters.warn += 1,
                LogLevel::Info => counters.info += 1,
                LogLevel::Debug => counters.debug += 1,
            }
        }
        let timestamp = chrono::Utc::now().to_rfc3339();
        let meta_suffix = meta
            .and_then(|m| if m.is_null() { None } else { Some(m) })
            .map(|m| format!(" {}", m))
            .unwrap_or_default();
        let line = format!(
            "[{}] {} [{}] {}{}",
            timestamp,
            level.label(),
            self.context,
            message,
            meta_suffix
        );
        match &self.capture {
            Some(capture) => {
                if let Ok(mut lines) = capture.lock() {
                    lines.push(line);
                }
            }
            None => println!("{}", line),
        }
    }

    pub fn error(&self, message: &str, meta: Option<&serde_json::Value>) {
        self.log(LogLevel::Error, message, meta);
    }

    pub fn warn(&self, message: &str, meta: Option<&serde_json::Value>) {
        self.log(LogLevel::Warn, message, meta);
    }

    pub fn info(&self, message: &str, meta: Option<&serde_json::Value>) {
        self.log(LogLevel::Info, message, meta);
    }

    pub fn debug(&self, message: &str, meta: Option<&serde_json::Value>) {
        self.log(LogLevel::Debug, message, meta);
    }

    /// Captured lines; empty unless built with [`Logger::capturing`].
    pub fn records(&self) -> Vec<String> {
        self.capture
            .as_ref()
            .map(|capture| {
                capture
                    .lock()
                    .map(|lines| lines.clone())
                    .unwrap_or_else(|err| err.into_inner().clone())
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|line| line.contains(needle))
    }

    pub fn stats(&self) -> serde_json::Value {
        let counters = self.counters.lock().unwrap_or_else(|err| err.into_inner());
        serde_json::json!({
            "level": format!("{:?}", self.level).to_lowercase(),
            "context": self.context,
            "error": counters.error,
            "warn": counters.warn,
            "info": counters.info,
            "debug": counters.debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_loggers_share_counters_and_capture() {
        let logger = Logger::capturing("dataflow");
        let child = logger.child("transport");
        child.warn("downgraded", None);
        logger.debug("hello", Some(&serde_json::json!({ "k": 1 })));

        assert_eq!(logger.stats()["warn"], 1);
        assert_eq!(logger.stats()["debug"], 1);
        let records = logger.records();
        assert!(records[0].contains("WARN [dataflow:transport] downgraded"));
        assert!(records[1].ends_with("hello {\"k\":1}"));
    }

    #[test]
    fn level_filters_lower_priority_lines() {
        let mut logger = Logger::capturing("dataflow");
        logger.set_level(LogLevel::Warn);
        logger.debug("hidden", None);
        logger.error("shown", None);
        assert!(!logger.contains("hidden"));
        assert!(logger.contains("shown"));
    }

    #[test]
    fn parse_accepts_warning_alias() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("verbose"), None);
    }
}
