//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, mask_host, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CapturingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CapturingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// The global subscriber can only be installed once per process, so the
// whole lifecycle is exercised in a single test.
#[test]
fn test_init_logging_once_and_forward_to_sink() {
    let sink = Arc::new(CapturingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config.clone()).expect("first init succeeds");

    tracing::info!(target: "core_provision", folder = "Ventus", host = "10.0.0.5", "folder ready");
    tracing::debug!(target: "some_dependency", "filtered out at warn");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "folder ready");
        assert_eq!(entries[0].fields.get("host"), Some(&"10.0.0.x".to_string()));
    }

    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}

#[test]
fn test_privacy_helpers() {
    assert_eq!(mask_host("172.16.4.9:2121"), "172.16.4.x:2121");
    assert_eq!(strip_path("/storage/emulated/0/Download/Ventus"), "Ventus");
}
