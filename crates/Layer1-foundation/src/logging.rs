//! Logging - tracing 초기화 및 플러그인용 로거

use crate::{Error, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// 기본 로그 레벨
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// 전역 tracing subscriber 설치
///
/// `RUST_LOG`가 있으면 그것을, 없으면 `level`을 사용합니다.
/// 이미 설치되어 있으면 `Error::Internal`을 반환합니다.
pub fn init_tracing(level: Option<&str>) -> Result<()> {
    let level = level.unwrap_or(DEFAULT_LOG_LEVEL);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}

// ============================================================================
// PluginLogger
// ============================================================================

/// 플러그인 이름으로 네임스페이스된 로거
///
/// 모든 레코드는 `plugin` 필드를 달고 `weave::plugin` 타깃으로 나갑니다.
#[derive(Debug, Clone)]
pub struct PluginLogger {
    namespace: String,
}

impl PluginLogger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 하위 네임스페이스 로거 (`parent:child`)
    pub fn child(&self, name: &str) -> Self {
        Self::new(format!("{}:{}", self.namespace, name))
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        tracing::debug!(target: "weave::plugin", plugin = %self.namespace, "{}", message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        tracing::info!(target: "weave::plugin", plugin = %self.namespace, "{}", message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        tracing::warn!(target: "weave::plugin", plugin = %self.namespace, "{}", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        tracing::error!(target: "weave::plugin", plugin = %self.namespace, "{}", message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_child_namespace() {
        let logger = PluginLogger::new("indexer");
        assert_eq!(logger.child("scan").namespace(), "indexer:scan");
    }

    #[test]
    fn test_records_carry_plugin_field() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let logger = PluginLogger::new("indexer");
            logger.info("graph indexed");
            logger.warn("slow scan");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("graph indexed"));
        assert!(output.contains("plugin=indexer"));
        assert!(output.contains("WARN"));
    }
}
