//! Error types for Weave
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Weave 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소/캐시/그래프 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Graph error: {0}")]
    Graph(String),

    // ========================================================================
    // 플러그인 발견/로드 관련
    // ========================================================================
    #[error("Discovery error at {path}: {message}")]
    Discovery { path: String, message: String },

    #[error("Invalid manifest: {}", .0.join(", "))]
    ManifestValidation(Vec<String>),

    #[error("Plugin {name} timed out after {timeout_ms}ms while loading")]
    LoadTimeout { name: String, timeout_ms: u64 },

    #[error("Failed to load plugin {name}: {message}")]
    Load { name: String, message: String },

    // ========================================================================
    // 플러그인 실행 관련
    // ========================================================================
    #[error("Plugin {plugin} failed to initialize: {message}")]
    Initialization { plugin: String, message: String },

    #[error("Hook {hook} failed in plugin {plugin}: {message}")]
    HookExecution {
        plugin: String,
        hook: String,
        message: String,
    },

    #[error("Plugin already registered: {0}")]
    DuplicateRegistration(String),

    #[error("Command error: {0}")]
    Command(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Plugin runtime is shut down")]
    ShutDown,

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 로드 단계 실패인지 확인 (manifest, timeout, resolve)
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Error::ManifestValidation(_)
                | Error::LoadTimeout { .. }
                | Error::Load { .. }
                | Error::NotFound(_)
        )
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::ManifestValidation(_)
                | Error::DuplicateRegistration(_)
                | Error::Cancelled
        )
    }

    /// 로드 에러 생성 헬퍼
    pub fn load(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Load {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 초기화 에러 생성 헬퍼
    pub fn initialization(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Initialization {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Hook 실행 에러 생성 헬퍼
    pub fn hook_execution(
        plugin: impl Into<String>,
        hook: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::HookExecution {
            plugin: plugin.into(),
            hook: hook.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

/// 플러그인 코드에서 anyhow를 그대로 `?`로 전파할 수 있도록 변환
impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Internal(format!("{:#}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_validation_message() {
        let err = Error::ManifestValidation(vec![
            "Missing required field: plugin.main".into(),
            "Missing required field: version".into(),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid manifest"));
        assert!(msg.contains("plugin.main"));
    }

    #[test]
    fn test_load_timeout_message() {
        let err = Error::LoadTimeout {
            name: "slow".into(),
            timeout_ms: 50,
        };
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("boom").context("while indexing").into();
        assert!(err.to_string().contains("while indexing"));
        assert!(err.to_string().contains("boom"));
    }
}
