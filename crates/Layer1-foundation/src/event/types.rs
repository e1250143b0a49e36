//! Event Types - 시스템 전체에서 사용되는 이벤트 타입 정의
//!
//! 레지스트리, 매니저, 플러그인 간 신호가 모두 이 구조를 공유합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Event ID
// ============================================================================

/// 이벤트 고유 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// 새 이벤트 ID 생성
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Event Category
// ============================================================================

/// 이벤트 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// 시스템 이벤트 (시작, 종료, 설정 변경)
    System,
    /// 플러그인 라이프사이클 이벤트 (등록, 해제, 활성화)
    Plugin,
    /// Hook 디스패치 이벤트
    Hook,
    /// 에러 이벤트
    Error,
    /// 플러그인 간 사용자 정의 이벤트
    Custom,
}

impl EventCategory {
    /// 카테고리 문자열 반환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Plugin => "plugin",
            Self::Hook => "hook",
            Self::Error => "error",
            Self::Custom => "custom",
        }
    }
}

// ============================================================================
// Event Severity
// ============================================================================

/// 이벤트 심각도
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    /// 디버그 정보
    Debug,
    /// 일반 정보
    #[default]
    Info,
    /// 경고
    Warning,
    /// 에러
    Error,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

// ============================================================================
// WeaveEvent - 핵심 이벤트 타입
// ============================================================================

/// Weave 시스템 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaveEvent {
    /// 이벤트 ID
    pub id: EventId,

    /// 이벤트 타입 (예: "plugin.registered", "hook.executed")
    pub event_type: String,

    /// 이벤트 카테고리
    pub category: EventCategory,

    /// 심각도
    pub severity: EventSeverity,

    /// 이벤트 발생 시간
    pub timestamp: DateTime<Utc>,

    /// 이벤트 소스 (컴포넌트 또는 플러그인 이름)
    pub source: String,

    /// 이벤트 데이터
    pub data: Value,

    /// 추가 메타데이터
    pub metadata: HashMap<String, Value>,
}

impl WeaveEvent {
    /// 새 이벤트 생성
    pub fn new(event_type: impl Into<String>, category: EventCategory) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.into(),
            category,
            severity: EventSeverity::Info,
            timestamp: Utc::now(),
            source: String::new(),
            data: Value::Null,
            metadata: HashMap::new(),
        }
    }

    /// 심각도 설정
    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// 소스 설정
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// 데이터 설정
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// 메타데이터 추가
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// 데이터 필드 조회 헬퍼
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

// ============================================================================
// 사전 정의된 이벤트 타입들
// ============================================================================

/// 시스템 이벤트
pub mod system {
    use super::*;

    /// 런타임 초기화 완료 이벤트
    pub fn initialized(loaded: usize, failed: usize) -> WeaveEvent {
        WeaveEvent::new("system.initialized", EventCategory::System)
            .with_source("weave")
            .with_data(serde_json::json!({
                "loaded": loaded,
                "failed": failed,
            }))
    }

    /// 시스템 종료 이벤트
    pub fn shutdown(plugin_count: usize) -> WeaveEvent {
        WeaveEvent::new("system.shutdown", EventCategory::System)
            .with_source("weave")
            .with_data(serde_json::json!({
                "plugins": plugin_count,
            }))
    }

    /// 설정 변경 이벤트
    pub fn config_changed(plugin: &str) -> WeaveEvent {
        WeaveEvent::new("system.config_changed", EventCategory::System)
            .with_source("config")
            .with_data(serde_json::json!({
                "plugin": plugin,
            }))
    }
}

/// 플러그인이 발행하는 사용자 정의 이벤트
pub mod custom {
    use super::*;

    /// 플러그인 간 신호
    pub fn signal(topic: &str, source: &str, data: Value) -> WeaveEvent {
        WeaveEvent::new(topic, EventCategory::Custom)
            .with_source(source)
            .with_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = WeaveEvent::new("plugin.registered", EventCategory::Plugin)
            .with_source("registry")
            .with_data(serde_json::json!({ "name": "graph-metrics" }));

        assert_eq!(event.event_type, "plugin.registered");
        assert_eq!(event.source, "registry");
        assert_eq!(event.field("name"), Some(&serde_json::json!("graph-metrics")));
        assert_eq!(event.severity, EventSeverity::Info);
    }

    #[test]
    fn test_severity_order() {
        assert!(EventSeverity::Error > EventSeverity::Warning);
        assert!(EventSeverity::Debug < EventSeverity::Info);
    }

    #[test]
    fn test_custom_signal() {
        let event = custom::signal("indexer.ready", "indexer", serde_json::json!(42));
        assert_eq!(event.category, EventCategory::Custom);
        assert_eq!(event.source, "indexer");
    }
}
