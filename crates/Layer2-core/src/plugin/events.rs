//! Plugin Events - 레지스트리/매니저 라이프사이클 이벤트
//!
//! 모든 이벤트는 `weave_foundation::EventBus`로 발행되며 `plugin.` 접두사를
//! 씁니다. 훅 실행 이벤트만 `Hook` 카테고리입니다.

use super::traits::{HookName, PluginStatus, PluginType};
use serde_json::json;
use std::time::Duration;
use weave_foundation::{EventCategory, EventSeverity, WeaveEvent};

pub const REGISTERED: &str = "plugin.registered";
pub const UNREGISTERED: &str = "plugin.unregistered";
pub const ENABLED: &str = "plugin.enabled";
pub const DISABLED: &str = "plugin.disabled";
pub const ERROR: &str = "plugin.error";
pub const HOOK_EXECUTED: &str = "plugin.hook_executed";
pub const INSTALLED: &str = "plugin.installed";
pub const UNINSTALLED: &str = "plugin.uninstalled";
pub const UPDATED: &str = "plugin.updated";

fn plugin_event(event_type: &str, name: &str) -> WeaveEvent {
    WeaveEvent::new(event_type, EventCategory::Plugin).with_source(name)
}

/// 레지스트리에 등록됨
pub fn registered(name: &str, version: &str, plugin_type: PluginType) -> WeaveEvent {
    plugin_event(REGISTERED, name).with_data(json!({
        "name": name,
        "version": version,
        "type": plugin_type,
    }))
}

/// 레지스트리에서 제거됨
pub fn unregistered(name: &str) -> WeaveEvent {
    plugin_event(UNREGISTERED, name).with_data(json!({ "name": name }))
}

/// 활성화됨
pub fn enabled(name: &str, previous: PluginStatus) -> WeaveEvent {
    plugin_event(ENABLED, name).with_data(json!({ "name": name, "previous": previous }))
}

/// 비활성화됨
pub fn disabled(name: &str, previous: PluginStatus) -> WeaveEvent {
    plugin_event(DISABLED, name).with_data(json!({ "name": name, "previous": previous }))
}

/// 플러그인 오류 (훅 실패 등)
pub fn error(name: &str, hook: Option<HookName>, message: &str) -> WeaveEvent {
    plugin_event(ERROR, name)
        .with_severity(EventSeverity::Error)
        .with_data(json!({
            "name": name,
            "hook": hook,
            "error": message,
        }))
}

/// 훅 실행 완료
pub fn hook_executed(hook: HookName, subscribers: &[String], duration: Duration) -> WeaveEvent {
    WeaveEvent::new(HOOK_EXECUTED, EventCategory::Hook)
        .with_severity(EventSeverity::Debug)
        .with_source("registry")
        .with_data(json!({
            "hook": hook,
            "subscribers": subscribers,
            "duration_ms": duration.as_millis() as u64,
        }))
}

/// 설치됨
pub fn installed(name: &str, version: &str) -> WeaveEvent {
    plugin_event(INSTALLED, name).with_data(json!({ "name": name, "version": version }))
}

/// 제거됨
pub fn uninstalled(name: &str) -> WeaveEvent {
    plugin_event(UNINSTALLED, name).with_data(json!({ "name": name }))
}

/// 업데이트됨
pub fn updated(name: &str, previous_version: &str, new_version: &str) -> WeaveEvent {
    plugin_event(UPDATED, name).with_data(json!({
        "name": name,
        "previousVersion": previous_version,
        "newVersion": new_version,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_shape() {
        let event = error("indexer", Some(HookName::OnNodeAdd), "boom");
        assert_eq!(event.event_type, ERROR);
        assert_eq!(event.severity, EventSeverity::Error);
        assert_eq!(event.field("hook"), Some(&json!("onNodeAdd")));
        assert_eq!(event.source, "indexer");
    }

    #[test]
    fn test_hook_executed_shape() {
        let event = hook_executed(
            HookName::OnGraphLoad,
            &["a".to_string(), "b".to_string()],
            Duration::from_millis(12),
        );
        assert_eq!(event.category, EventCategory::Hook);
        assert_eq!(event.field("duration_ms"), Some(&json!(12)));
        assert_eq!(event.field("subscribers"), Some(&json!(["a", "b"])));
    }
}
