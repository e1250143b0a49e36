//! Plugin traits - 핵심 플러그인 인터페이스

use super::context::PluginContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use weave_foundation::Result;

// ============================================================================
// PluginType - 플러그인 종류
// ============================================================================

/// 플러그인 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    Analyzer,
    Transformer,
    Exporter,
    Importer,
    Integration,
    Visualization,
    Storage,
    Agent,
    Hook,
    #[default]
    Generic,
}

impl PluginType {
    pub const ALL: [PluginType; 10] = [
        Self::Analyzer,
        Self::Transformer,
        Self::Exporter,
        Self::Importer,
        Self::Integration,
        Self::Visualization,
        Self::Storage,
        Self::Agent,
        Self::Hook,
        Self::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyzer => "analyzer",
            Self::Transformer => "transformer",
            Self::Exporter => "exporter",
            Self::Importer => "importer",
            Self::Integration => "integration",
            Self::Visualization => "visualization",
            Self::Storage => "storage",
            Self::Agent => "agent",
            Self::Hook => "hook",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown plugin type '{}'", s))
    }
}

// ============================================================================
// PluginStatus - 상태 머신
// ============================================================================

/// 플러그인 상태
///
/// `Discovered → Loading → Initialized → Active ⇄ Disabled`,
/// 어느 상태에서든 처리되지 않은 오류가 나면 `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// 디스커버리에서 발견됨
    Discovered,
    /// 로드됨 (아직 등록 안됨)
    Loading,
    /// 등록됨
    Initialized,
    /// 활성화됨 (훅 디스패치 대상)
    Active,
    /// 비활성화됨
    Disabled,
    /// 오류 상태
    Error,
}

impl PluginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Loading => "loading",
            Self::Initialized => "initialized",
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// HookName / HookSet
// ============================================================================

/// 호스트가 브로드캐스트하는 확장 지점
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookName {
    OnGraphLoad,
    OnGraphSave,
    OnNodeAdd,
    OnNodeUpdate,
    OnNodeRemove,
    OnEdgeAdd,
    OnEdgeRemove,
    OnAnalysisStart,
    OnAnalysisComplete,
    OnAgentTaskStart,
    OnAgentTaskComplete,
    OnFileChange,
    OnShutdown,
}

impl HookName {
    pub const ALL: [HookName; 13] = [
        Self::OnGraphLoad,
        Self::OnGraphSave,
        Self::OnNodeAdd,
        Self::OnNodeUpdate,
        Self::OnNodeRemove,
        Self::OnEdgeAdd,
        Self::OnEdgeRemove,
        Self::OnAnalysisStart,
        Self::OnAnalysisComplete,
        Self::OnAgentTaskStart,
        Self::OnAgentTaskComplete,
        Self::OnFileChange,
        Self::OnShutdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnGraphLoad => "onGraphLoad",
            Self::OnGraphSave => "onGraphSave",
            Self::OnNodeAdd => "onNodeAdd",
            Self::OnNodeUpdate => "onNodeUpdate",
            Self::OnNodeRemove => "onNodeRemove",
            Self::OnEdgeAdd => "onEdgeAdd",
            Self::OnEdgeRemove => "onEdgeRemove",
            Self::OnAnalysisStart => "onAnalysisStart",
            Self::OnAnalysisComplete => "onAnalysisComplete",
            Self::OnAgentTaskStart => "onAgentTaskStart",
            Self::OnAgentTaskComplete => "onAgentTaskComplete",
            Self::OnFileChange => "onFileChange",
            Self::OnShutdown => "onShutdown",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| format!("unknown hook '{}'", s))
    }
}

/// 플러그인이 구현하는 훅 집합 (비트마스크)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HookSet(u16);

impl HookSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        HookName::ALL.into_iter().collect()
    }

    pub fn of(hooks: &[HookName]) -> Self {
        hooks.iter().copied().collect()
    }

    pub fn with(mut self, hook: HookName) -> Self {
        self.insert(hook);
        self
    }

    pub fn insert(&mut self, hook: HookName) {
        self.0 |= hook.bit();
    }

    pub fn contains(&self, hook: HookName) -> bool {
        self.0 & hook.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// 선언 순서대로 순회
    pub fn iter(&self) -> impl Iterator<Item = HookName> + '_ {
        HookName::ALL.into_iter().filter(|h| self.contains(*h))
    }

    pub fn to_vec(&self) -> Vec<HookName> {
        self.iter().collect()
    }
}

impl FromIterator<HookName> for HookSet {
    fn from_iter<I: IntoIterator<Item = HookName>>(iter: I) -> Self {
        let mut set = Self::empty();
        for hook in iter {
            set.insert(hook);
        }
        set
    }
}

// ============================================================================
// Plugin Trait - 모든 플러그인이 구현해야 하는 인터페이스
// ============================================================================

/// 플러그인 트레이트
///
/// 모든 Weave 플러그인은 이 트레이트를 구현합니다. 라이프사이클 메서드와
/// 훅 처리는 모두 기본 구현(no-op)을 갖고 있으므로, 플러그인은 필요한 것만
/// 재정의하고 `hooks()`로 실제 처리하는 훅을 선언합니다.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// 고유 이름
    fn name(&self) -> &str;

    /// 버전
    fn version(&self) -> &str;

    /// 플러그인 종류
    fn plugin_type(&self) -> PluginType {
        PluginType::Generic
    }

    /// 구현한 훅 (등록 시 한 번 읽음)
    fn hooks(&self) -> HookSet {
        HookSet::empty()
    }

    /// 제공 기능 이름 목록
    fn capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    /// 초기화 (컨텍스트 주입)
    async fn initialize(&self, _ctx: Arc<PluginContext>) -> Result<()> {
        Ok(())
    }

    /// 정리
    async fn destroy(&self) -> Result<()> {
        Ok(())
    }

    /// 훅 처리
    ///
    /// `hooks()`에 선언된 훅에 대해서만 호출됩니다.
    async fn on_hook(&self, _hook: HookName, _args: &[Value]) -> Result<Value> {
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    #[async_trait]
    impl Plugin for Bare {
        fn name(&self) -> &str {
            "bare"
        }

        fn version(&self) -> &str {
            "0.1.0"
        }
    }

    #[test]
    fn test_hook_names_roundtrip() {
        for hook in HookName::ALL {
            assert_eq!(hook.as_str().parse::<HookName>().unwrap(), hook);
            assert_eq!(
                serde_json::to_value(hook).unwrap(),
                serde_json::json!(hook.as_str())
            );
        }
        assert!("onSomethingElse".parse::<HookName>().is_err());
    }

    #[test]
    fn test_hook_set() {
        let set = HookSet::of(&[HookName::OnShutdown, HookName::OnNodeAdd]);
        assert!(set.contains(HookName::OnNodeAdd));
        assert!(!set.contains(HookName::OnEdgeAdd));
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_vec(), vec![HookName::OnNodeAdd, HookName::OnShutdown]);
        assert_eq!(HookSet::all().len(), 13);
    }

    #[test]
    fn test_plugin_type_parse() {
        assert_eq!("analyzer".parse::<PluginType>().unwrap(), PluginType::Analyzer);
        assert_eq!(PluginType::ALL.len(), 10);
        assert!("widget".parse::<PluginType>().is_err());
    }

    #[tokio::test]
    async fn test_default_methods() {
        let plugin = Bare;
        assert_eq!(plugin.plugin_type(), PluginType::Generic);
        assert!(plugin.hooks().is_empty());
        assert!(plugin.destroy().await.is_ok());
        assert_eq!(
            plugin.on_hook(HookName::OnGraphLoad, &[]).await.unwrap(),
            Value::Null
        );
    }
}
