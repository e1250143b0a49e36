//! Plugin Registry - 플러그인 저장소 및 훅 디스패처
//!
//! "무엇이 등록되어 있고 활성화되어 있는가"의 단일 출처입니다.
//!
//! - 모든 변경(register/unregister/enable/disable)은 동기이며 하나의 락 안에서 끝납니다.
//! - 이벤트는 락을 놓은 뒤에 발행합니다.
//! - 플러그인 코드는 락을 잡은 채로 실행하지 않습니다.

use super::events;
use super::guard;
use super::manifest::PluginManifest;
use super::traits::{HookName, Plugin, PluginStatus, PluginType};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use weave_foundation::{Error, EventBus, Result};

// ============================================================================
// PluginMetadata
// ============================================================================

/// 레지스트리 쪽 플러그인 정보
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub plugin_type: PluginType,
    pub status: PluginStatus,
    /// 감지된 훅
    pub hooks: Vec<HookName>,
    pub capabilities: Vec<String>,
    pub priority: i32,
    pub last_error: Option<String>,
    pub load_time: Duration,
    pub init_time: Duration,
    pub registered_at: DateTime<Utc>,
}

// ============================================================================
// HookReport
// ============================================================================

/// 구독자 하나의 훅 실행 결과
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    Completed(Value),
    Failed(String),
}

impl HookOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Completed(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(e) => Some(e),
        }
    }
}

/// `execute_hook` 결과 (호출 순서 유지)
#[derive(Debug, Clone)]
pub struct HookReport {
    pub hook: HookName,
    pub results: Vec<(String, HookOutcome)>,
    pub duration: Duration,
    /// 실행되지 않음 (종료 중 등)
    pub skipped: bool,
}

impl HookReport {
    pub fn skipped(hook: HookName) -> Self {
        Self {
            hook,
            results: Vec::new(),
            duration: Duration::ZERO,
            skipped: true,
        }
    }

    pub fn get(&self, name: &str) -> Option<&HookOutcome> {
        self.results
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    /// 호출된 플러그인 이름 (호출 순서)
    pub fn invoked(&self) -> Vec<&str> {
        self.results.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn failures(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, o)| !o.is_ok())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// ============================================================================
// RegistryStats
// ============================================================================

/// 레지스트리 통계 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total: usize,
    pub by_status: BTreeMap<PluginStatus, usize>,
    pub by_type: BTreeMap<PluginType, usize>,
    /// 훅별 구독자 수
    pub by_hook: BTreeMap<HookName, usize>,
}

// ============================================================================
// 내부 상태
// ============================================================================

struct Entry {
    plugin: Arc<dyn Plugin>,
    manifest: PluginManifest,
    metadata: PluginMetadata,
    seq: u64,
}

#[derive(Debug, Clone)]
struct Subscriber {
    name: String,
    priority: i32,
    seq: u64,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<String, Entry>,
    /// 훅 → (priority, seq) 오름차순 구독자
    hook_index: HashMap<HookName, Vec<Subscriber>>,
    next_seq: u64,
}

impl RegistryState {
    fn ordered(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }

    fn is_active(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|e| e.metadata.status == PluginStatus::Active)
    }
}

// ============================================================================
// PluginRegistry
// ============================================================================

/// 플러그인 레지스트리
pub struct PluginRegistry {
    state: RwLock<RegistryState>,
    events: Arc<EventBus>,
}

impl PluginRegistry {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            events,
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// 플러그인 등록 (상태: Initialized)
    ///
    /// 같은 이름이 있으면 `DuplicateRegistration`으로 실패하고 기존 등록은 그대로 둡니다.
    /// 훅 인덱스는 인스턴스의 `hooks()`로 만들고, 순서는 매니페스트 priority를 따릅니다.
    pub fn register(&self, plugin: Arc<dyn Plugin>, manifest: PluginManifest) -> Result<()> {
        let name = plugin.name().to_string();
        let hooks = plugin.hooks();

        let metadata = {
            let mut state = self.state.write();
            if state.entries.contains_key(&name) {
                warn!("Plugin {} is already registered", name);
                return Err(Error::DuplicateRegistration(name));
            }

            let seq = state.next_seq;
            state.next_seq += 1;

            for hook in hooks.iter() {
                let subscribers = state.hook_index.entry(hook).or_default();
                let key = (manifest.priority, seq);
                let pos = subscribers.partition_point(|s| (s.priority, s.seq) <= key);
                subscribers.insert(
                    pos,
                    Subscriber {
                        name: name.clone(),
                        priority: manifest.priority,
                        seq,
                    },
                );
            }

            let metadata = PluginMetadata {
                name: name.clone(),
                version: plugin.version().to_string(),
                plugin_type: manifest.plugin_type,
                status: PluginStatus::Initialized,
                hooks: hooks.to_vec(),
                capabilities: manifest.capabilities.clone(),
                priority: manifest.priority,
                last_error: None,
                load_time: Duration::ZERO,
                init_time: Duration::ZERO,
                registered_at: Utc::now(),
            };

            state.entries.insert(
                name.clone(),
                Entry {
                    plugin,
                    manifest,
                    metadata: metadata.clone(),
                    seq,
                },
            );
            metadata
        };

        info!(
            "Registered plugin: {} (v{}, {} hooks)",
            name,
            metadata.version,
            metadata.hooks.len()
        );
        self.events.publish(events::registered(
            &name,
            &metadata.version,
            metadata.plugin_type,
        ));
        Ok(())
    }

    /// 플러그인 등록 해제 (모든 훅 구독에서도 제거)
    pub fn unregister(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.state.write();
            let removed = state.entries.remove(name).is_some();
            if removed {
                state.hook_index.retain(|_, subscribers| {
                    subscribers.retain(|s| s.name != name);
                    !subscribers.is_empty()
                });
            }
            removed
        };

        if removed {
            info!("Unregistered plugin: {}", name);
            self.events.publish(events::unregistered(name));
        }
        removed
    }

    // ========================================================================
    // 상태 전이
    // ========================================================================

    fn transition(&self, name: &str, target: PluginStatus) -> Option<PluginStatus> {
        let mut state = self.state.write();
        let entry = state.entries.get_mut(name)?;
        let previous = entry.metadata.status;
        entry.metadata.status = target;
        Some(previous)
    }

    /// 활성화 (이미 Active면 no-op, 모르는 이름이면 false)
    pub fn enable(&self, name: &str) -> bool {
        match self.transition(name, PluginStatus::Active) {
            None => false,
            Some(PluginStatus::Active) => true,
            Some(previous) => {
                debug!("Plugin {} enabled (was {})", name, previous);
                self.events.publish(events::enabled(name, previous));
                true
            }
        }
    }

    /// 비활성화 (이미 Disabled면 no-op, 모르는 이름이면 false)
    pub fn disable(&self, name: &str) -> bool {
        match self.transition(name, PluginStatus::Disabled) {
            None => false,
            Some(PluginStatus::Disabled) => true,
            Some(previous) => {
                debug!("Plugin {} disabled (was {})", name, previous);
                self.events.publish(events::disabled(name, previous));
                true
            }
        }
    }

    /// 오류 기록 (상태: Error)
    pub fn record_error(&self, name: &str, message: impl Into<String>) -> bool {
        let mut state = self.state.write();
        match state.entries.get_mut(name) {
            Some(entry) => {
                entry.metadata.status = PluginStatus::Error;
                entry.metadata.last_error = Some(message.into());
                true
            }
            None => false,
        }
    }

    /// 로드/초기화 시간 기록
    pub fn set_timings(&self, name: &str, load_time: Duration, init_time: Duration) -> bool {
        let mut state = self.state.write();
        match state.entries.get_mut(name) {
            Some(entry) => {
                entry.metadata.load_time = load_time;
                entry.metadata.init_time = init_time;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // 훅 실행
    // ========================================================================

    /// 훅 실행
    ///
    /// Active 구독자를 priority 오름차순(동률은 등록 순)으로 하나씩 호출합니다.
    /// 실패(에러/패닉)는 해당 플러그인에만 기록되고 디스패치는 계속됩니다.
    pub async fn execute_hook(&self, hook: HookName, args: &[Value]) -> HookReport {
        let start = Instant::now();

        let subscribers: Vec<(String, Arc<dyn Plugin>)> = {
            let state = self.state.read();
            state
                .hook_index
                .get(&hook)
                .map(|subs| {
                    subs.iter()
                        .filter_map(|s| state.entries.get(&s.name))
                        .filter(|e| e.metadata.status == PluginStatus::Active)
                        .map(|e| (e.metadata.name.clone(), Arc::clone(&e.plugin)))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut results = Vec::with_capacity(subscribers.len());
        for (name, plugin) in subscribers {
            // 앞선 구독자가 상태를 바꿨을 수 있음
            if !self.state.read().is_active(&name) {
                debug!("Skipping {} for {}: no longer active", hook, name);
                continue;
            }

            let outcome = match guard::isolate(plugin.on_hook(hook, args)).await {
                Ok(value) => HookOutcome::Completed(value),
                Err(e) => {
                    let message = e.to_string();
                    warn!("{}", Error::hook_execution(&name, hook.as_str(), &message));
                    self.record_error(&name, message.clone());
                    self.events
                        .publish(events::error(&name, Some(hook), &message));
                    HookOutcome::Failed(message)
                }
            };
            results.push((name, outcome));
        }

        let duration = start.elapsed();
        let invoked: Vec<String> = results.iter().map(|(n, _)| n.clone()).collect();
        debug!(
            "Hook {} executed by {} plugins in {:?}",
            hook,
            invoked.len(),
            duration
        );
        self.events
            .publish(events::hook_executed(hook, &invoked, duration));

        HookReport {
            hook,
            results,
            duration,
            skipped: false,
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.state
            .read()
            .entries
            .get(name)
            .map(|e| Arc::clone(&e.plugin))
    }

    pub fn get_metadata(&self, name: &str) -> Option<PluginMetadata> {
        self.state
            .read()
            .entries
            .get(name)
            .map(|e| e.metadata.clone())
    }

    pub fn get_manifest(&self, name: &str) -> Option<PluginManifest> {
        self.state
            .read()
            .entries
            .get(name)
            .map(|e| e.manifest.clone())
    }

    /// 모든 플러그인 (등록 순서)
    pub fn get_all(&self) -> Vec<Arc<dyn Plugin>> {
        self.state
            .read()
            .ordered()
            .into_iter()
            .map(|e| Arc::clone(&e.plugin))
            .collect()
    }

    pub fn get_by_type(&self, plugin_type: PluginType) -> Vec<Arc<dyn Plugin>> {
        self.state
            .read()
            .ordered()
            .into_iter()
            .filter(|e| e.metadata.plugin_type == plugin_type)
            .map(|e| Arc::clone(&e.plugin))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().entries.contains_key(name)
    }

    /// 이름 목록 (등록 순서)
    pub fn names(&self) -> Vec<String> {
        self.state
            .read()
            .ordered()
            .into_iter()
            .map(|e| e.metadata.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 훅 구독자 이름 (디스패치 순서, 상태 무관)
    pub fn subscribers(&self, hook: HookName) -> Vec<String> {
        self.state
            .read()
            .hook_index
            .get(&hook)
            .map(|subs| subs.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn plugins_with_capability(&self, capability: &str) -> Vec<String> {
        self.state
            .read()
            .ordered()
            .into_iter()
            .filter(|e| e.metadata.capabilities.iter().any(|c| c == capability))
            .map(|e| e.metadata.name.clone())
            .collect()
    }

    /// 등록된 플러그인 중 하나라도 기능을 제공하는지
    pub fn has_capability(&self, capability: &str) -> bool {
        self.state
            .read()
            .entries
            .values()
            .any(|e| e.metadata.capabilities.iter().any(|c| c == capability))
    }

    /// 통계 스냅샷 (부작용 없음)
    pub fn get_stats(&self) -> RegistryStats {
        let state = self.state.read();
        let mut stats = RegistryStats {
            total: state.entries.len(),
            ..Default::default()
        };

        for entry in state.entries.values() {
            *stats.by_status.entry(entry.metadata.status).or_default() += 1;
            *stats.by_type.entry(entry.metadata.plugin_type).or_default() += 1;
        }
        for (hook, subscribers) in &state.hook_index {
            stats.by_hook.insert(*hook, subscribers.len());
        }
        stats
    }

    // ========================================================================
    // 정리
    // ========================================================================

    /// 모든 플러그인 정리 (등록 순서로 destroy 후 등록 해제)
    ///
    /// 개별 destroy 실패는 로그만 남기고 계속합니다. 정리한 수를 반환합니다.
    pub async fn clear(&self) -> usize {
        let plugins: Vec<(String, Arc<dyn Plugin>)> = {
            let state = self.state.read();
            state
                .ordered()
                .into_iter()
                .map(|e| (e.metadata.name.clone(), Arc::clone(&e.plugin)))
                .collect()
        };

        let count = plugins.len();
        for (name, plugin) in plugins {
            if let Err(e) = guard::isolate(plugin.destroy()).await {
                warn!("Failed to destroy plugin {}: {}", name, e);
            }
            self.unregister(&name);
        }

        if count > 0 {
            info!("Cleared {} plugins from registry", count);
        }
        count
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::new()))
    }
}
