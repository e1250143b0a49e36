//! Plugin Manager - 플러그인 생명주기 오케스트레이션
//!
//! 로더와 레지스트리를 묶어 공개 생명주기 API를 제공합니다.
//!
//! ```text
//! initialize() → discover → load (max_concurrency 단위 배치) → initialize_plugin (순차)
//!                                                                 ├─ PluginContext (이름당 하나)
//!                                                                 ├─ plugin.initialize(ctx)
//!                                                                 └─ registry.register → enable
//! ```
//!
//! 매니저는 컨텍스트/설정/명령 맵과 공유 취소 토큰을 소유합니다.

use super::context::{CommandTable, HostDependencies, PluginApi, PluginContext};
use super::discovery::DiscoveredPlugin;
use super::events;
use super::guard;
use super::loader::{LoadOptions, LoaderConfig, PluginLoadResult, PluginLoader};
use super::manifest::PluginManifest;
use super::module::ModuleResolver;
use super::registry::{HookReport, PluginRegistry};
use super::traits::{HookName, Plugin, PluginStatus};
use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use weave_foundation::event::system;
use weave_foundation::{Error, EventBus, Result, WeaveConfig};

// ============================================================================
// 결과 타입
// ============================================================================

/// `initialize()` 결과
#[derive(Debug, Clone, Default)]
pub struct InitializeReport {
    /// 발견된 플러그인 디렉토리 수 (유효하지 않은 것 포함)
    pub discovered: usize,
    /// 로드 + 초기화에 성공한 플러그인
    pub loaded: Vec<String>,
    /// (대상, 에러 메시지)
    pub failed: Vec<(String, String)>,
    pub duration: Duration,
}

impl InitializeReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `install()` 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub success: bool,
    pub name: String,
    pub version: Option<String>,
    pub error: Option<String>,
}

impl InstallResult {
    fn failure(name: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            name: name.to_string(),
            version: None,
            error: Some(error.into()),
        }
    }
}

/// `update()` 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub success: bool,
    pub previous_version: Option<String>,
    pub new_version: Option<String>,
    pub error: Option<String>,
}

impl UpdateResult {
    fn failure(previous_version: Option<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            previous_version,
            new_version: None,
            error: Some(error.into()),
        }
    }
}

/// 플러그인 시스템 요약
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSummary {
    pub total: usize,
    pub active: usize,
    pub disabled: usize,
    pub errored: usize,
    pub commands: usize,
}

/// 배치 로드 대상
#[derive(Debug, Clone)]
enum LoadTarget {
    Name(String),
    Path(PathBuf),
}

impl LoadTarget {
    fn label(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

// ============================================================================
// PluginManager
// ============================================================================

/// 플러그인 매니저
pub struct PluginManager {
    config: WeaveConfig,
    loader: Arc<PluginLoader>,
    registry: Arc<PluginRegistry>,
    events: Arc<EventBus>,
    /// `set_dependencies` 전에는 None (Null 구현 사용)
    dependencies: RwLock<Option<HostDependencies>>,
    contexts: RwLock<HashMap<String, Arc<PluginContext>>>,
    configs: RwLock<HashMap<String, Value>>,
    commands: CommandTable,
    /// 매니저 수명 동안 유지, shutdown에서 취소
    root_token: CancellationToken,
    /// `initialize()`마다 새로 만드는 root의 자식 토큰
    token: RwLock<CancellationToken>,
    shutting_down: AtomicBool,
}

impl PluginManager {
    /// 새 매니저 생성 (자체 이벤트 버스)
    pub fn new(config: WeaveConfig, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self::with_event_bus(config, resolver, Arc::new(EventBus::new()))
    }

    /// 호스트의 이벤트 버스를 공유하는 매니저 생성
    pub fn with_event_bus(
        config: WeaveConfig,
        resolver: Arc<dyn ModuleResolver>,
        events: Arc<EventBus>,
    ) -> Self {
        let loader = PluginLoader::new(LoaderConfig::from_settings(&config.plugins), resolver);
        let registry = PluginRegistry::new(Arc::clone(&events));
        let root_token = CancellationToken::new();
        let token = root_token.child_token();

        Self {
            config,
            loader: Arc::new(loader),
            registry: Arc::new(registry),
            events,
            dependencies: RwLock::new(None),
            contexts: RwLock::new(HashMap::new()),
            configs: RwLock::new(HashMap::new()),
            commands: CommandTable::default(),
            root_token,
            token: RwLock::new(token),
            shutting_down: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // 초기화
    // ========================================================================

    /// 발견 → 배치 로드 → 순차 초기화
    pub async fn initialize(&self) -> Result<InitializeReport> {
        if self.is_shutting_down() {
            return Err(Error::ShutDown);
        }

        let start = Instant::now();
        *self.token.write() = self.root_token.child_token();
        info!("Initializing plugin runtime");

        let discovered = self.discover().await;
        let targets = self.load_targets(&discovered);
        let mut report = InitializeReport {
            discovered: discovered.len(),
            ..Default::default()
        };

        let mut loaded = Vec::new();
        let chunk_size = self.config.plugins.max_concurrency.max(1);
        for chunk in targets.chunks(chunk_size) {
            let results = join_all(chunk.iter().map(|target| self.load_target(target))).await;
            for (target, result) in chunk.iter().zip(results) {
                match result.plugin.clone() {
                    Some(plugin) if result.success => loaded.push(plugin),
                    _ => {
                        let message = result
                            .error
                            .unwrap_or_else(|| "unknown load failure".to_string());
                        report.failed.push((target.label(), message));
                    }
                }
            }
        }

        // 초기화는 순차 (플러그인끼리 초기화 순서를 관찰할 수 있음)
        for plugin in loaded {
            let name = plugin.name().to_string();
            if self.registry.contains(&name) {
                debug!("Plugin {} is already active, skipping initialization", name);
                continue;
            }
            match self.initialize_plugin(&name, plugin).await {
                Ok(()) => report.loaded.push(name),
                Err(e) => report.failed.push((name, e.to_string())),
            }
        }

        report.duration = start.elapsed();
        info!(
            "Plugin runtime initialized: {} loaded, {} failed ({:?})",
            report.loaded.len(),
            report.failed.len(),
            report.duration
        );
        self.events
            .publish(system::initialized(report.loaded.len(), report.failed.len()));
        Ok(report)
    }

    async fn discover(&self) -> Vec<DiscoveredPlugin> {
        let discovery = self.loader.discover();
        let discovered = match self.config.plugins.discovery_timeout() {
            Some(limit) => match tokio::time::timeout(limit, discovery).await {
                Ok(found) => found,
                Err(_) => {
                    warn!("Plugin discovery timed out after {:?}", limit);
                    Vec::new()
                }
            },
            None => discovery.await,
        };

        for plugin in discovered.iter().filter(|p| !p.valid) {
            warn!(
                "Invalid plugin at {}: {}",
                plugin.path.display(),
                plugin.errors.join(", ")
            );
        }
        discovered
    }

    /// 설정된 이름 + (옵션) 발견된 유효 플러그인
    fn load_targets(&self, discovered: &[DiscoveredPlugin]) -> Vec<LoadTarget> {
        let settings = &self.config.plugins;
        let mut seen: HashSet<String> = HashSet::new();
        let mut targets = Vec::new();

        for name in &settings.auto_load {
            if seen.insert(name.clone()) {
                targets.push(LoadTarget::Name(name.clone()));
            }
        }

        if settings.auto_load_discovered {
            for plugin in discovered.iter().filter(|p| p.valid) {
                let dir_name = plugin
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if seen.contains(plugin.name()) || seen.contains(&dir_name) {
                    continue;
                }
                seen.insert(plugin.name().to_string());
                targets.push(LoadTarget::Path(plugin.path.clone()));
            }
        }
        targets
    }

    async fn load_target(&self, target: &LoadTarget) -> PluginLoadResult {
        match target {
            LoadTarget::Name(name) => self.loader.load(name, LoadOptions::new()).await,
            LoadTarget::Path(path) => self.loader.load_from_path(path, LoadOptions::new()).await,
        }
    }

    /// 플러그인 하나 초기화 후 등록 + 활성화
    ///
    /// `initialize`의 에러나 패닉은 `Error::Initialization`으로 반환됩니다.
    /// 이미 활성인 다른 플러그인에는 영향이 없습니다.
    pub async fn initialize_plugin(&self, name: &str, plugin: Arc<dyn Plugin>) -> Result<()> {
        if self.is_shutting_down() {
            return Err(Error::ShutDown);
        }
        if plugin.name() != name {
            return Err(Error::InvalidInput(format!(
                "plugin instance is named '{}', expected '{}'",
                plugin.name(),
                name
            )));
        }
        if self.registry.contains(name) {
            return Err(Error::DuplicateRegistration(name.to_string()));
        }

        let start = Instant::now();
        let ctx = self.get_plugin_context(name);
        if let Some(root) = self.loader.plugin_path(name) {
            ctx.fill_plugin_root(root);
        }

        if let Err(e) = guard::isolate(plugin.initialize(Arc::clone(&ctx))).await {
            let error = Error::Initialization {
                plugin: name.to_string(),
                message: e.to_string(),
            };
            warn!("{}", error);

            // 실패한 인스턴스는 캐시에서 내리고 init 중 만든 상태도 버림
            let loader_owned = self
                .loader
                .get(name)
                .is_some_and(|cached| Arc::ptr_eq(&cached, &plugin));
            if loader_owned {
                self.loader.unload(name).await;
            }
            self.discard_runtime(name);

            self.events
                .publish(events::error(name, None, &error.to_string()));
            return Err(error);
        }
        let init_time = start.elapsed();

        let detected = plugin.hooks();
        let manifest = self
            .loader
            .manifest(name)
            .unwrap_or_else(|| PluginManifest::synthesize(plugin.as_ref()));
        for hook in manifest.hooks.iter().filter(|h| !detected.contains(**h)) {
            debug!(
                "Plugin {} declares hook {} but does not implement it",
                name, hook
            );
        }
        let manifest = manifest.with_hooks(detected);

        self.registry.register(Arc::clone(&plugin), manifest)?;
        self.registry.enable(name);

        let load_time = self
            .loader
            .metadata(name)
            .map(|m| m.load_time)
            .unwrap_or_default();
        self.registry.set_timings(name, load_time, init_time);

        info!(
            "Plugin {} v{} initialized in {:?}",
            name,
            plugin.version(),
            init_time
        );
        Ok(())
    }

    // ========================================================================
    // 컨텍스트 / 설정
    // ========================================================================

    /// 플러그인 컨텍스트 (이름당 하나, 설치가 유지되는 동안 재사용)
    pub fn get_plugin_context(&self, name: &str) -> Arc<PluginContext> {
        if let Some(ctx) = self.contexts.read().get(name) {
            return Arc::clone(ctx);
        }

        let deps = match self.dependencies.read().clone() {
            Some(deps) => deps,
            None => {
                debug!("No host dependencies set, using null implementations for {}", name);
                HostDependencies::default()
            }
        };
        let api = PluginApi::new(name, Arc::clone(&self.registry), Arc::clone(&self.commands));
        let ctx = PluginContext::new(
            name,
            &deps,
            Arc::clone(&self.events),
            api,
            self.token.read().clone(),
        )
        .with_global_config(self.config.global.clone())
        .with_config(self.get_config(name))
        .with_project_root(self.project_root())
        .with_plugin_root(self.loader.plugin_path(name));

        // 동시에 만들어졌으면 먼저 들어간 것을 사용
        let mut contexts = self.contexts.write();
        let ctx = contexts
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ctx));
        Arc::clone(ctx)
    }

    /// 호스트 협력자 설정 (이후 만들어지는 컨텍스트에 적용)
    pub fn set_dependencies(&self, dependencies: HostDependencies) {
        *self.dependencies.write() = Some(dependencies);
        debug!("Host dependencies updated");
    }

    /// 플러그인 설정 (런타임 설정 → weave.json → 빈 객체)
    pub fn get_config(&self, name: &str) -> Value {
        if let Some(config) = self.configs.read().get(name) {
            return config.clone();
        }
        self.config.plugin_settings(name)
    }

    /// 플러그인 설정 변경 (살아있는 컨텍스트에도 반영)
    pub fn set_config(&self, name: &str, config: Value) {
        self.configs
            .write()
            .insert(name.to_string(), config.clone());

        let ctx = self.contexts.read().get(name).cloned();
        if let Some(ctx) = ctx {
            ctx.replace_config(config);
        }

        debug!("Config updated for plugin {}", name);
        self.events.publish(system::config_changed(name));
    }

    fn project_root(&self) -> PathBuf {
        self.config
            .project_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    // ========================================================================
    // 설치 / 제거 / 업데이트
    // ========================================================================

    /// 경로 또는 모듈 ID로 설치 (에러를 반환하지 않음)
    pub async fn install(&self, source: &str) -> InstallResult {
        if self.is_shutting_down() {
            return InstallResult::failure(source, Error::ShutDown.to_string());
        }

        let path = Path::new(source);
        let result = if path.exists() {
            self.loader.load_from_path(path, LoadOptions::new()).await
        } else {
            self.loader.load(source, LoadOptions::new()).await
        };

        let plugin = match result.plugin {
            Some(plugin) if result.success => plugin,
            _ => {
                let error = result
                    .error
                    .unwrap_or_else(|| "unknown load failure".to_string());
                warn!("Failed to install plugin from {}: {}", source, error);
                return InstallResult::failure(source, error);
            }
        };

        let name = plugin.name().to_string();
        let version = plugin.version().to_string();
        if let Err(e) = self.initialize_plugin(&name, plugin).await {
            return InstallResult::failure(&name, e.to_string());
        }

        info!("Installed plugin {} v{}", name, version);
        self.events.publish(events::installed(&name, &version));
        InstallResult {
            success: true,
            name,
            version: Some(version),
            error: None,
        }
    }

    /// 플러그인 제거
    ///
    /// `onShutdown` 훅 → 등록 해제 → 언로드(destroy) → 컨텍스트/설정/명령 폐기.
    /// 도중의 에러는 로그로 남기고 false를 반환합니다.
    pub async fn uninstall(&self, name: &str) -> bool {
        let Some(plugin) = self.registry.get(name).or_else(|| self.loader.get(name)) else {
            warn!("Cannot uninstall unknown plugin {}", name);
            return false;
        };

        let mut clean = true;
        if plugin.hooks().contains(HookName::OnShutdown) {
            if let Err(e) = guard::isolate(plugin.on_hook(HookName::OnShutdown, &[])).await {
                warn!("Shutdown hook failed for plugin {}: {}", name, e);
                clean = false;
            }
        }

        self.registry.unregister(name);
        if !self.loader.unload(name).await {
            // 로더를 거치지 않고 초기화된 플러그인
            if let Err(e) = guard::isolate(plugin.destroy()).await {
                warn!("Failed to destroy plugin {}: {}", name, e);
                clean = false;
            }
        }

        self.discard_state(name);
        info!("Uninstalled plugin {}", name);
        self.events.publish(events::uninstalled(name));
        clean
    }

    /// 로더에서 새 인스턴스를 받아 교체
    ///
    /// 새 인스턴스 로드에 실패하면 기존 등록은 그대로 둡니다.
    pub async fn update(&self, name: &str) -> UpdateResult {
        let Some(old) = self.registry.get(name) else {
            let error = Error::NotFound(format!("plugin '{}'", name));
            return UpdateResult::failure(None, error.to_string());
        };
        let previous_version = old.version().to_string();
        let was_disabled = self
            .registry
            .get_metadata(name)
            .is_some_and(|m| m.status == PluginStatus::Disabled);

        let result = self.loader.refresh(name).await;
        let plugin = match result.plugin {
            Some(plugin) if result.success => plugin,
            _ => {
                let error = result
                    .error
                    .unwrap_or_else(|| "unknown load failure".to_string());
                warn!("Failed to update plugin {}: {}", name, error);
                return UpdateResult::failure(Some(previous_version), error);
            }
        };
        let new_version = plugin.version().to_string();

        self.registry.unregister(name);
        if let Err(e) = guard::isolate(old.destroy()).await {
            warn!("Failed to destroy previous instance of {}: {}", name, e);
        }

        if let Err(e) = self.initialize_plugin(name, plugin).await {
            return UpdateResult::failure(Some(previous_version), e.to_string());
        }
        if was_disabled {
            self.registry.disable(name);
        }

        info!("Updated plugin {}: {} -> {}", name, previous_version, new_version);
        self.events
            .publish(events::updated(name, &previous_version, &new_version));
        UpdateResult {
            success: true,
            previous_version: Some(previous_version),
            new_version: Some(new_version),
            error: None,
        }
    }

    fn discard_state(&self, name: &str) {
        self.discard_runtime(name);
        self.configs.write().remove(name);
    }

    /// 컨텍스트와 플러그인이 등록한 명령 제거 (호스트가 준 설정은 유지)
    fn discard_runtime(&self, name: &str) {
        self.contexts.write().remove(name);
        self.commands.write().retain(|_, command| command.plugin != name);
    }

    // ========================================================================
    // 활성화 / 비활성화 / 훅
    // ========================================================================

    pub fn enable_plugin(&self, name: &str) -> bool {
        self.registry.enable(name)
    }

    pub fn disable_plugin(&self, name: &str) -> bool {
        self.registry.disable(name)
    }

    /// 훅 브로드캐스트
    ///
    /// 종료가 시작된 뒤에는 `onShutdown`만 실행하고 나머지는 건너뜁니다.
    pub async fn invoke_hook(&self, hook: HookName, args: &[Value]) -> HookReport {
        if self.is_shutting_down() && hook != HookName::OnShutdown {
            debug!("Skipping hook {} during shutdown", hook);
            return HookReport::skipped(hook);
        }
        self.registry.execute_hook(hook, args).await
    }

    // ========================================================================
    // 명령
    // ========================================================================

    /// 플러그인이 등록한 명령 실행
    pub async fn execute_command(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let command = self.commands.read().get(name).cloned();
        let command = command.ok_or_else(|| Error::NotFound(format!("command '{}'", name)))?;

        debug!("Executing command {} from plugin {}", name, command.plugin);
        guard::isolate((command.handler)(args))
            .await
            .map_err(|e| Error::Command(format!("{} failed: {}", name, e)))
    }

    /// 등록된 명령 이름 (정렬)
    pub fn commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().keys().cloned().collect();
        names.sort();
        names
    }

    // ========================================================================
    // 종료
    // ========================================================================

    /// 런타임 종료 (두 번째 호출부터는 아무것도 하지 않음)
    ///
    /// 취소 신호 → `onShutdown` → 레지스트리 정리(destroy) → 로더 캐시 정리 →
    /// 매니저 맵 정리 → `system.shutdown` 이벤트 한 번.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            debug!("Plugin runtime is already shut down");
            return;
        }

        info!("Shutting down plugin runtime");
        self.root_token.cancel();

        let report = self.invoke_hook(HookName::OnShutdown, &[]).await;
        for failed in report.failures() {
            warn!("Shutdown hook failed for plugin {}", failed);
        }

        let registered: HashSet<String> = self.registry.names().into_iter().collect();
        let cleared = self.registry.clear().await;

        // 로드만 되고 등록되지 않은 플러그인 (초기화 실패 등)
        for (name, plugin) in self.loader.drain() {
            if registered.contains(&name) {
                continue;
            }
            if let Err(e) = guard::isolate(plugin.destroy()).await {
                warn!("Failed to destroy unregistered plugin {}: {}", name, e);
            }
        }

        self.contexts.write().clear();
        self.configs.write().clear();
        self.commands.write().clear();

        info!("Plugin runtime shut down ({} plugins)", cleared);
        self.events.publish(system::shutdown(cleared));
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    // ========================================================================
    // 접근자
    // ========================================================================

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<PluginLoader> {
        &self.loader
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    /// 현재 공유 취소 토큰
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.read().clone()
    }

    pub fn summary(&self) -> PluginSummary {
        let stats = self.registry.get_stats();
        let count = |status: PluginStatus| stats.by_status.get(&status).copied().unwrap_or(0);
        PluginSummary {
            total: stats.total,
            active: count(PluginStatus::Active),
            disabled: count(PluginStatus::Disabled),
            errored: count(PluginStatus::Error),
            commands: self.commands.read().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::module::{PluginExport, StaticModuleTable};
    use crate::plugin::traits::HookSet;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use weave_foundation::PluginSettings;

    #[derive(Default)]
    struct Counters {
        created: AtomicUsize,
        initialized: AtomicUsize,
        destroyed: AtomicUsize,
        shutdown_hooks: AtomicUsize,
    }

    struct Sample {
        name: String,
        version: String,
        hooks: HookSet,
        fail_init: bool,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl Plugin for Sample {
        fn name(&self) -> &str {
            &self.name
        }

        fn version(&self) -> &str {
            &self.version
        }

        fn hooks(&self) -> HookSet {
            self.hooks
        }

        async fn initialize(&self, ctx: Arc<PluginContext>) -> Result<()> {
            let name = self.name.clone();
            ctx.api()
                .register_command(format!("{}.ping", self.name), move |_| {
                    let name = name.clone();
                    async move { Ok(json!(format!("pong from {}", name))) }
                })?;
            if self.fail_init {
                // anyhow 에러는 Error::Internal로 변환됨
                return Err(anyhow::anyhow!("init refused").into());
            }
            self.counters.initialized.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn destroy(&self) -> Result<()> {
            self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_hook(&self, hook: HookName, _args: &[Value]) -> Result<Value> {
            if hook == HookName::OnShutdown {
                self.counters.shutdown_hooks.fetch_add(1, Ordering::SeqCst);
            }
            Ok(json!(self.name))
        }
    }

    fn register(table: &StaticModuleTable, name: &str, counters: &Arc<Counters>, fail_init: bool) {
        let counters = Arc::clone(counters);
        let plugin_name = name.to_string();
        table.register(
            name,
            PluginExport::factory(move || {
                let n = counters.created.fetch_add(1, Ordering::SeqCst);
                Ok(Sample {
                    name: plugin_name.clone(),
                    version: format!("1.0.{}", n),
                    hooks: HookSet::of(&[HookName::OnGraphLoad, HookName::OnShutdown]),
                    fail_init,
                    counters: Arc::clone(&counters),
                })
            }),
        );
    }

    fn manager_with(names: &[&str], counters: &Arc<Counters>) -> PluginManager {
        let table = StaticModuleTable::new();
        let mut settings = PluginSettings::new().with_max_concurrency(2);
        for name in names {
            register(&table, name, counters, false);
            settings = settings.with_auto_load(*name);
        }
        register(&table, "broken", counters, true);

        let config = WeaveConfig::new().with_plugins(settings);
        PluginManager::new(config, Arc::new(table))
    }

    #[tokio::test]
    async fn test_initialize_loads_auto_load_set_in_batches() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a", "b", "c", "d", "e"], &counters);

        let report = manager.initialize().await.unwrap();
        assert_eq!(report.loaded, vec!["a", "b", "c", "d", "e"]);
        assert!(report.is_clean());
        assert_eq!(counters.initialized.load(Ordering::SeqCst), 5);
        assert_eq!(manager.summary().active, 5);
        assert_eq!(
            manager.event_bus().history_by_type("system.initialized").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_initialize_records_failures() {
        let counters = Arc::new(Counters::default());
        let table = StaticModuleTable::new();
        register(&table, "good", &counters, false);
        register(&table, "broken", &counters, true);
        let settings = PluginSettings::new()
            .with_auto_load("good")
            .with_auto_load("broken")
            .with_auto_load("ghost");
        let manager = PluginManager::new(WeaveConfig::new().with_plugins(settings), Arc::new(table));

        let report = manager.initialize().await.unwrap();
        assert_eq!(report.loaded, vec!["good"]);
        let failed: Vec<&str> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
        assert!(failed.contains(&"broken"));
        assert!(failed.contains(&"ghost"));
        assert!(!manager.registry().contains("broken"));
        // 실패한 인스턴스는 캐시에서 내려가고 한 번 destroy됨
        assert!(!manager.loader().is_loaded("broken"));
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(manager.commands(), vec!["good.ping"]);
    }

    #[tokio::test]
    async fn test_failed_init_discards_commands_and_context() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&[], &counters);
        manager.set_config("broken", json!({ "depth": 3 }));
        let before = manager.get_plugin_context("broken");

        let result = manager.install("broken").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("init refused"));

        assert!(manager.commands().is_empty());
        let err = manager
            .execute_command("broken.ping", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let after = manager.get_plugin_context("broken");
        assert!(!Arc::ptr_eq(&before, &after));
        // 호스트가 준 설정은 남음
        assert_eq!(after.config_value("depth"), Some(json!(3)));
    }

    #[tokio::test]
    async fn test_reinstall_after_failed_init_builds_new_instance() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&[], &counters);

        assert!(!manager.install("broken").await.success);
        assert!(!manager.install("broken").await.success);

        assert_eq!(counters.created.load(Ordering::SeqCst), 2);
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);
        assert!(!manager.loader().is_loaded("broken"));
        assert_eq!(manager.summary().errored, 0);
    }

    #[tokio::test]
    async fn test_initialize_respects_max_concurrency() {
        let table = StaticModuleTable::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let names = ["a", "b", "c", "d", "e"];
        let mut settings = PluginSettings::new().with_max_concurrency(2);

        for name in names {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            table.register(
                name,
                PluginExport::async_factory(move || {
                    let in_flight = Arc::clone(&in_flight);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(Sample {
                            name: name.to_string(),
                            version: "1.0.0".into(),
                            hooks: HookSet::empty(),
                            fail_init: false,
                            counters: Arc::new(Counters::default()),
                        })
                    }
                }),
            );
            settings = settings.with_auto_load(name);
        }

        let manager = PluginManager::new(WeaveConfig::new().with_plugins(settings), Arc::new(table));
        let report = manager.initialize().await.unwrap();

        assert_eq!(report.loaded.len(), names.len());
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak in-flight loads: {}", peak);
        assert!(peak > 1, "loads in a batch did not overlap");
    }

    #[tokio::test]
    async fn test_initialize_plugin_propagates_error() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&[], &counters);
        let plugin: Arc<dyn Plugin> = Arc::new(Sample {
            name: "manual".into(),
            version: "0.1.0".into(),
            hooks: HookSet::empty(),
            fail_init: true,
            counters: Arc::clone(&counters),
        });

        let err = manager
            .initialize_plugin("manual", plugin)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Initialization { .. }));
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a", "b"], &counters);
        manager.initialize().await.unwrap();
        let token = manager.cancellation_token();

        manager.shutdown().await;
        manager.shutdown().await;

        assert!(token.is_cancelled());
        assert!(manager.registry().is_empty());
        assert!(manager.commands().is_empty());
        assert_eq!(counters.shutdown_hooks.load(Ordering::SeqCst), 2);
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);
        assert_eq!(
            manager.event_bus().history_by_type("system.shutdown").len(),
            1
        );
        assert!(matches!(manager.initialize().await, Err(Error::ShutDown)));
    }

    #[tokio::test]
    async fn test_hooks_skipped_after_shutdown() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a"], &counters);
        manager.initialize().await.unwrap();

        let report = manager.invoke_hook(HookName::OnGraphLoad, &[]).await;
        assert_eq!(report.invoked(), vec!["a"]);

        manager.shutdown().await;
        let report = manager.invoke_hook(HookName::OnGraphLoad, &[]).await;
        assert!(report.skipped);
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_uninstall_runs_shutdown_hook_and_discards_state() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a"], &counters);
        manager.initialize().await.unwrap();
        let before = manager.get_plugin_context("a");
        assert_eq!(manager.commands(), vec!["a.ping"]);

        assert!(manager.uninstall("a").await);
        assert!(!manager.registry().contains("a"));
        assert!(!manager.loader().is_loaded("a"));
        assert!(manager.commands().is_empty());
        assert_eq!(counters.shutdown_hooks.load(Ordering::SeqCst), 1);
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);

        let after = manager.get_plugin_context("a");
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!manager.uninstall("a").await);
    }

    #[tokio::test]
    async fn test_update_swaps_instance() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a"], &counters);
        manager.initialize().await.unwrap();
        let ctx = manager.get_plugin_context("a");

        let result = manager.update("a").await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.previous_version.as_deref(), Some("1.0.0"));
        assert_eq!(result.new_version.as_deref(), Some("1.0.1"));
        assert_eq!(manager.registry().get("a").unwrap().version(), "1.0.1");
        assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&ctx, &manager.get_plugin_context("a")));
        assert_eq!(manager.event_bus().history_by_type(events::UPDATED).len(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_disabled_status() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a"], &counters);
        manager.initialize().await.unwrap();
        assert!(manager.disable_plugin("a"));

        let result = manager.update("a").await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(manager.registry().get("a").unwrap().version(), "1.0.1");
        assert_eq!(
            manager.registry().get_metadata("a").unwrap().status,
            PluginStatus::Disabled
        );
        assert!(manager.invoke_hook(HookName::OnGraphLoad, &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_plugin() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&[], &counters);
        let result = manager.update("ghost").await;
        assert!(!result.success);
        assert!(result.previous_version.is_none());
    }

    #[tokio::test]
    async fn test_install_by_module_id() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a"], &counters);

        let result = manager.install("a").await;
        assert!(result.success);
        assert_eq!(result.version.as_deref(), Some("1.0.0"));
        assert!(manager.registry().contains("a"));

        // 이미 설치됨
        let again = manager.install("a").await;
        assert!(!again.success);

        let missing = manager.install("ghost").await;
        assert!(!missing.success);
        assert!(missing.error.unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_config_updates_live_context() {
        let counters = Arc::new(Counters::default());
        let table = StaticModuleTable::new();
        register(&table, "a", &counters, false);
        let settings = PluginSettings::new().with_settings("a", json!({ "depth": 1 }));
        let manager = PluginManager::new(WeaveConfig::new().with_plugins(settings), Arc::new(table));

        let ctx = manager.get_plugin_context("a");
        assert_eq!(ctx.config_value("depth"), Some(json!(1)));

        manager.set_config("a", json!({ "depth": 4 }));
        assert_eq!(ctx.config_value("depth"), Some(json!(4)));
        assert_eq!(manager.get_config("a"), json!({ "depth": 4 }));
        assert_eq!(
            manager.event_bus().history_by_type("system.config_changed").len(),
            1
        );
    }

    #[tokio::test]
    async fn test_execute_command() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a"], &counters);
        manager.initialize().await.unwrap();

        let out = manager.execute_command("a.ping", vec![]).await.unwrap();
        assert_eq!(out, json!("pong from a"));

        let err = manager.execute_command("nope", vec![]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_enable_disable() {
        let counters = Arc::new(Counters::default());
        let manager = manager_with(&["a"], &counters);
        manager.initialize().await.unwrap();

        assert!(manager.disable_plugin("a"));
        assert!(manager.disable_plugin("a"));
        assert_eq!(manager.event_bus().history_by_type(events::DISABLED).len(), 1);
        assert!(manager.invoke_hook(HookName::OnGraphLoad, &[]).await.is_empty());
        assert_eq!(manager.summary().disabled, 1);

        assert!(manager.enable_plugin("a"));
        assert!(!manager.enable_plugin("ghost"));
    }
}
