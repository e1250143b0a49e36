//! PluginContext - 플러그인에 주입되는 기능 묶음
//!
//! 플러그인 이름마다 한 번 만들어지고 설치가 유지되는 동안 재사용됩니다.

use super::registry::PluginRegistry;
use super::traits::{Plugin, PluginType};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use weave_foundation::event::custom;
use weave_foundation::{
    Database, Error, EventBus, GraphStore, NullCache, NullDatabase, NullGraphStore, PluginLogger,
    Result, TagCache,
};

// ============================================================================
// HostDependencies
// ============================================================================

/// 호스트가 제공하는 협력자
///
/// 기본값은 Null 구현이라 호스트가 아무것도 주입하지 않아도 동작합니다.
#[derive(Clone)]
pub struct HostDependencies {
    pub graph: Arc<dyn GraphStore>,
    pub cache: Arc<dyn TagCache>,
    pub database: Arc<dyn Database>,
}

impl HostDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(mut self, graph: Arc<dyn GraphStore>) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn TagCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_database(mut self, database: Arc<dyn Database>) -> Self {
        self.database = database;
        self
    }
}

impl Default for HostDependencies {
    fn default() -> Self {
        Self {
            graph: Arc::new(NullGraphStore),
            cache: Arc::new(NullCache),
            database: Arc::new(NullDatabase),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// 명령 핸들러
pub type CommandHandler =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// 플러그인이 등록한 명령
#[derive(Clone)]
pub struct RegisteredCommand {
    pub name: String,
    /// 등록한 플러그인
    pub plugin: String,
    pub handler: CommandHandler,
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("name", &self.name)
            .field("plugin", &self.plugin)
            .finish()
    }
}

/// 매니저가 소유하는 명령 테이블
pub type CommandTable = Arc<RwLock<HashMap<String, RegisteredCommand>>>;

// ============================================================================
// PluginApi
// ============================================================================

/// 다른 플러그인 조회 및 명령 등록 API
#[derive(Clone)]
pub struct PluginApi {
    plugin_name: String,
    registry: Arc<PluginRegistry>,
    commands: CommandTable,
}

impl PluginApi {
    pub fn new(
        plugin_name: impl Into<String>,
        registry: Arc<PluginRegistry>,
        commands: CommandTable,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            registry,
            commands,
        }
    }

    pub fn get_plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.registry.get(name)
    }

    pub fn get_plugins_by_type(&self, plugin_type: PluginType) -> Vec<Arc<dyn Plugin>> {
        self.registry.get_by_type(plugin_type)
    }

    /// 등록된 플러그인 중 하나라도 기능을 제공하는지
    pub fn has_capability(&self, capability: &str) -> bool {
        self.registry.has_capability(capability)
    }

    /// 명령 등록
    ///
    /// 다른 플러그인이 같은 이름을 가지고 있으면 실패합니다.
    /// 같은 플러그인이 다시 등록하면 교체합니다.
    pub fn register_command<F, Fut>(&self, name: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let name = name.into();
        let mut commands = self.commands.write();
        if let Some(existing) = commands.get(&name) {
            if existing.plugin != self.plugin_name {
                return Err(Error::Command(format!(
                    "Command '{}' is already registered by {}",
                    name, existing.plugin
                )));
            }
        }

        let handler: CommandHandler = Arc::new(move |args| handler(args).boxed());
        commands.insert(
            name.clone(),
            RegisteredCommand {
                name,
                plugin: self.plugin_name.clone(),
                handler,
            },
        );
        Ok(())
    }
}

// ============================================================================
// PluginContext
// ============================================================================

/// 플러그인 컨텍스트 - 플러그인이 호스트와 상호작용하는 인터페이스
pub struct PluginContext {
    plugin_name: String,
    graph: Arc<dyn GraphStore>,
    cache: Arc<dyn TagCache>,
    database: Arc<dyn Database>,
    logger: PluginLogger,
    global_config: Value,
    config: RwLock<Value>,
    events: Arc<EventBus>,
    api: PluginApi,
    project_root: PathBuf,
    /// 디렉토리 로드 전에 만들어진 컨텍스트는 초기화 시점에 채워짐
    plugin_root: OnceLock<PathBuf>,
    cancel: CancellationToken,
}

impl PluginContext {
    pub fn new(
        plugin_name: impl Into<String>,
        deps: &HostDependencies,
        events: Arc<EventBus>,
        api: PluginApi,
        cancel: CancellationToken,
    ) -> Self {
        let plugin_name = plugin_name.into();
        Self {
            logger: PluginLogger::new(plugin_name.clone()),
            plugin_name,
            graph: Arc::clone(&deps.graph),
            cache: Arc::clone(&deps.cache),
            database: Arc::clone(&deps.database),
            global_config: Value::Object(Default::default()),
            config: RwLock::new(Value::Object(Default::default())),
            events,
            api,
            project_root: PathBuf::from("."),
            plugin_root: OnceLock::new(),
            cancel,
        }
    }

    pub fn with_global_config(mut self, global: Value) -> Self {
        self.global_config = global;
        self
    }

    pub fn with_config(self, config: Value) -> Self {
        *self.config.write() = config;
        self
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn with_plugin_root(self, root: Option<PathBuf>) -> Self {
        if let Some(root) = root {
            self.fill_plugin_root(root);
        }
        self
    }

    /// 아직 비어 있으면 플러그인 루트 설정 (이미 있으면 false)
    pub(crate) fn fill_plugin_root(&self, root: PathBuf) -> bool {
        self.plugin_root.set(root).is_ok()
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    // ========================================================================
    // 협력자
    // ========================================================================

    pub fn graph(&self) -> &Arc<dyn GraphStore> {
        &self.graph
    }

    pub fn cache(&self) -> &Arc<dyn TagCache> {
        &self.cache
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.database
    }

    pub fn logger(&self) -> &PluginLogger {
        &self.logger
    }

    // ========================================================================
    // 설정
    // ========================================================================

    pub fn global_config(&self) -> &Value {
        &self.global_config
    }

    /// 플러그인 설정 (스냅샷)
    pub fn config(&self) -> Value {
        self.config.read().clone()
    }

    pub fn config_value(&self, key: &str) -> Option<Value> {
        self.config.read().get(key).cloned()
    }

    pub(crate) fn replace_config(&self, config: Value) {
        *self.config.write() = config;
    }

    // ========================================================================
    // 이벤트 / API
    // ========================================================================

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// 다른 플러그인에게 신호 발행 (source = 플러그인 이름)
    pub fn emit(&self, topic: &str, data: Value) {
        self.events
            .publish(custom::signal(topic, &self.plugin_name, data));
    }

    pub fn api(&self) -> &PluginApi {
        &self.api
    }

    // ========================================================================
    // 경로 / 취소
    // ========================================================================

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn plugin_root(&self) -> Option<&Path> {
        self.plugin_root.get().map(PathBuf::as_path)
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_name", &self.plugin_name)
            .field("project_root", &self.project_root)
            .field("plugin_root", &self.plugin_root.get())
            .finish_non_exhaustive()
    }
}
