//! Plugin Loader - 이름/경로 → 실행 가능한 플러그인
//!
//! ## 로드 전략 (`load`)
//!
//! 1. 캐시 (force가 아니면)
//! 2. 각 검색 경로의 `<path>/<name>` (매니페스트가 있는 곳만)
//! 3. 모듈 ID로 직접 해석
//!
//! 모든 실패는 `PluginLoadResult`로 돌려주며 `Err`를 던지지 않습니다.

use super::discovery::{DiscoveredPlugin, PluginDiscovery};
use super::guard;
use super::manifest::{
    validate_manifest, ManifestFile, ManifestValidation, PluginManifest, DEFAULT_PRIORITY,
};
use super::module::{ModuleResolver, ModuleSpecifier};
use super::registry::PluginMetadata;
use super::traits::{Plugin, PluginStatus};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use weave_foundation::{Error, PluginSettings, Result};

/// 기본 모듈 로드 타임아웃
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Config / Options
// ============================================================================

/// 로더 설정
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub search_paths: Vec<PathBuf>,
    pub load_timeout: Duration,
    /// 매니페스트 검증 기본값
    pub validate: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            validate: true,
        }
    }
}

impl LoaderConfig {
    pub fn from_settings(settings: &PluginSettings) -> Self {
        Self {
            search_paths: settings.search_paths.clone(),
            load_timeout: settings.load_timeout(),
            validate: settings.validate_manifests,
        }
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }
}

/// 로드 옵션
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// 캐시 무시
    pub force: bool,
    /// 매니페스트 검증 (None이면 로더 설정)
    pub validate: Option<bool>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forced() -> Self {
        Self {
            force: true,
            validate: None,
        }
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }
}

// ============================================================================
// Results
// ============================================================================

/// 로드 결과
#[derive(Clone)]
pub struct PluginLoadResult {
    pub success: bool,
    pub plugin: Option<Arc<dyn Plugin>>,
    /// 성공: Loading, 실패: Error
    pub metadata: PluginMetadata,
    pub manifest: Option<PluginManifest>,
    pub error: Option<String>,
    pub load_time: Duration,
    /// 캐시에서 응답했는지
    pub from_cache: bool,
}

impl PluginLoadResult {
    fn failure(name: &str, error: &Error, load_time: Duration) -> Self {
        Self {
            success: false,
            plugin: None,
            metadata: PluginMetadata {
                name: name.to_string(),
                version: String::new(),
                plugin_type: Default::default(),
                status: PluginStatus::Error,
                hooks: Vec::new(),
                capabilities: Vec::new(),
                priority: DEFAULT_PRIORITY,
                last_error: Some(error.to_string()),
                load_time,
                init_time: Duration::ZERO,
                registered_at: Utc::now(),
            },
            manifest: None,
            error: Some(error.to_string()),
            load_time,
            from_cache: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

impl fmt::Debug for PluginLoadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLoadResult")
            .field("success", &self.success)
            .field("name", &self.metadata.name)
            .field("error", &self.error)
            .field("load_time", &self.load_time)
            .field("from_cache", &self.from_cache)
            .finish()
    }
}

/// 로드된 모듈의 출처 (reload/refresh에서 재사용)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    Path(PathBuf),
    Module(String),
}

struct LoadedModule {
    plugin: Arc<dyn Plugin>,
    manifest: Option<PluginManifest>,
    metadata: PluginMetadata,
    origin: LoadOrigin,
}

impl LoadedModule {
    fn to_result(&self, from_cache: bool) -> PluginLoadResult {
        PluginLoadResult {
            success: true,
            plugin: Some(Arc::clone(&self.plugin)),
            metadata: self.metadata.clone(),
            manifest: self.manifest.clone(),
            error: None,
            load_time: self.metadata.load_time,
            from_cache,
        }
    }
}

#[derive(Default)]
struct LoaderState {
    /// 플러그인 이름 → 모듈
    modules: HashMap<String, LoadedModule>,
    /// 요청 이름 → 플러그인 이름 (디렉토리명과 플러그인명이 다를 때)
    aliases: HashMap<String, String>,
}

impl LoaderState {
    fn resolve_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    fn remove(&mut self, name: &str) -> Option<LoadedModule> {
        let key = self.resolve_name(name).to_string();
        let module = self.modules.remove(&key)?;
        self.aliases.retain(|_, target| *target != key);
        Some(module)
    }
}

// ============================================================================
// PluginLoader
// ============================================================================

/// 플러그인 로더
pub struct PluginLoader {
    config: LoaderConfig,
    resolver: Arc<dyn ModuleResolver>,
    discovery: PluginDiscovery,
    state: RwLock<LoaderState>,
}

impl PluginLoader {
    pub fn new(config: LoaderConfig, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            discovery: PluginDiscovery::new(config.search_paths.clone()),
            config,
            resolver,
            state: RwLock::new(LoaderState::default()),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<dyn ModuleResolver> {
        &self.resolver
    }

    // ========================================================================
    // 발견 / 검증
    // ========================================================================

    /// 검색 경로의 플러그인 발견
    pub async fn discover(&self) -> Vec<DiscoveredPlugin> {
        self.discovery.discover().await
    }

    /// 매니페스트 구조 검증
    pub fn validate_manifest(&self, manifest: &ManifestFile) -> ManifestValidation {
        validate_manifest(manifest)
    }

    // ========================================================================
    // 로드
    // ========================================================================

    /// 이름으로 로드
    pub async fn load(&self, name: &str, options: LoadOptions) -> PluginLoadResult {
        if !options.force {
            if let Some(hit) = self.cached(name) {
                debug!("Plugin {} served from loader cache", name);
                return hit;
            }
        }

        let start = Instant::now();
        let mut candidate_error = None;

        for root in &self.config.search_paths {
            let candidate = root.join(name);
            if !ManifestFile::exists_in(&candidate) {
                continue;
            }

            let result = self.load_from_path(&candidate, options).await;
            if result.success {
                self.alias(name, result.name());
                return result;
            }
            candidate_error = result.error;
        }

        let specifier = ModuleSpecifier::Id(name.to_string());
        match self
            .load_module(specifier, None, LoadOrigin::Module(name.to_string()), start)
            .await
        {
            Ok(result) => {
                self.alias(name, result.name());
                result
            }
            Err(Error::NotFound(_)) => {
                let error = match candidate_error {
                    Some(message) => Error::load(name, message),
                    None => Error::NotFound(format!("plugin '{}'", name)),
                };
                warn!("Failed to load plugin {}: {}", name, error);
                PluginLoadResult::failure(name, &error, start.elapsed())
            }
            Err(error) => {
                warn!("Failed to load plugin {}: {}", name, error);
                PluginLoadResult::failure(name, &error, start.elapsed())
            }
        }
    }

    /// 디렉토리에서 로드
    ///
    /// 매니페스트를 읽고 (옵션에 따라) 검증한 뒤 `main`을 해석합니다.
    /// 캐시는 확인하지 않지만 결과는 캐시에 남깁니다.
    pub async fn load_from_path(&self, path: &Path, options: LoadOptions) -> PluginLoadResult {
        let start = Instant::now();
        let label = path.display().to_string();
        let validate = options.validate.unwrap_or(self.config.validate);

        let prepared = async {
            let file = ManifestFile::read_from_dir(path)
                .await
                .map_err(|e| Error::load(&label, format!("Failed to read manifest: {}", e)))?;
            let manifest = PluginManifest::from_file(&file, validate)?;
            if manifest.main.trim().is_empty() {
                return Err(Error::load(&manifest.name, "manifest has no main entry"));
            }
            Ok(manifest)
        }
        .await;

        let manifest = match prepared {
            Ok(manifest) => manifest,
            Err(error) => {
                warn!("Failed to load plugin from {}: {}", label, error);
                return PluginLoadResult::failure(&label, &error, start.elapsed());
            }
        };

        let name = manifest.name.clone();
        let specifier = ModuleSpecifier::Entry {
            root: path.to_path_buf(),
            main: manifest.main.clone(),
        };
        match self
            .load_module(specifier, Some(manifest), LoadOrigin::Path(path.to_path_buf()), start)
            .await
        {
            Ok(result) => result,
            Err(error) => {
                warn!("Failed to load plugin {}: {}", name, error);
                PluginLoadResult::failure(&name, &error, start.elapsed())
            }
        }
    }

    /// 모듈 해석 + 인스턴스 생성 (타임아웃 적용) 후 캐시
    async fn load_module(
        &self,
        specifier: ModuleSpecifier,
        manifest: Option<PluginManifest>,
        origin: LoadOrigin,
        start: Instant,
    ) -> Result<PluginLoadResult> {
        let label = manifest
            .as_ref()
            .map(|m| m.name.clone())
            .unwrap_or_else(|| specifier.display_name());
        let timeout = self.config.load_timeout;

        let resolve = async {
            let export = self.resolver.resolve(&specifier).await?;
            guard::isolate(export.instantiate())
                .await
                .map_err(|e| Error::load(&label, format!("factory failed: {}", e)))
        };

        let plugin = tokio::time::timeout(timeout, resolve)
            .await
            .map_err(|_| Error::LoadTimeout {
                name: label.clone(),
                timeout_ms: timeout.as_millis() as u64,
            })??;

        if let Some(manifest) = &manifest {
            if manifest.name != plugin.name() {
                return Err(Error::load(
                    &label,
                    format!(
                        "manifest name '{}' does not match plugin name '{}'",
                        manifest.name,
                        plugin.name()
                    ),
                ));
            }
        }

        let load_time = start.elapsed();
        let hooks = plugin.hooks();
        let metadata = PluginMetadata {
            name: plugin.name().to_string(),
            version: plugin.version().to_string(),
            plugin_type: manifest
                .as_ref()
                .map(|m| m.plugin_type)
                .unwrap_or_else(|| plugin.plugin_type()),
            status: PluginStatus::Loading,
            hooks: hooks.to_vec(),
            capabilities: manifest
                .as_ref()
                .map(|m| m.capabilities.clone())
                .unwrap_or_else(|| plugin.capabilities()),
            priority: manifest
                .as_ref()
                .map(|m| m.priority)
                .unwrap_or(DEFAULT_PRIORITY),
            last_error: None,
            load_time,
            init_time: Duration::ZERO,
            registered_at: Utc::now(),
        };

        info!(
            "Loaded plugin: {} (v{}) from {} in {:?}",
            metadata.name, metadata.version, specifier, load_time
        );

        let module = LoadedModule {
            plugin,
            manifest,
            metadata,
            origin,
        };
        let result = module.to_result(false);
        self.state
            .write()
            .modules
            .insert(result.name().to_string(), module);
        Ok(result)
    }

    /// Error 상태 항목은 캐시 히트로 취급하지 않음
    fn cached(&self, name: &str) -> Option<PluginLoadResult> {
        let state = self.state.read();
        state
            .modules
            .get(state.resolve_name(name))
            .filter(|module| module.metadata.status != PluginStatus::Error)
            .map(|module| module.to_result(true))
    }

    fn alias(&self, requested: &str, name: &str) {
        if requested != name {
            self.state
                .write()
                .aliases
                .insert(requested.to_string(), name.to_string());
        }
    }

    // ========================================================================
    // 언로드 / 리로드
    // ========================================================================

    /// 언로드 (destroy 호출, 에러는 로그만)
    pub async fn unload(&self, name: &str) -> bool {
        let removed = self.state.write().remove(name);
        let Some(module) = removed else {
            return false;
        };

        if let Err(e) = guard::isolate(module.plugin.destroy()).await {
            warn!("Failed to destroy plugin {} during unload: {}", name, e);
        }
        debug!("Unloaded plugin: {}", name);
        true
    }

    /// 언로드 후 기록된 출처에서 다시 로드 (캐시 무시)
    pub async fn reload(&self, name: &str) -> PluginLoadResult {
        let origin = self.origin(name);
        self.unload(name).await;
        self.load_from_origin(name, origin).await
    }

    /// 기존 인스턴스를 유지한 채 새 인스턴스 로드
    ///
    /// 성공하면 캐시가 새 인스턴스로 바뀝니다. 기존 인스턴스 정리는 호출자 몫입니다.
    pub async fn refresh(&self, name: &str) -> PluginLoadResult {
        let origin = self.origin(name);
        self.load_from_origin(name, origin).await
    }

    async fn load_from_origin(&self, name: &str, origin: Option<LoadOrigin>) -> PluginLoadResult {
        match origin {
            Some(LoadOrigin::Path(path)) => self.load_from_path(&path, LoadOptions::forced()).await,
            Some(LoadOrigin::Module(id)) => self.load(&id, LoadOptions::forced()).await,
            None => self.load(name, LoadOptions::forced()).await,
        }
    }

    /// 모든 캐시 비우기 (destroy 호출 안 함), 비운 플러그인 반환
    pub fn drain(&self) -> Vec<(String, Arc<dyn Plugin>)> {
        let mut state = self.state.write();
        state.aliases.clear();
        state
            .modules
            .drain()
            .map(|(name, module)| (name, module.plugin))
            .collect()
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 캐시된 메타데이터를 Error 상태로 표시
    ///
    /// 표시된 항목은 다음 `load`에서 새로 해석됩니다.
    pub fn mark_error(&self, name: &str, message: impl Into<String>) -> bool {
        let mut state = self.state.write();
        let key = state.resolve_name(name).to_string();
        match state.modules.get_mut(&key) {
            Some(module) => {
                module.metadata.status = PluginStatus::Error;
                module.metadata.last_error = Some(message.into());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        let state = self.state.read();
        state
            .modules
            .get(state.resolve_name(name))
            .map(|m| Arc::clone(&m.plugin))
    }

    pub fn manifest(&self, name: &str) -> Option<PluginManifest> {
        let state = self.state.read();
        state
            .modules
            .get(state.resolve_name(name))
            .and_then(|m| m.manifest.clone())
    }

    pub fn metadata(&self, name: &str) -> Option<PluginMetadata> {
        let state = self.state.read();
        state
            .modules
            .get(state.resolve_name(name))
            .map(|m| m.metadata.clone())
    }

    pub fn origin(&self, name: &str) -> Option<LoadOrigin> {
        let state = self.state.read();
        state
            .modules
            .get(state.resolve_name(name))
            .map(|m| m.origin.clone())
    }

    /// 디렉토리에서 로드된 경우 그 경로
    pub fn plugin_path(&self, name: &str) -> Option<PathBuf> {
        match self.origin(name)? {
            LoadOrigin::Path(path) => Some(path),
            LoadOrigin::Module(_) => None,
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        let state = self.state.read();
        state.modules.contains_key(state.resolve_name(name))
    }

    pub fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().modules.keys().cloned().collect();
        names.sort();
        names
    }
}
