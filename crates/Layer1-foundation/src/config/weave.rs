//! Weave Config - 런타임 통합 설정
//!
//! 글로벌(~/.config/weave/weave.json)과 프로젝트(.weave/weave.json)를
//! 순서대로 읽어 병합합니다. 프로젝트 값이 우선합니다.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 설정 파일명
pub const WEAVE_CONFIG_FILE: &str = "weave.json";

const DEFAULT_MAX_CONCURRENCY: usize = 5;
const DEFAULT_LOAD_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// Weave Config (통합)
// ============================================================================

/// Weave 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaveConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 프로젝트 루트 (플러그인 컨텍스트에 전달)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,

    /// 로그 레벨 (RUST_LOG가 없을 때 사용)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// 모든 플러그인에 전달되는 전역 설정
    #[serde(default = "empty_object")]
    pub global: Value,

    /// 플러그인 런타임 설정
    #[serde(default)]
    pub plugins: PluginSettings,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            project_root: None,
            log_level: None,
            global: empty_object(),
            plugins: PluginSettings::default(),
        }
    }
}

impl WeaveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load(project_root: Option<&Path>) -> Result<Self> {
        let global = JsonStore::global().ok();
        let project = project_root.map(JsonStore::project);
        let mut config = Self::load_from(global.as_ref(), project.as_ref())?;

        if config.project_root.is_none() {
            config.project_root = project_root.map(Path::to_path_buf);
        }
        Ok(config)
    }

    /// 지정한 저장소들에서 병합 로드 (앞의 것이 먼저 적용됨)
    pub fn load_from(global: Option<&JsonStore>, project: Option<&JsonStore>) -> Result<Self> {
        let mut config = Self::new();

        for store in [global, project].into_iter().flatten() {
            if let Some(layer) = store.load_optional::<ConfigLayer>(WEAVE_CONFIG_FILE)? {
                config.apply(layer);
            }
        }

        Ok(config)
    }

    /// 글로벌 설정 저장
    pub fn save_global(&self) -> Result<()> {
        JsonStore::global()?.save(WEAVE_CONFIG_FILE, self)
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self, project_root: &Path) -> Result<()> {
        JsonStore::project(project_root).save(WEAVE_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    ///
    /// `other`의 스칼라 값은 모두 명시된 것으로 보고 덮어씁니다.
    /// 파일에서 읽은 설정은 적힌 키만 적용됩니다 (`load_from`).
    pub fn merge(&mut self, other: WeaveConfig) {
        self.apply(ConfigLayer::from(other));
    }

    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(version) = layer.version {
            self.version = self.version.max(version);
        }
        if layer.project_root.is_some() {
            self.project_root = layer.project_root;
        }
        if layer.log_level.is_some() {
            self.log_level = layer.log_level;
        }
        if let Some(global) = layer.global {
            merge_objects(&mut self.global, global);
        }
        if let Some(plugins) = layer.plugins {
            self.plugins.apply(plugins);
        }
    }

    /// 특정 플러그인 설정 (없으면 빈 객체)
    pub fn plugin_settings(&self, name: &str) -> Value {
        self.plugins
            .settings
            .get(name)
            .cloned()
            .unwrap_or_else(empty_object)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_global(mut self, global: Value) -> Self {
        self.global = global;
        self
    }

    pub fn with_plugins(mut self, plugins: PluginSettings) -> Self {
        self.plugins = plugins;
        self
    }
}

// ============================================================================
// Plugin Settings
// ============================================================================

/// 플러그인 로딩/초기화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSettings {
    /// 플러그인 검색 경로 (각 하위 디렉토리가 후보)
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// 초기화 시 이름으로 로드할 플러그인
    #[serde(default)]
    pub auto_load: Vec<String>,

    /// 발견된 유효 플러그인을 모두 로드
    #[serde(default)]
    pub auto_load_discovered: bool,

    /// 동시 로드 수
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// 모듈 로드 타임아웃 (ms)
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    /// 디스커버리 타임아웃 (ms, 없으면 무제한)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_timeout_ms: Option<u64>,

    /// 매니페스트 검증 여부
    #[serde(default = "default_true")]
    pub validate_manifests: bool,

    /// 플러그인별 설정 (이름 → JSON)
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            auto_load: Vec::new(),
            auto_load_discovered: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            discovery_timeout_ms: None,
            validate_manifests: true,
            settings: BTreeMap::new(),
        }
    }
}

impl PluginSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Option<Duration> {
        self.discovery_timeout_ms.map(Duration::from_millis)
    }

    /// 레이어 적용: 목록은 중복 없이 추가, 스칼라는 명시된 것만 덮어쓰기
    fn apply(&mut self, layer: PluginSettingsLayer) {
        for path in layer.search_paths {
            if !self.search_paths.contains(&path) {
                self.search_paths.push(path);
            }
        }
        for name in layer.auto_load {
            if !self.auto_load.contains(&name) {
                self.auto_load.push(name);
            }
        }
        if let Some(enabled) = layer.auto_load_discovered {
            self.auto_load_discovered = enabled;
        }
        if let Some(max) = layer.max_concurrency {
            self.max_concurrency = max;
        }
        if let Some(timeout) = layer.load_timeout_ms {
            self.load_timeout_ms = timeout;
        }
        if layer.discovery_timeout_ms.is_some() {
            self.discovery_timeout_ms = layer.discovery_timeout_ms;
        }
        if let Some(validate) = layer.validate_manifests {
            self.validate_manifests = validate;
        }
        self.settings.extend(layer.settings);
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn with_auto_load(mut self, name: impl Into<String>) -> Self {
        self.auto_load.push(name.into());
        self
    }

    pub fn with_auto_load_discovered(mut self, enabled: bool) -> Self {
        self.auto_load_discovered = enabled;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_manifests = validate;
        self
    }

    pub fn with_settings(mut self, name: impl Into<String>, settings: Value) -> Self {
        self.settings.insert(name.into(), settings);
        self
    }
}

// ============================================================================
// 설정 레이어 (파일에 적힌 키만)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigLayer {
    version: Option<u32>,
    project_root: Option<PathBuf>,
    log_level: Option<String>,
    global: Option<Value>,
    plugins: Option<PluginSettingsLayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PluginSettingsLayer {
    search_paths: Vec<PathBuf>,
    auto_load: Vec<String>,
    auto_load_discovered: Option<bool>,
    max_concurrency: Option<usize>,
    load_timeout_ms: Option<u64>,
    discovery_timeout_ms: Option<u64>,
    validate_manifests: Option<bool>,
    settings: BTreeMap<String, Value>,
}

impl From<WeaveConfig> for ConfigLayer {
    fn from(config: WeaveConfig) -> Self {
        Self {
            version: Some(config.version),
            project_root: config.project_root,
            log_level: config.log_level,
            global: Some(config.global),
            plugins: Some(config.plugins.into()),
        }
    }
}

impl From<PluginSettings> for PluginSettingsLayer {
    fn from(settings: PluginSettings) -> Self {
        Self {
            search_paths: settings.search_paths,
            auto_load: settings.auto_load,
            auto_load_discovered: Some(settings.auto_load_discovered),
            max_concurrency: Some(settings.max_concurrency),
            load_timeout_ms: Some(settings.load_timeout_ms),
            discovery_timeout_ms: settings.discovery_timeout_ms,
            validate_manifests: Some(settings.validate_manifests),
            settings: settings.settings,
        }
    }
}

/// 객체끼리는 키 단위로 재귀 병합, 그 외에는 덮어쓰기
fn merge_objects(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_objects(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn default_version() -> u32 {
    1
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_load_timeout_ms() -> u64 {
    DEFAULT_LOAD_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = WeaveConfig::new();
        assert_eq!(config.version, 1);
        assert_eq!(config.plugins.max_concurrency, 5);
        assert_eq!(config.plugins.load_timeout(), Duration::from_secs(30));
        assert!(config.plugins.discovery_timeout().is_none());
        assert!(config.plugins.validate_manifests);
        assert_eq!(config.global, json!({}));
    }

    #[test]
    fn test_parse_camel_case() {
        let config: WeaveConfig = serde_json::from_value(json!({
            "logLevel": "debug",
            "plugins": {
                "searchPaths": ["plugins"],
                "autoLoad": ["indexer"],
                "maxConcurrency": 2,
                "discoveryTimeoutMs": 500,
                "settings": { "indexer": { "depth": 3 } }
            }
        }))
        .unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.plugins.search_paths, vec![PathBuf::from("plugins")]);
        assert_eq!(config.plugins.max_concurrency, 2);
        assert_eq!(config.plugins.load_timeout_ms, 30_000);
        assert_eq!(
            config.plugins.discovery_timeout(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(config.plugin_settings("indexer"), json!({ "depth": 3 }));
        assert_eq!(config.plugin_settings("other"), json!({}));
    }

    #[test]
    fn test_merge_project_over_global() {
        let mut base = WeaveConfig::new()
            .with_log_level("info")
            .with_global(json!({ "theme": { "dark": true, "accent": "red" } }))
            .with_plugins(PluginSettings::new().with_search_path("/global/plugins"));

        let overlay = WeaveConfig::new()
            .with_log_level("trace")
            .with_global(json!({ "theme": { "accent": "blue" } }))
            .with_plugins(
                PluginSettings::new()
                    .with_search_path("./plugins")
                    .with_max_concurrency(8),
            );

        base.merge(overlay);

        assert_eq!(base.log_level.as_deref(), Some("trace"));
        assert_eq!(
            base.global,
            json!({ "theme": { "dark": true, "accent": "blue" } })
        );
        assert_eq!(base.plugins.search_paths.len(), 2);
        assert_eq!(base.plugins.max_concurrency, 8);
    }

    #[test]
    fn test_load_from_stores() {
        let global_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        let global = JsonStore::new(global_dir.path());
        let project = JsonStore::project(project_dir.path());

        global
            .save(
                WEAVE_CONFIG_FILE,
                &json!({ "plugins": { "autoLoad": ["a"], "loadTimeoutMs": 1000 } }),
            )
            .unwrap();
        project
            .save(WEAVE_CONFIG_FILE, &json!({ "plugins": { "autoLoad": ["b"] } }))
            .unwrap();

        let config = WeaveConfig::load_from(Some(&global), Some(&project)).unwrap();
        assert_eq!(config.plugins.auto_load, vec!["a", "b"]);
        assert_eq!(config.plugins.load_timeout_ms, 1000);
    }

    #[test]
    fn test_project_layer_overrides_only_written_keys() {
        let global_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        let global = JsonStore::new(global_dir.path());
        let project = JsonStore::project(project_dir.path());

        global
            .save(
                WEAVE_CONFIG_FILE,
                &json!({
                    "plugins": {
                        "maxConcurrency": 2,
                        "loadTimeoutMs": 1000,
                        "validateManifests": false,
                        "autoLoadDiscovered": true
                    }
                }),
            )
            .unwrap();
        // 기본값과 같은 값도 명시했으면 적용
        project
            .save(
                WEAVE_CONFIG_FILE,
                &json!({
                    "plugins": {
                        "maxConcurrency": 5,
                        "loadTimeoutMs": 30000,
                        "autoLoadDiscovered": false
                    }
                }),
            )
            .unwrap();

        let config = WeaveConfig::load_from(Some(&global), Some(&project)).unwrap();
        assert_eq!(config.plugins.max_concurrency, 5);
        assert_eq!(config.plugins.load_timeout_ms, 30_000);
        assert!(!config.plugins.auto_load_discovered);
        // 프로젝트 파일에 없으므로 글로벌 값 유지
        assert!(!config.plugins.validate_manifests);
    }

    #[test]
    fn test_save_project_roundtrip() {
        let temp = TempDir::new().unwrap();
        let config = WeaveConfig::new().with_log_level("warn");
        config.save_project(temp.path()).unwrap();

        let loaded = WeaveConfig::load_from(None, Some(&JsonStore::project(temp.path()))).unwrap();
        assert_eq!(loaded.log_level.as_deref(), Some("warn"));
    }
}
