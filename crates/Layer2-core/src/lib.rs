//! weave-core: Plugin Runtime for Weave
//!
//! Layer2 - 플러그인 로더 / 레지스트리 / 매니저
//!
//! # 주요 모듈
//!
//! - `plugin`: 플러그인 발견, 로드, 등록, 훅 디스패치, 생명주기 관리
//!
//! # 사용 예시
//!
//! ```ignore
//! use weave_core::{HookName, PluginManager, StaticModuleTable};
//! use weave_foundation::WeaveConfig;
//!
//! let modules = Arc::new(StaticModuleTable::new());
//! modules.register_instance("exporter", MarkdownExporter::new());
//!
//! let manager = PluginManager::new(WeaveConfig::load(None)?, modules);
//! let report = manager.initialize().await?;
//!
//! // 설치 (경로 또는 모듈 ID)
//! let installed = manager.install("./plugins/graph-metrics").await;
//!
//! // 훅 브로드캐스트
//! let results = manager.invoke_hook(HookName::OnAnalysisStart, &[]).await;
//!
//! manager.shutdown().await;
//! ```

pub mod plugin;

// Re-exports: Plugin
pub use plugin::{
    // Events
    events,
    // Context
    HostDependencies,
    // Traits
    HookName,
    HookReport,
    HookSet,
    // Loader
    LoadOptions,
    // Manager
    InitializeReport,
    InstallResult,
    ModuleResolver,
    Plugin,
    PluginApi,
    PluginContext,
    PluginExport,
    PluginLoadResult,
    PluginLoader,
    PluginManager,
    // Manifest
    PluginManifest,
    PluginMetadata,
    // Registry
    PluginRegistry,
    PluginStatus,
    PluginType,
    RegistryStats,
    // Modules
    StaticModuleTable,
    UpdateResult,
};

// Layer1 re-exports
pub use weave_foundation::{Error, Result};

/// Layer2 버전
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_plugin_exports() {
        let manifest = PluginManifest::new("exporter", "1.0.0").with_type(PluginType::Exporter);
        assert_eq!(manifest.priority, plugin::DEFAULT_PRIORITY);
        assert_eq!(HookName::ALL.len(), 13);
    }
}
