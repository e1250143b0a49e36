//! # Plugin System
//!
//! Weave 플러그인 런타임
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PluginManager                         │
//! │   initialize / install / uninstall / update / shutdown       │
//! │                                                              │
//! │  ┌─────────────────────┐        ┌─────────────────────────┐  │
//! │  │    PluginLoader     │        │     PluginRegistry      │  │
//! │  │  - discovery        │        │  - metadata / status    │  │
//! │  │  - manifest 검증    │  ───▶  │  - hook index (priority)│  │
//! │  │  - ModuleResolver   │        │  - execute_hook         │  │
//! │  │  - cache / timeout  │        │  - clear                │  │
//! │  └─────────────────────┘        └─────────────────────────┘  │
//! │                                                              │
//! │  PluginContext (플러그인당 하나)                              │
//! │   graph / cache / database / logger / config / events / api  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let table = StaticModuleTable::new();
//! table.register_factory("graph-metrics", || Ok(GraphMetrics::default()));
//!
//! let manager = PluginManager::new(WeaveConfig::load(Some(&root))?, Arc::new(table));
//! manager.initialize().await?;
//! manager.invoke_hook(HookName::OnGraphLoad, &[json!({ "nodes": 42 })]).await;
//! manager.shutdown().await;
//! ```

mod context;
mod discovery;
pub mod events;
mod guard;
mod loader;
mod manager;
mod manifest;
mod module;
mod registry;
mod traits;

pub use context::{
    CommandHandler, CommandTable, HostDependencies, PluginApi, PluginContext, RegisteredCommand,
};
pub use discovery::{DiscoveredPlugin, PluginDiscovery};
pub use loader::{
    LoadOptions, LoadOrigin, LoaderConfig, PluginLoadResult, PluginLoader, DEFAULT_LOAD_TIMEOUT,
};
pub use manager::{InitializeReport, InstallResult, PluginManager, PluginSummary, UpdateResult};
pub use manifest::{
    validate_manifest, ManifestDeclaration, ManifestFile, ManifestValidation, PluginManifest,
    DEFAULT_PRIORITY, MANIFEST_FILE,
};
pub use module::{ModuleResolver, ModuleSpecifier, PluginExport, PluginFactory, StaticModuleTable};
pub use registry::{HookOutcome, HookReport, PluginMetadata, PluginRegistry, RegistryStats};
pub use traits::{HookName, HookSet, Plugin, PluginStatus, PluginType};
