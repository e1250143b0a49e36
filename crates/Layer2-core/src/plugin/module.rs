//! Module resolution - 플러그인 코드 단위 해석
//!
//! 컴파일된 플러그인은 프로세스 시작 시 정적 테이블에 export를 등록하고,
//! 로더는 매니페스트의 `main`(또는 모듈 ID)으로 그 export를 찾습니다.
//! 로더는 `ModuleResolver`만 알기 때문에 dylib/WASM 기반 리졸버로
//! 교체할 수 있습니다.

use super::traits::Plugin;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use weave_foundation::{Error, Result};

// ============================================================================
// ModuleSpecifier
// ============================================================================

/// 로드할 모듈 지정
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSpecifier {
    /// 플러그인 디렉토리 + 매니페스트의 `main`
    Entry { root: PathBuf, main: String },
    /// 전역 모듈 ID (검색 경로에서 못 찾았을 때)
    Id(String),
}

impl ModuleSpecifier {
    /// 로그/에러용 이름
    pub fn display_name(&self) -> String {
        match self {
            Self::Entry { root, main } => root.join(main).display().to_string(),
            Self::Id(id) => id.clone(),
        }
    }
}

impl fmt::Display for ModuleSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

// ============================================================================
// PluginExport
// ============================================================================

/// 플러그인을 만드는 팩토리 (비동기)
pub type PluginFactory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn Plugin>>> + Send + Sync>;

/// 모듈이 내보내는 값
#[derive(Clone)]
pub enum PluginExport {
    /// 이미 만들어진 인스턴스
    Instance(Arc<dyn Plugin>),
    /// 호출할 때마다 새 인스턴스를 만드는 팩토리
    Factory(PluginFactory),
}

impl PluginExport {
    pub fn instance(plugin: impl Plugin + 'static) -> Self {
        Self::Instance(Arc::new(plugin))
    }

    /// 동기 팩토리
    pub fn factory<P, F>(factory: F) -> Self
    where
        P: Plugin + 'static,
        F: Fn() -> Result<P> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move || {
            let plugin = factory().map(|p| Arc::new(p) as Arc<dyn Plugin>);
            futures::future::ready(plugin).boxed()
        }))
    }

    /// 비동기 팩토리
    pub fn async_factory<P, F, Fut>(factory: F) -> Self
    where
        P: Plugin + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<P>> + Send + 'static,
    {
        Self::Factory(Arc::new(move || {
            factory()
                .map(|r| r.map(|p| Arc::new(p) as Arc<dyn Plugin>))
                .boxed()
        }))
    }

    /// 인스턴스로 정규화
    pub async fn instantiate(&self) -> Result<Arc<dyn Plugin>> {
        match self {
            Self::Instance(plugin) => Ok(Arc::clone(plugin)),
            Self::Factory(factory) => factory().await,
        }
    }
}

impl fmt::Debug for PluginExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(plugin) => write!(f, "Instance({})", plugin.name()),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

// ============================================================================
// ModuleResolver
// ============================================================================

/// 모듈 지정 → export 해석
///
/// 해당 모듈이 없으면 `Error::NotFound`를 반환해야 합니다. 로더는 이것으로
/// "없음"과 "있지만 생성 실패"를 구분합니다.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(&self, specifier: &ModuleSpecifier) -> Result<PluginExport>;
}

/// 정적 등록 테이블
///
/// 키 조회 순서: `Entry`는 전체 경로 → `main`, `Id`는 ID 그대로.
#[derive(Default)]
pub struct StaticModuleTable {
    modules: RwLock<HashMap<String, PluginExport>>,
}

impl StaticModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// export 등록 (같은 키면 교체)
    pub fn register(&self, key: impl Into<String>, export: PluginExport) {
        self.modules.write().insert(key.into(), export);
    }

    pub fn register_instance(&self, key: impl Into<String>, plugin: impl Plugin + 'static) {
        self.register(key, PluginExport::instance(plugin));
    }

    pub fn register_factory<P, F>(&self, key: impl Into<String>, factory: F)
    where
        P: Plugin + 'static,
        F: Fn() -> Result<P> + Send + Sync + 'static,
    {
        self.register(key, PluginExport::factory(factory));
    }

    pub fn unregister(&self, key: &str) -> bool {
        self.modules.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.modules.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.modules.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn lookup(&self, specifier: &ModuleSpecifier) -> Option<PluginExport> {
        let modules = self.modules.read();
        match specifier {
            ModuleSpecifier::Entry { root, main } => {
                let full = root.join(main).display().to_string();
                modules.get(&full).or_else(|| modules.get(main)).cloned()
            }
            ModuleSpecifier::Id(id) => modules.get(id).cloned(),
        }
    }
}

#[async_trait]
impl ModuleResolver for StaticModuleTable {
    async fn resolve(&self, specifier: &ModuleSpecifier) -> Result<PluginExport> {
        self.lookup(specifier)
            .ok_or_else(|| Error::NotFound(format!("module '{}'", specifier)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo(&'static str);

    #[async_trait]
    impl Plugin for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn version(&self) -> &str {
            "1.0.0"
        }
    }

    #[tokio::test]
    async fn test_entry_lookup_prefers_full_path() {
        let table = StaticModuleTable::new();
        table.register_instance("main.rs", Echo("by-main"));
        table.register_instance(
            PathBuf::from("/plugins/a").join("main.rs").display().to_string(),
            Echo("by-path"),
        );

        let specifier = ModuleSpecifier::Entry {
            root: PathBuf::from("/plugins/a"),
            main: "main.rs".into(),
        };
        let plugin = table.resolve(&specifier).await.unwrap().instantiate().await.unwrap();
        assert_eq!(plugin.name(), "by-path");

        let other = ModuleSpecifier::Entry {
            root: PathBuf::from("/plugins/b"),
            main: "main.rs".into(),
        };
        let plugin = table.resolve(&other).await.unwrap().instantiate().await.unwrap();
        assert_eq!(plugin.name(), "by-main");
    }

    #[tokio::test]
    async fn test_factory_creates_fresh_instances() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let table = StaticModuleTable::new();
        table.register_factory("echo", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Echo("echo"))
        });

        let export = table
            .resolve(&ModuleSpecifier::Id("echo".into()))
            .await
            .unwrap();
        export.instantiate().await.unwrap();
        export.instantiate().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_async_factory() {
        let export = PluginExport::async_factory(|| async { Ok(Echo("later")) });
        assert_eq!(export.instantiate().await.unwrap().name(), "later");
    }

    #[tokio::test]
    async fn test_unknown_module() {
        let table = StaticModuleTable::new();
        let err = table
            .resolve(&ModuleSpecifier::Id("ghost".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.is_load_failure());
        assert!(err.to_string().contains("ghost"));
    }
}
