//! Plugin Discovery - 플러그인 발견
//!
//! 검색 경로의 하위 디렉토리마다 `plugin.json`을 찾아 검증합니다.
//!
//! - 읽을 수 없는 검색 경로: 경고 후 건너뜀
//! - 매니페스트 없는 디렉토리: 조용히 건너뜀
//! - 읽기/파싱 실패: debug 로그 후 건너뜀
//! - 파싱은 되지만 구조가 잘못됨: `valid: false`로 반환

use super::manifest::{validate_manifest, ManifestFile};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use weave_foundation::{Error, Result};

// ============================================================================
// DiscoveredPlugin - 발견된 플러그인
// ============================================================================

/// 발견된 플러그인 정보
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    /// 원시 매니페스트
    pub manifest: ManifestFile,

    /// 플러그인 디렉토리 경로
    pub path: PathBuf,

    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl DiscoveredPlugin {
    pub fn name(&self) -> &str {
        self.manifest.display_name()
    }
}

// ============================================================================
// PluginDiscovery - 플러그인 발견 시스템
// ============================================================================

/// 플러그인 발견 시스템
#[derive(Debug, Clone, Default)]
pub struct PluginDiscovery {
    /// 검색 경로들 (순서대로 스캔)
    search_paths: Vec<PathBuf>,
}

impl PluginDiscovery {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// 검색 경로 추가
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// 모든 플러그인 발견
    pub async fn discover(&self) -> Vec<DiscoveredPlugin> {
        let mut plugins = Vec::new();

        for path in &self.search_paths {
            match self.scan_directory(path).await {
                Ok(found) => plugins.extend(found),
                Err(e) => warn!("Skipping search path: {}", e),
            }
        }

        info!("Discovered {} plugins", plugins.len());
        plugins
    }

    /// 검색 경로 하나 스캔
    async fn scan_directory(&self, dir: &Path) -> Result<Vec<DiscoveredPlugin>> {
        let discovery_error = |e: std::io::Error| Error::Discovery {
            path: dir.display().to_string(),
            message: e.to_string(),
        };

        let mut entries = fs::read_dir(dir).await.map_err(discovery_error)?;
        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(discovery_error)? {
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        // 플랫폼마다 read_dir 순서가 다르므로 정렬
        dirs.sort();

        let mut plugins = Vec::new();
        for path in dirs {
            if !ManifestFile::exists_in(&path) {
                continue;
            }

            match ManifestFile::read_from_dir(&path).await {
                Ok(manifest) => {
                    let validation = validate_manifest(&manifest);
                    debug!(
                        "Found plugin: {} at {:?} (valid: {})",
                        manifest.display_name(),
                        path,
                        validation.valid
                    );
                    plugins.push(DiscoveredPlugin {
                        manifest,
                        path,
                        valid: validation.valid,
                        errors: validation.errors,
                        warnings: validation.warnings,
                    });
                }
                Err(e) => {
                    debug!("Unreadable plugin manifest in {:?}: {}", path, e);
                }
            }
        }

        Ok(plugins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::manifest::MANIFEST_FILE;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_manifest(root: &Path, dir: &str, content: &str) {
        let plugin_dir = root.join(dir);
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join(MANIFEST_FILE), content).unwrap();
    }

    #[tokio::test]
    async fn test_discover_mixed_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        write_manifest(
            root,
            "good",
            &json!({
                "name": "good",
                "version": "1.0.0",
                "plugin": { "type": "exporter", "main": "good" }
            })
            .to_string(),
        );
        write_manifest(root, "broken", &json!({ "name": "broken" }).to_string());
        write_manifest(root, "garbage", "{ not json");
        std::fs::create_dir_all(root.join("empty")).unwrap();

        let discovery = PluginDiscovery::new(vec![root.to_path_buf()]);
        let found = discovery.discover().await;

        assert_eq!(found.len(), 2);
        // 정렬 순서: broken, good
        assert_eq!(found[0].name(), "broken");
        assert!(!found[0].valid);
        assert!(!found[0].errors.is_empty());
        assert_eq!(found[1].name(), "good");
        assert!(found[1].valid);
    }

    #[tokio::test]
    async fn test_missing_search_path_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            "only",
            &json!({ "name": "only", "version": "1", "plugin": { "type": "hook", "main": "m" } })
                .to_string(),
        );

        let discovery = PluginDiscovery::new(vec![
            temp.path().join("does-not-exist"),
            temp.path().to_path_buf(),
        ]);
        let found = discovery.discover().await;
        assert_eq!(found.len(), 1);
    }
}
