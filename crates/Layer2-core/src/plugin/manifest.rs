//! Plugin Manifest - 플러그인 메타데이터 정의
//!
//! 디스크의 `plugin.json`:
//!
//! ```json
//! {
//!   "name": "graph-metrics",
//!   "version": "1.0.0",
//!   "description": "Centrality metrics",
//!   "author": "weave",
//!   "plugin": {
//!     "type": "analyzer",
//!     "main": "metrics",
//!     "hooks": ["onNodeAdd", "onShutdown"],
//!     "priority": 50,
//!     "capabilities": ["metrics"]
//!   }
//! }
//! ```
//!
//! 파싱은 되지만 구조가 잘못된 매니페스트도 보고해야 하므로
//! 원시 형태(`ManifestFile`)와 검증된 형태(`PluginManifest`)를 분리합니다.

use super::traits::{HookName, HookSet, Plugin, PluginType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use weave_foundation::{Error, Result};

/// 매니페스트 파일명
pub const MANIFEST_FILE: &str = "plugin.json";

/// 기본 디스패치 우선순위 (낮을수록 먼저)
pub const DEFAULT_PRIORITY: i32 = 100;

// ============================================================================
// ManifestFile - 원시 JSON 형태
// ============================================================================

/// plugin.json 원시 구조 (모든 필드 선택)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// 선언 블록
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<ManifestDeclaration>,
}

/// `plugin` 선언 블록
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestDeclaration {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub plugin_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default)]
    pub hooks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl ManifestFile {
    /// JSON 문자열 파싱
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// 디렉토리의 plugin.json 읽기
    pub async fn read_from_dir(dir: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(dir.join(MANIFEST_FILE)).await?;
        Self::parse(&content)
    }

    /// 디렉토리에 plugin.json 존재 여부
    pub fn exists_in(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

// ============================================================================
// Validation
// ============================================================================

/// 매니페스트 검증 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ManifestValidation {
    pub fn into_result(self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(Error::ManifestValidation(self.errors))
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// 구조 검증 (부작용 없음)
///
/// 필수: `name`, `version`, `plugin.type`, `plugin.main`.
/// 권장 필드 누락과 알 수 없는 훅은 경고로만 남깁니다.
pub fn validate_manifest(manifest: &ManifestFile) -> ManifestValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if is_blank(&manifest.name) {
        errors.push("Missing required field: name".to_string());
    }
    if is_blank(&manifest.version) {
        errors.push("Missing required field: version".to_string());
    }

    match &manifest.plugin {
        None => errors.push("Missing required block: plugin".to_string()),
        Some(decl) => {
            match decl.plugin_type.as_deref().map(str::trim) {
                None | Some("") => errors.push("Missing required field: plugin.type".to_string()),
                Some(t) => {
                    if t.parse::<PluginType>().is_err() {
                        errors.push(format!("Unknown plugin type: {}", t));
                    }
                }
            }
            if is_blank(&decl.main) {
                errors.push("Missing required field: plugin.main".to_string());
            }
            for hook in &decl.hooks {
                if hook.parse::<HookName>().is_err() {
                    warnings.push(format!("Unknown hook ignored: {}", hook));
                }
            }
        }
    }

    if is_blank(&manifest.description) {
        warnings.push("Missing recommended field: description".to_string());
    }
    if is_blank(&manifest.author) {
        warnings.push("Missing recommended field: author".to_string());
    }

    ManifestValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

// ============================================================================
// PluginManifest - 검증된 형태
// ============================================================================

/// 검증된 플러그인 매니페스트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    pub plugin_type: PluginType,
    /// 진입점 (매니페스트 기준 상대 경로)
    pub main: String,
    pub hooks: Vec<HookName>,
    pub priority: i32,
    pub capabilities: Vec<String>,
}

impl PluginManifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            author: None,
            license: None,
            plugin_type: PluginType::Generic,
            main: String::new(),
            hooks: Vec::new(),
            priority: DEFAULT_PRIORITY,
            capabilities: Vec::new(),
        }
    }

    /// 원시 매니페스트 변환
    ///
    /// `validate`가 false면 누락된 필드를 기본값으로 채웁니다.
    pub fn from_file(file: &ManifestFile, validate: bool) -> Result<Self> {
        if validate {
            validate_manifest(file).into_result()?;
        }

        let decl = file.plugin.clone().unwrap_or_default();
        let plugin_type = decl
            .plugin_type
            .as_deref()
            .and_then(|t| t.trim().parse().ok())
            .unwrap_or_default();

        Ok(Self {
            name: file.name.clone().unwrap_or_default(),
            version: file.version.clone().unwrap_or_default(),
            description: file.description.clone(),
            author: file.author.clone(),
            license: file.license.clone(),
            plugin_type,
            main: decl.main.unwrap_or_default(),
            hooks: decl.hooks.iter().filter_map(|h| h.parse().ok()).collect(),
            priority: decl.priority.unwrap_or(DEFAULT_PRIORITY),
            capabilities: decl.capabilities,
        })
    }

    /// 인스턴스에서 매니페스트 합성 (디스크 매니페스트가 없을 때)
    pub fn synthesize(plugin: &dyn Plugin) -> Self {
        Self::new(plugin.name(), plugin.version())
            .with_type(plugin.plugin_type())
            .with_hooks(plugin.hooks())
            .with_capabilities(plugin.capabilities())
    }

    pub fn hook_set(&self) -> HookSet {
        self.hooks.iter().copied().collect()
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_type(mut self, plugin_type: PluginType) -> Self {
        self.plugin_type = plugin_type;
        self
    }

    pub fn with_main(mut self, main: impl Into<String>) -> Self {
        self.main = main.into();
        self
    }

    pub fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = hooks.to_vec();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "name": "graph-metrics",
            "version": "1.0.0",
            "plugin": { "type": "analyzer", "main": "metrics" }
        })
    }

    #[test]
    fn test_minimal_manifest_is_valid() {
        let file: ManifestFile = serde_json::from_value(minimal()).unwrap();
        let result = validate_manifest(&file);

        assert!(result.valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
        // description, author 누락은 경고
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_each_required_field_rejected() {
        let cases = [
            ("/name", "name"),
            ("/version", "version"),
            ("/plugin/type", "plugin.type"),
            ("/plugin/main", "plugin.main"),
        ];

        for (pointer, field) in cases {
            let mut value = minimal();
            let (parent, key) = pointer.rsplit_once('/').unwrap();
            value
                .pointer_mut(if parent.is_empty() { "" } else { parent })
                .unwrap()
                .as_object_mut()
                .unwrap()
                .remove(key);

            let file: ManifestFile = serde_json::from_value(value).unwrap();
            let result = validate_manifest(&file);
            assert!(!result.valid, "missing {} accepted", field);
            assert!(result.errors.iter().any(|e| e.contains(field)));
        }
    }

    #[test]
    fn test_unknown_type_and_hooks() {
        let file: ManifestFile = serde_json::from_value(json!({
            "name": "x",
            "version": "1",
            "description": "d",
            "author": "a",
            "plugin": { "type": "widget", "main": "x", "hooks": ["onNodeAdd", "onTeleport"] }
        }))
        .unwrap();

        let result = validate_manifest(&file);
        assert!(!result.valid);
        assert!(result.errors[0].contains("widget"));
        assert_eq!(result.warnings, vec!["Unknown hook ignored: onTeleport"]);
    }

    #[test]
    fn test_from_file_defaults() {
        let file: ManifestFile = serde_json::from_value(minimal()).unwrap();
        let manifest = PluginManifest::from_file(&file, true).unwrap();

        assert_eq!(manifest.plugin_type, PluginType::Analyzer);
        assert_eq!(manifest.priority, DEFAULT_PRIORITY);
        assert!(manifest.hooks.is_empty());
    }

    #[test]
    fn test_from_file_invalid_message() {
        let file = ManifestFile {
            name: Some("broken".into()),
            ..Default::default()
        };
        let err = PluginManifest::from_file(&file, true).unwrap_err();
        assert!(err.to_string().starts_with("Invalid manifest"));

        // 검증을 끄면 기본값으로 채움
        let manifest = PluginManifest::from_file(&file, false).unwrap();
        assert_eq!(manifest.name, "broken");
        assert_eq!(manifest.plugin_type, PluginType::Generic);
    }
}
