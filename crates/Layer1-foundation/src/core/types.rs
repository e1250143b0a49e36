//! Core Types - 외부 협력자와 주고받는 데이터 타입

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

// ============================================================================
// Graph
// ============================================================================

/// 지식 그래프 노드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// 노드 ID
    pub id: String,

    /// 노드 종류 (예: "document", "concept")
    pub kind: String,

    /// 속성
    #[serde(default)]
    pub properties: Value,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            properties: Value::Object(Map::new()),
        }
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

/// 지식 그래프 엣지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// 출발 노드 ID
    pub source: String,

    /// 도착 노드 ID
    pub target: String,

    /// 관계 이름 (예: "links_to")
    pub relation: String,

    /// 속성
    #[serde(default)]
    pub properties: Value,
}

impl GraphEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
            properties: Value::Object(Map::new()),
        }
    }
}

/// 그래프 질의 조건
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQuery {
    /// 노드 종류 필터
    pub kind: Option<String>,

    /// 속성 일치 조건
    #[serde(default)]
    pub properties: HashMap<String, Value>,

    /// 최대 결과 수
    pub limit: Option<usize>,
}

impl GraphQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// ============================================================================
// Cache
// ============================================================================

/// 캐시 저장 옵션
#[derive(Debug, Clone, Default)]
pub struct CacheEntryOptions {
    /// 만료 시간 (None이면 캐시 기본값)
    pub ttl: Option<Duration>,

    /// 태그 (delete_by_tag로 일괄 삭제)
    pub tags: Vec<String>,
}

impl CacheEntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// 캐시 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// 현재 항목 수
    pub entries: usize,

    /// 적중 횟수
    pub hits: u64,

    /// 미스 횟수
    pub misses: u64,

    /// 등록된 태그 수
    pub tags: usize,
}

impl CacheStats {
    /// 적중률 (0.0 ~ 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// Database
// ============================================================================

/// 질의 결과 행 (컬럼 이름 → 값)
pub type Row = Map<String, Value>;
