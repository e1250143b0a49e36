//! Core Traits - 호스트가 제공하는 협력자 인터페이스
//!
//! 플러그인 런타임은 그래프 저장소, 캐시, 데이터베이스의 구현을 알지 못합니다.
//! 호스트는 이 trait들을 구현해 `PluginContext`로 주입하고, 주입하지 않으면
//! `null` 모듈의 무동작 구현이 사용됩니다.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  Host Application                              │
//! │  ├── GraphStore 구현 (지식 그래프)              │
//! │  ├── TagCache 구현 (태그 기반 캐시)             │
//! │  └── Database 구현 (관계형 DB)                 │
//! ├───────────────────────────────────────────────┤
//! │  Layer2-core (PluginContext로 전달)            │
//! ├───────────────────────────────────────────────┤
//! │  Layer1-foundation (이 레이어: trait 정의)      │
//! └───────────────────────────────────────────────┘
//! ```

use super::types::{CacheEntryOptions, CacheStats, GraphEdge, GraphNode, GraphQuery, Row};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

// ============================================================================
// GraphStore - 지식 그래프
// ============================================================================

/// 지식 그래프 저장소
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// 노드 추가 (같은 ID면 교체)
    async fn add_node(&self, node: GraphNode) -> Result<()>;

    /// 노드 조회
    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>>;

    /// 엣지 추가
    async fn add_edge(&self, edge: GraphEdge) -> Result<()>;

    /// 노드에 연결된 엣지 조회 (출발/도착 모두)
    async fn get_edges(&self, node_id: &str) -> Result<Vec<GraphEdge>>;

    /// 조건 질의
    async fn query(&self, query: &GraphQuery) -> Result<Vec<GraphNode>>;

    /// 시작 노드에서 max_depth까지 너비 우선 탐색
    async fn traverse(&self, start: &str, max_depth: usize) -> Result<Vec<GraphNode>>;
}

// ============================================================================
// TagCache - 태그 기반 캐시
// ============================================================================

/// 태그로 무효화할 수 있는 캐시
#[async_trait]
pub trait TagCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value, options: CacheEntryOptions) -> Result<()>;

    /// 삭제 여부 반환
    async fn delete(&self, key: &str) -> Result<bool>;

    /// 태그가 붙은 모든 항목 삭제, 삭제된 수 반환
    async fn delete_by_tag(&self, tag: &str) -> Result<usize>;

    async fn clear(&self) -> Result<()>;

    async fn has(&self, key: &str) -> Result<bool>;

    async fn stats(&self) -> Result<CacheStats>;
}

// ============================================================================
// Database - 관계형 데이터베이스
// ============================================================================

/// 관계형 데이터베이스 추상화
///
/// 파라미터는 JSON 값으로 전달되며 구현체가 네이티브 타입으로 변환합니다.
#[async_trait]
pub trait Database: Send + Sync {
    /// 여러 행 조회
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// 한 행 조회
    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    /// 변경 실행, 영향받은 행 수 반환
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// 트랜잭션 시작
    async fn begin(&self) -> Result<()>;

    /// 트랜잭션 커밋
    async fn commit(&self) -> Result<()>;

    /// 트랜잭션 롤백
    async fn rollback(&self) -> Result<()>;
}
