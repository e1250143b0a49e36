//! Null Objects - 호스트가 의존성을 주입하지 않았을 때의 무동작 구현
//!
//! 쓰기는 성공으로 버리고, 읽기는 항상 비어 있는 결과를 돌려줍니다.

use super::traits::{Database, GraphStore, TagCache};
use super::types::{CacheEntryOptions, CacheStats, GraphEdge, GraphNode, GraphQuery, Row};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::trace;

/// 무동작 그래프 저장소
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGraphStore;

#[async_trait]
impl GraphStore for NullGraphStore {
    async fn add_node(&self, node: GraphNode) -> Result<()> {
        trace!(node = %node.id, "NullGraphStore: dropping node");
        Ok(())
    }

    async fn get_node(&self, _id: &str) -> Result<Option<GraphNode>> {
        Ok(None)
    }

    async fn add_edge(&self, _edge: GraphEdge) -> Result<()> {
        Ok(())
    }

    async fn get_edges(&self, _node_id: &str) -> Result<Vec<GraphEdge>> {
        Ok(Vec::new())
    }

    async fn query(&self, _query: &GraphQuery) -> Result<Vec<GraphNode>> {
        Ok(Vec::new())
    }

    async fn traverse(&self, _start: &str, _max_depth: usize) -> Result<Vec<GraphNode>> {
        Ok(Vec::new())
    }
}

/// 무동작 캐시
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

#[async_trait]
impl TagCache for NullCache {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value, _options: CacheEntryOptions) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn delete_by_tag(&self, _tag: &str) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn has(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats::default())
    }
}

/// 무동작 데이터베이스
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDatabase;

#[async_trait]
impl Database for NullDatabase {
    async fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        trace!(sql, "NullDatabase: query ignored");
        Ok(Vec::new())
    }

    async fn query_one(&self, _sql: &str, _params: &[Value]) -> Result<Option<Row>> {
        Ok(None)
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<u64> {
        Ok(0)
    }

    async fn begin(&self) -> Result<()> {
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        Ok(())
    }
}
