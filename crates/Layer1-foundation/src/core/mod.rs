//! Core Module - 호스트 협력자 인터페이스 및 타입
//!
//! - `types.rs`: 데이터 타입 (GraphNode, CacheStats, Row 등)
//! - `traits.rs`: 인터페이스 (GraphStore, TagCache, Database)
//! - `null.rs`: 주입되지 않은 의존성을 대신하는 무동작 구현

pub mod null;
pub mod traits;
pub mod types;

pub use null::{NullCache, NullDatabase, NullGraphStore};
pub use traits::{Database, GraphStore, TagCache};
pub use types::{CacheEntryOptions, CacheStats, GraphEdge, GraphNode, GraphQuery, Row};
