//! # weave-foundation
//!
//! Foundation layer for Weave:
//! - Core: 호스트 협력자 Trait (GraphStore, TagCache, Database) 및 Null 구현
//! - Event: 이벤트 버스 (라이프사이클 알림, 플러그인 간 신호)
//! - Config: 통합 설정 (WeaveConfig, PluginSettings)
//! - Storage: SQLite (Database 구현), JsonStore (설정 파일)
//! - Cache: MemoryCache (TagCache 구현)
//! - Logging: tracing 초기화, PluginLogger
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  weave-core (Loader / Registry / Manager)               │
//! │                     │                                   │
//! │                     ▼                                   │
//! │   PluginContext ── graph / cache / database / logger    │
//! │          │                                              │
//! │          ▼                                              │
//! │   ┌──────────────┬───────────────┬──────────────────┐   │
//! │   │ GraphStore   │ TagCache      │ Database         │   │
//! │   │ (host/Null)  │ (MemoryCache) │ (SqliteDatabase) │   │
//! │   └──────────────┴───────────────┴──────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod logging;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (협력자 Trait 및 타입)
// ============================================================================
pub use core::{
    // Types (types.rs)
    CacheEntryOptions,
    CacheStats,
    // Traits (traits.rs)
    Database,
    GraphEdge,
    GraphNode,
    GraphQuery,
    GraphStore,
    // Null objects (null.rs)
    NullCache,
    NullDatabase,
    NullGraphStore,
    Row,
    TagCache,
};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{PluginSettings, WeaveConfig, WEAVE_CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{JsonStore, SqliteDatabase, PROJECT_DIR};

// ============================================================================
// Cache (캐시)
// ============================================================================
pub use cache::{MemoryCache, MemoryCacheConfig};

// ============================================================================
// Event (이벤트 시스템)
// ============================================================================
pub use event::{
    // Bus
    EventBus,
    EventBusConfig,
    // Types
    EventCategory,
    EventFilter,
    EventId,
    EventListener,
    EventSeverity,
    FnListener,
    ListenerId,
    WeaveEvent,
};

// ============================================================================
// Logging
// ============================================================================
pub use logging::{init_tracing, PluginLogger};
