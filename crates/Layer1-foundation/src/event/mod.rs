//! Event System - 이벤트 발행/구독 시스템
//!
//! 레지스트리 라이프사이클 알림과 플러그인 간 신호를 전달합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EventBus                              │
//! │  publish(event) ─┬─▶ history (최근 N개)                      │
//! │                  ├─▶ broadcast::Sender (비동기 소비자)        │
//! │                  └─▶ Listener 1 → Listener 2 → Listener N    │
//! │                      (등록 순서대로 동기 호출)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventBusConfig, EventFilter, EventListener, FnListener, ListenerId};

pub use types::{custom, system, EventCategory, EventId, EventSeverity, WeaveEvent};
