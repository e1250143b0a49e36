//! Event Bus - 이벤트 발행/구독 시스템
//!
//! 리스너는 등록 순서대로 동기 호출됩니다. 비동기 소비자는
//! `receiver()`로 브로드캐스트 스트림을 받을 수 있습니다.

use super::types::{EventCategory, EventSeverity, WeaveEvent};
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

// ============================================================================
// EventListener Trait
// ============================================================================

/// 이벤트 리스너 ID (등록 순서)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// 이벤트 리스너 trait
///
/// 발행자의 호출 스택 안에서 실행되므로 오래 걸리는 작업은
/// 별도 태스크로 넘겨야 합니다.
pub trait EventListener: Send + Sync {
    /// 리스너 이름 (디버깅용)
    fn name(&self) -> &str;

    /// 관심 있는 이벤트 카테고리 (None이면 모든 이벤트)
    fn categories(&self) -> Option<Vec<EventCategory>> {
        None
    }

    /// 이벤트 처리
    fn on_event(&self, event: &WeaveEvent);
}

/// 클로저 기반 리스너
pub struct FnListener<F> {
    name: String,
    handler: F,
}

impl<F> FnListener<F>
where
    F: Fn(&WeaveEvent) + Send + Sync,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&WeaveEvent) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &WeaveEvent) {
        (self.handler)(event)
    }
}

// ============================================================================
// EventFilter
// ============================================================================

/// 이벤트 필터
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// 카테고리 필터
    pub categories: Option<Vec<EventCategory>>,

    /// 이벤트 타입 패턴 (prefix 매칭)
    pub event_types: Option<Vec<String>>,

    /// 소스 필터
    pub sources: Option<Vec<String>>,

    /// 최소 심각도
    pub min_severity: Option<EventSeverity>,
}

impl EventFilter {
    /// 새 필터 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 카테고리 필터 추가
    pub fn with_categories(mut self, categories: Vec<EventCategory>) -> Self {
        self.categories = Some(categories);
        self
    }

    /// 이벤트 타입 필터 추가
    pub fn with_event_types(mut self, types: Vec<String>) -> Self {
        self.event_types = Some(types);
        self
    }

    /// 소스 필터 추가
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// 최소 심각도 설정
    pub fn with_min_severity(mut self, severity: EventSeverity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// 이벤트가 필터를 통과하는지 확인
    pub fn matches(&self, event: &WeaveEvent) -> bool {
        if let Some(ref cats) = self.categories {
            if !cats.contains(&event.category) {
                return false;
            }
        }

        // prefix 매칭
        if let Some(ref types) = self.event_types {
            if !types.iter().any(|t| event.event_type.starts_with(t.as_str())) {
                return false;
            }
        }

        if let Some(ref sources) = self.sources {
            if !sources.contains(&event.source) {
                return false;
            }
        }

        if let Some(min_sev) = self.min_severity {
            if event.severity < min_sev {
                return false;
            }
        }

        true
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// 이벤트 버스 설정
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// 브로드캐스트 채널 용량
    pub channel_capacity: usize,

    /// 이벤트 히스토리 보관 개수
    pub history_size: usize,

    /// 디버그 모드 (모든 이벤트 로깅)
    pub debug_mode: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            history_size: 100,
            debug_mode: false,
        }
    }
}

/// 등록된 리스너 정보
#[derive(Clone)]
struct RegisteredListener {
    listener: Arc<dyn EventListener>,
    filter: Option<EventFilter>,
}

impl RegisteredListener {
    fn accepts(&self, event: &WeaveEvent) -> bool {
        match &self.filter {
            Some(filter) => filter.matches(event),
            None => match self.listener.categories() {
                Some(cats) => cats.contains(&event.category),
                None => true,
            },
        }
    }
}

/// 이벤트 버스
///
/// ## 사용법
///
/// ```ignore
/// use weave_foundation::event::{EventBus, FnListener, WeaveEvent, EventCategory};
///
/// let bus = EventBus::new();
/// let id = bus.subscribe(Arc::new(FnListener::new("audit", |e| println!("{}", e.event_type))));
/// bus.publish(WeaveEvent::new("plugin.registered", EventCategory::Plugin));
/// bus.unsubscribe(id);
/// ```
pub struct EventBus {
    /// 설정
    config: EventBusConfig,

    /// 브로드캐스트 채널 송신자
    sender: broadcast::Sender<WeaveEvent>,

    /// 등록된 리스너 (ID 순 = 등록 순)
    listeners: RwLock<BTreeMap<ListenerId, RegisteredListener>>,

    /// 리스너 ID 카운터
    listener_counter: AtomicU64,

    /// 이벤트 히스토리
    history: RwLock<VecDeque<WeaveEvent>>,

    /// 발행된 이벤트 수
    event_count: AtomicU64,
}

impl EventBus {
    /// 기본 설정으로 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// 커스텀 설정으로 이벤트 버스 생성
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));

        Self {
            history: RwLock::new(VecDeque::with_capacity(config.history_size)),
            config,
            sender,
            listeners: RwLock::new(BTreeMap::new()),
            listener_counter: AtomicU64::new(0),
            event_count: AtomicU64::new(0),
        }
    }

    /// 리스너 등록
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        self.subscribe_with_filter(listener, None)
    }

    /// 필터와 함께 리스너 등록
    pub fn subscribe_with_filter(
        &self,
        listener: Arc<dyn EventListener>,
        filter: Option<EventFilter>,
    ) -> ListenerId {
        let id = ListenerId(self.listener_counter.fetch_add(1, Ordering::SeqCst));

        debug!(
            listener_name = listener.name(),
            listener_id = %id,
            "Registering event listener"
        );

        self.listeners
            .write()
            .insert(id, RegisteredListener { listener, filter });

        id
    }

    /// 리스너 해제
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = self.listeners.write().remove(&id).is_some();

        if removed {
            debug!(listener_id = %id, "Unregistered event listener");
        }

        removed
    }

    /// 이벤트 발행
    ///
    /// 리스너 목록을 복사한 뒤 락 밖에서 호출하므로, 리스너 안에서
    /// 다시 구독하거나 발행해도 교착되지 않습니다.
    pub fn publish(&self, event: WeaveEvent) {
        let event_count = self.event_count.fetch_add(1, Ordering::SeqCst);

        if self.config.debug_mode {
            trace!(
                event_id = %event.id,
                event_type = %event.event_type,
                category = ?event.category,
                "Publishing event #{}", event_count + 1
            );
        }

        if self.config.history_size > 0 {
            let mut history = self.history.write();
            if history.len() >= self.config.history_size {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // 수신자가 없어도 OK
        let _ = self.sender.send(event.clone());

        let targets: Vec<(ListenerId, RegisteredListener)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, registered)| (*id, registered.clone()))
            .collect();

        for (id, registered) in targets {
            if registered.accepts(&event) {
                trace!(
                    listener_id = %id,
                    listener_name = registered.listener.name(),
                    event_type = %event.event_type,
                    "Delivering event to listener"
                );
                registered.listener.on_event(&event);
            }
        }
    }

    /// 브로드캐스트 수신자 생성 (스트림 방식)
    pub fn receiver(&self) -> broadcast::Receiver<WeaveEvent> {
        self.sender.subscribe()
    }

    /// 이벤트 히스토리 조회
    pub fn history(&self, filter: Option<&EventFilter>) -> Vec<WeaveEvent> {
        let history = self.history.read();
        history
            .iter()
            .filter(|e| filter.map_or(true, |f| f.matches(e)))
            .cloned()
            .collect()
    }

    /// 특정 타입의 이벤트 히스토리 조회
    pub fn history_by_type(&self, event_type: &str) -> Vec<WeaveEvent> {
        let history = self.history.read();
        history
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// 등록된 리스너 수
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// 총 발행된 이벤트 수
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::SeqCst)
    }

    /// 히스토리 클리어
    pub fn clear_history(&self) {
        self.history.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct TestListener {
        name: String,
        count: AtomicUsize,
    }

    impl TestListener {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                count: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    impl EventListener for TestListener {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_event(&self, _event: &WeaveEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_event_bus_basic() {
        let bus = EventBus::new();

        let listener = Arc::new(TestListener::new("test"));
        let id = bus.subscribe(listener.clone());

        assert_eq!(bus.listener_count(), 1);

        bus.publish(WeaveEvent::new("test.event", EventCategory::System));
        assert_eq!(listener.call_count(), 1);

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe(Arc::new(FnListener::new(name, move |_| {
                order.lock().push(name);
            })));
        }

        bus.publish(WeaveEvent::new("test.event", EventCategory::Custom));
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::new()
            .with_categories(vec![EventCategory::Plugin])
            .with_event_types(vec!["plugin.".to_string()]);

        let plugin_event = WeaveEvent::new("plugin.registered", EventCategory::Plugin);
        let system_event = WeaveEvent::new("system.shutdown", EventCategory::System);

        assert!(filter.matches(&plugin_event));
        assert!(!filter.matches(&system_event));
    }

    #[test]
    fn test_filtered_subscription() {
        let bus = EventBus::new();
        let listener = Arc::new(TestListener::new("errors"));
        bus.subscribe_with_filter(
            listener.clone(),
            Some(EventFilter::new().with_min_severity(EventSeverity::Error)),
        );

        bus.publish(WeaveEvent::new("plugin.enabled", EventCategory::Plugin));
        bus.publish(
            WeaveEvent::new("plugin.error", EventCategory::Error)
                .with_severity(EventSeverity::Error),
        );

        assert_eq!(listener.call_count(), 1);
    }

    #[test]
    fn test_event_history() {
        let config = EventBusConfig {
            history_size: 5,
            ..Default::default()
        };
        let bus = EventBus::with_config(config);

        for i in 0..10 {
            bus.publish(WeaveEvent::new(
                format!("test.event.{}", i),
                EventCategory::System,
            ));
        }

        let history = bus.history(None);
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].event_type, "test.event.5");
        assert_eq!(bus.event_count(), 10);
    }

    #[test]
    fn test_reentrant_publish() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);

        bus.subscribe_with_filter(
            Arc::new(FnListener::new("relay", move |_| {
                inner.publish(WeaveEvent::new("relay.forwarded", EventCategory::Custom));
            })),
            Some(EventFilter::new().with_event_types(vec!["relay.start".into()])),
        );

        bus.publish(WeaveEvent::new("relay.start", EventCategory::Custom));
        assert_eq!(bus.history_by_type("relay.forwarded").len(), 1);
    }

    #[tokio::test]
    async fn test_event_receiver() {
        let bus = EventBus::new();
        let mut receiver = bus.receiver();

        bus.publish(WeaveEvent::new("system.initialized", EventCategory::System));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type, "system.initialized");
    }
}
