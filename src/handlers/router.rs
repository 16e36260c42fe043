use super::traits::ChangeHandler;
use crate::engine::SyncEngine;
use crate::types::events::{ChangeEvent, Table};
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatches change events to the handler registered for their table.
#[derive(Default)]
pub struct ChangeRouter {
    handlers: HashMap<Table, Arc<dyn ChangeHandler>>,
}

impl ChangeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for its table.
    ///
    /// # Panics
    /// Panics if a handler is already registered for the same table, to
    /// prevent accidental overwrites during initialization.
    pub fn register(&mut self, handler: Arc<dyn ChangeHandler>) {
        let table = handler.table();
        if self.handlers.insert(table, handler).is_some() {
            panic!("Handler for table '{}' already registered", table.as_str());
        }
    }

    /// Dispatch an event; returns `false` when no handler is registered
    /// for its table.
    pub async fn dispatch(&self, engine: Arc<SyncEngine>, event: &ChangeEvent) -> bool {
        if let Some(handler) = self.handlers.get(&event.table) {
            handler.handle(engine, event).await;
            true
        } else {
            false
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, SyncEngine};
    use crate::store::memory::{MemoryFacade, MemoryKv};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct MockHandler {
        table: Table,
        handled: AtomicBool,
    }

    impl MockHandler {
        fn new(table: Table) -> Self {
            Self {
                table,
                handled: AtomicBool::new(false),
            }
        }

        fn was_handled(&self) -> bool {
            self.handled.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChangeHandler for MockHandler {
        fn table(&self) -> Table {
            self.table
        }

        async fn handle(&self, _engine: Arc<SyncEngine>, _event: &ChangeEvent) {
            self.handled.store(true, Ordering::SeqCst);
        }
    }

    fn test_engine() -> Arc<SyncEngine> {
        SyncEngine::new(
            EngineConfig::new("me"),
            Arc::new(MemoryFacade::new()),
            Arc::new(MemoryKv::new()),
        )
    }

    #[test]
    fn test_router_registration() {
        let mut router = ChangeRouter::new();
        router.register(Arc::new(MockHandler::new(Table::Message)));
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    #[should_panic(expected = "Handler for table 'message' already registered")]
    fn test_router_double_registration_panics() {
        let mut router = ChangeRouter::new();
        router.register(Arc::new(MockHandler::new(Table::Message)));
        router.register(Arc::new(MockHandler::new(Table::Message)));
    }

    #[tokio::test]
    async fn test_router_dispatch_found() {
        let mut router = ChangeRouter::new();
        let handler = Arc::new(MockHandler::new(Table::Like));
        let handler_ref = handler.clone();
        router.register(handler);

        let event = ChangeEvent::insert(Table::Like, json!({ "id": "l1" }));
        assert!(router.dispatch(test_engine(), &event).await);
        assert!(handler_ref.was_handled());
    }

    #[tokio::test]
    async fn test_router_dispatch_not_found() {
        let router = ChangeRouter::new();
        let event = ChangeEvent::insert(Table::Notification, json!({ "id": "n1" }));
        assert!(!router.dispatch(test_engine(), &event).await);
    }
}
