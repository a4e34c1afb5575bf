//! Handler registry keyed by message type.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use readout_core::{Message, ReadoutError, SourceContext};
use serde_json::Value;
use tracing::warn;

/// Handles one inbound message type.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, message: Message, source: SourceContext) -> Result<Value, ReadoutError>;
}

/// Adapter turning an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Message, SourceContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ReadoutError>> + Send,
{
    async fn handle(&self, message: Message, source: SourceContext) -> Result<Value, ReadoutError> {
        (self.0)(message, source).await
    }
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: &str, handler: Arc<dyn CommandHandler>) {
        if self.handlers.insert(kind.to_string(), handler).is_some() {
            warn!(kind, "Replaced existing message handler");
        }
    }

    /// Register an async closure for `kind`.
    pub fn register_fn<F, Fut>(&mut self, kind: &str, f: F)
    where
        F: Fn(Message, SourceContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ReadoutError>> + Send + 'static,
    {
        self.register(kind, Arc::new(FnHandler(f)));
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered message types, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
