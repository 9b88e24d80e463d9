//! Per-kind command handlers

use crate::protocol::{Command, CommandKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Receives decoded commands of the kinds it is registered for
pub trait CommandHandler: Send + Sync {
    fn handle(&self, command: &Command);
}

impl<F> CommandHandler for F
where
    F: Fn(&Command) + Send + Sync,
{
    fn handle(&self, command: &Command) {
        self(command)
    }
}

/// Forwards every command it receives to a channel
pub struct ForwardHandler {
    sender: UnboundedSender<Command>,
}

impl ForwardHandler {
    pub fn new(sender: UnboundedSender<Command>) -> Self {
        Self { sender }
    }
}

impl CommandHandler for ForwardHandler {
    fn handle(&self, command: &Command) {
        let _ = self.sender.send(command.clone());
    }
}

/// One handler per command kind
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<CommandKind, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, returning the handler it replaces
    pub fn register(
        &mut self,
        kind: CommandKind,
        handler: impl CommandHandler + 'static,
    ) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.insert(kind, Arc::new(handler))
    }

    /// Builder form of [`Self::register`]
    pub fn with(mut self, kind: CommandKind, handler: impl CommandHandler + 'static) -> Self {
        self.register(kind, handler);
        self
    }

    /// Forward every kind to `sender`
    pub fn forward_all(sender: UnboundedSender<Command>) -> Self {
        let handler: Arc<dyn CommandHandler> = Arc::new(ForwardHandler::new(sender));
        Self {
            handlers: CommandKind::ALL
                .into_iter()
                .map(|kind| (kind, handler.clone()))
                .collect(),
        }
    }

    pub fn contains(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke the handler for the command's kind; `false` if none is registered
    pub fn dispatch(&self, command: &Command) -> bool {
        match self.handlers.get(&command.kind()) {
            Some(handler) => {
                handler.handle(command);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("HandlerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SelectionCommand;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[test]
    fn test_dispatch_to_registered_kind_only() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let registry = HandlerRegistry::new().with(CommandKind::Selection, move |_: &Command| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.dispatch(&SelectionCommand::new(vec![1]).into()));
        assert!(!registry.dispatch(&Command::PuppetAlive));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_replaces_previous_handler() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(CommandKind::Token, |_: &Command| {}).is_none());
        assert!(registry.register(CommandKind::Token, |_: &Command| {}).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_forward_all() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let registry = HandlerRegistry::forward_all(tx);
        assert_eq!(registry.len(), CommandKind::ALL.len());
        registry.dispatch(&Command::SceneCreated);
        assert_eq!(rx.try_recv().unwrap(), Command::SceneCreated);
    }
}
