// Copyright (c) The allure-reporter Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing of reporter events to their handlers.

use crate::{
    errors::WriteEventError,
    reporter::{
        events::{EventKind, ReporterEvent},
        state::ReportStateStore,
    },
};
use std::collections::HashMap;
use tracing::trace;

/// A handler for one kind of reporter event.
///
/// Handlers receive the whole state store rather than a single context's
/// state, since run-end handling crosses contexts.
pub type EventHandler =
    Box<dyn FnMut(&mut ReportStateStore, &ReporterEvent) -> Result<(), WriteEventError> + Send>;

/// Routes events to handlers registered by [`EventKind`].
///
/// Dispatch is synchronous: the handler runs on the calling thread and has
/// finished by the time `dispatch` returns. The dispatcher owns the state
/// store and lends it to handlers per event.
pub struct EventDispatcher {
    store: ReportStateStore,
    handlers: HashMap<EventKind, EventHandler>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no handlers registered.
    pub fn new() -> Self {
        Self {
            store: ReportStateStore::new(),
            handlers: HashMap::new(),
        }
    }

    /// Registers the handler for an event kind.
    ///
    /// At most one handler per kind; registering again replaces the earlier
    /// handler.
    pub fn on(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.insert(kind, handler);
    }

    /// Routes one event to its handler.
    ///
    /// Events with no registered handler are dropped.
    pub fn dispatch(&mut self, event: &ReporterEvent) -> Result<(), WriteEventError> {
        match self.handlers.get_mut(&event.kind()) {
            Some(handler) => handler(&mut self.store, event),
            None => {
                trace!(kind = ?event.kind(), "no handler registered, dropping event");
                Ok(())
            }
        }
    }

    /// Returns the state store, e.g. for inspection in tests.
    pub fn store(&self) -> &ReportStateStore {
        &self.store
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
