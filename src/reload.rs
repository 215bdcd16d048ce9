//! Live-reload notifications.
//!
//! Build tasks announce finished output through a [`ReloadNotifier`] handed to
//! them in the task context. The dev server owns a [`LiveReload`] hub and
//! forwards its events to connected browsers; one-shot CLI runs use
//! [`NoReload`].

use crate::output::slash_path;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel; slow browsers lag and resync on the next event.
const CHANNEL_CAPACITY: usize = 64;

/// A change browsers should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Reload the whole page
    Reload,
    /// A stylesheet was rebuilt; swap it without a full reload
    Css {
        /// Path of the stylesheet relative to the served root, `/`-separated
        path: String,
    },
}

impl ReloadEvent {
    /// Event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ReloadEvent::Reload => "reload",
            ReloadEvent::Css { .. } => "css",
        }
    }

    /// Event payload used on the wire.
    pub fn data(&self) -> String {
        match self {
            ReloadEvent::Reload => String::new(),
            ReloadEvent::Css { path } => path.clone(),
        }
    }

    /// Build a stylesheet event for a file relative to the served root.
    pub fn css(path: impl Into<PathBuf>) -> Self {
        ReloadEvent::Css { path: slash_path(&path.into()) }
    }
}

/// Sink for live-reload events.
pub trait ReloadNotifier: Send + Sync {
    /// Deliver an event. Must not block and must not fail the caller.
    fn notify(&self, event: ReloadEvent);
}

/// Notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReload;

impl ReloadNotifier for NoReload {
    fn notify(&self, _event: ReloadEvent) {}
}

/// Broadcast hub shared between the build tasks and the dev server.
#[derive(Debug, Clone)]
pub struct LiveReload {
    sender: broadcast::Sender<ReloadEvent>,
}

impl LiveReload {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadNotifier for LiveReload {
    fn notify(&self, event: ReloadEvent) {
        // Err only means nobody is connected yet
        match self.sender.send(event.clone()) {
            Ok(n) => tracing::debug!("live reload '{}' sent to {} client(s)", event.name(), n),
            Err(_) => tracing::debug!("live reload '{}' with no clients", event.name()),
        }
    }
}

/// Notifier that records events in memory, for inspecting what a task announced.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    events: Mutex<Vec<ReloadEvent>>,
}

impl CollectingNotifier {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<ReloadEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ReloadNotifier for CollectingNotifier {
    fn notify(&self, event: ReloadEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
