//! Lifecycle event bus
//!
//! Observers subscribe to the named lifecycle milestones. Emission is a
//! plain synchronous loop over the registered listeners; a failing
//! listener is logged and never aborts the pipeline.

use std::fmt;

use log::warn;

use super::error::LifecycleResult;

/// Named lifecycle milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Start,
    PreInit,
    Init,
    PreLoad,
    Load,
    DataReady,
    PreRender,
    Render,
    PostRender,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 9] = [
        LifecycleEvent::Start,
        LifecycleEvent::PreInit,
        LifecycleEvent::Init,
        LifecycleEvent::PreLoad,
        LifecycleEvent::Load,
        LifecycleEvent::DataReady,
        LifecycleEvent::PreRender,
        LifecycleEvent::Render,
        LifecycleEvent::PostRender,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Start => "START",
            LifecycleEvent::PreInit => "PRE_INIT",
            LifecycleEvent::Init => "INIT",
            LifecycleEvent::PreLoad => "PRE_LOAD",
            LifecycleEvent::Load => "LOAD",
            LifecycleEvent::DataReady => "DATA_READY",
            LifecycleEvent::PreRender => "PRE_RENDER",
            LifecycleEvent::Render => "RENDER",
            LifecycleEvent::PostRender => "POST_RENDER",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener callback
pub type Listener = Box<dyn Fn(LifecycleEvent) -> LifecycleResult<()> + Send + Sync>;

/// Listener table owned by one lifecycle instance
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(Option<LifecycleEvent>, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to every event
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(LifecycleEvent) -> LifecycleResult<()> + Send + Sync + 'static,
    {
        self.listeners.push((None, Box::new(listener)));
    }

    /// Listen to a single event
    pub fn on<F>(&mut self, event: LifecycleEvent, listener: F)
    where
        F: Fn(LifecycleEvent) -> LifecycleResult<()> + Send + Sync + 'static,
    {
        self.listeners.push((Some(event), Box::new(listener)));
    }

    /// Notify the matching listeners in registration order
    pub fn emit(&self, event: LifecycleEvent) {
        for (filter, listener) in &self.listeners {
            if filter.is_some_and(|wanted| wanted != event) {
                continue;
            }
            if let Err(e) = listener(event) {
                warn!("Lifecycle listener failed on {}: {}", event, e);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::core::LifecycleError;

    #[test]
    fn test_emit_filters_and_survives_failures() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        bus.subscribe(|_| Err(LifecycleError::hook("listener down")));

        let all = seen.clone();
        bus.subscribe(move |event| {
            all.lock().unwrap().push(event);
            Ok(())
        });

        let renders = Arc::new(Mutex::new(0));
        let counter = renders.clone();
        bus.on(LifecycleEvent::Render, move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        bus.emit(LifecycleEvent::Start);
        bus.emit(LifecycleEvent::Render);

        assert_eq!(bus.listener_count(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![LifecycleEvent::Start, LifecycleEvent::Render]
        );
        assert_eq!(*renders.lock().unwrap(), 1);
    }

    #[test]
    fn test_event_names() {
        let names: Vec<&str> = LifecycleEvent::ALL.iter().map(|e| e.as_str()).collect();
        assert_eq!(names[5], "DATA_READY");
        assert_eq!(names.len(), 9);
    }
}
