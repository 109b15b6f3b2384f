use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use miette::Diagnostic;
use thiserror::Error;

use super::event::Event;
use super::sink::EventSink;

#[derive(Debug, Error, Diagnostic)]
pub enum EmitterError {
    #[error("event bus listener is gone")]
    #[diagnostic(
        code(graphdoc::events::disconnected),
        help("The bus was dropped while an emitter was still live.")
    )]
    Disconnected,
}

/// Cheap handle for publishing events onto the bus from any thread.
#[derive(Clone, Debug)]
pub struct EventEmitter {
    tx: flume::Sender<Event>,
}

impl EventEmitter {
    pub fn emit(&self, event: Event) -> Result<(), EmitterError> {
        self.tx.send(event).map_err(|_| EmitterError::Disconnected)
    }

    /// An emitter whose events go nowhere. Useful when no bus is wired up.
    pub fn disconnected() -> Self {
        let (tx, _rx) = flume::unbounded();
        Self { tx }
    }
}

/// Owns the listener thread that fans incoming events out to every
/// registered sink. Dropping the bus drains outstanding events, then joins
/// the listener.
pub struct EventBus {
    tx: Option<flume::Sender<Event>>,
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    listener: Option<JoinHandle<()>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded::<Event>();
        let sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>> = Arc::new(Mutex::new(Vec::new()));
        let fanout = Arc::clone(&sinks);
        let listener = std::thread::Builder::new()
            .name("graphdoc-events".into())
            .spawn(move || {
                while let Ok(event) = rx.recv() {
                    let mut sinks = fanout.lock().unwrap();
                    for sink in sinks.iter_mut() {
                        if let Err(err) = sink.handle(&event) {
                            tracing::warn!(error = %err, "event sink failed");
                        }
                    }
                }
            })
            .ok();
        Self {
            tx: Some(tx),
            sinks,
            listener,
        }
    }

    pub fn add_sink(&self, sink: Box<dyn EventSink>) {
        self.sinks.lock().unwrap().push(sink);
    }

    pub fn emitter(&self) -> EventEmitter {
        match &self.tx {
            Some(tx) => EventEmitter { tx: tx.clone() },
            None => EventEmitter::disconnected(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(listener) = self.listener.take() {
            let _ = listener.join();
        }
    }
}
