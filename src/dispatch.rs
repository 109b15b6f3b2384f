//! Cross-thread marshalling to the affinity thread.
//!
//! The graph/widget subsystem may only be touched from one designated thread.
//! [`AffinityDispatcher`] is the message-channel abstraction over that rule:
//! the worker posts a unit of work carrying owned inputs and blocks on a
//! rendezvous channel for the result. No borrowed captures cross threads.
//!
//! In inline mode (offline/batch runs with no separate affinity thread) every
//! primitive executes in place, so callers must not assume a thread hop
//! occurs.

use std::thread::JoinHandle;

use miette::Diagnostic;
use thiserror::Error;

type WorkUnit = Box<dyn FnOnce() + Send>;

#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    #[error("affinity thread is no longer accepting work")]
    #[diagnostic(
        code(graphdoc::dispatch::thread_unavailable),
        help("The affinity thread has shut down; no further work can be marshalled.")
    )]
    ThreadUnavailable,

    #[error("affinity thread dropped the work unit before replying")]
    #[diagnostic(code(graphdoc::dispatch::reply_dropped))]
    ReplyDropped,
}

#[derive(Clone, Debug)]
enum Mode {
    /// No separate affinity thread; execute in place.
    Inline,
    /// Post work units to the affinity thread's queue.
    Remote(flume::Sender<WorkUnit>),
}

/// Handle for scheduling work on the designated thread.
///
/// Cheap to clone; clones share the same destination.
#[derive(Clone, Debug)]
pub struct AffinityDispatcher {
    mode: Mode,
}

impl AffinityDispatcher {
    /// A dispatcher that runs everything on the calling thread.
    pub fn inline() -> Self {
        Self { mode: Mode::Inline }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.mode, Mode::Inline)
    }

    /// Run `work` on the affinity thread and block until it returns.
    ///
    /// The closure and its captures are moved to the affinity thread; the
    /// result is moved back. The round-trip is synchronous, so data the work
    /// unit produced is fully visible to the caller on return.
    pub fn run<R, F>(&self, work: F) -> Result<R, DispatchError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        match &self.mode {
            Mode::Inline => Ok(work()),
            Mode::Remote(tx) => {
                let (reply_tx, reply_rx) = flume::bounded(1);
                tx.send(Box::new(move || {
                    let _ = reply_tx.send(work());
                }))
                .map_err(|_| DispatchError::ThreadUnavailable)?;
                reply_rx.recv().map_err(|_| DispatchError::ReplyDropped)
            }
        }
    }

    /// Run `work` without waiting for it.
    ///
    /// Used for the terminal wrap-up step so the worker thread can exit
    /// without blocking on a potentially long-running subprocess launch. The
    /// work runs on a freshly spawned thread (in place in inline mode), not
    /// on the affinity thread: detached work must not touch affinity-owned
    /// state.
    pub fn run_detached<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.mode {
            Mode::Inline => work(),
            Mode::Remote(_) => {
                // Builder::spawn only fails on OS thread exhaustion; nothing
                // useful to do with detached work at that point.
                let _ = std::thread::Builder::new()
                    .name("graphdoc-detached".into())
                    .spawn(work);
            }
        }
    }
}

/// Owns the designated thread and its work queue.
///
/// Dropping the handle closes the queue and joins the thread after it drains
/// outstanding work.
#[derive(Debug)]
pub struct AffinityThread {
    tx: Option<flume::Sender<WorkUnit>>,
    join: Option<JoinHandle<()>>,
}

impl AffinityThread {
    pub fn spawn() -> Self {
        let (tx, rx) = flume::unbounded::<WorkUnit>();
        let join = std::thread::Builder::new()
            .name("graphdoc-affinity".into())
            .spawn(move || {
                while let Ok(work) = rx.recv() {
                    work();
                }
            })
            .ok();
        Self { tx: Some(tx), join }
    }

    pub fn dispatcher(&self) -> AffinityDispatcher {
        match &self.tx {
            Some(tx) => AffinityDispatcher {
                mode: Mode::Remote(tx.clone()),
            },
            None => AffinityDispatcher::inline(),
        }
    }
}

impl Drop for AffinityThread {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
