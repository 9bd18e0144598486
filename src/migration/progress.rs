//! Progress reporting and cancellation
//!
//! The engine calls [`ProgressObserver::on_progress`] once after each page
//! completes. Observers cannot interrupt a page; cancellation goes through
//! a [`CancelFlag`] that is checked between pages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// One progress tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Pages completed so far, including this one
    pub current: usize,
    pub total: usize,
    /// Rounded percentage, 0-100
    pub percentage: u32,
    pub page_name: String,
}

impl ProgressEvent {
    pub fn new(current: usize, total: usize, page_name: impl Into<String>) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            ((current as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            current,
            total,
            percentage,
            page_name: page_name.into(),
        }
    }
}

/// Synchronous progress sink. Called from worker threads when pages
/// migrate in parallel.
pub trait ProgressObserver: Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Forwards events into an mpsc channel
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Mutex<Sender<ProgressEvent>>,
}

impl ChannelObserver {
    /// Observer plus the receiving end for the consumer
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        // A dropped receiver only means nobody is listening
        let _ = sender.send(event.clone());
    }
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; pages already started still complete
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
