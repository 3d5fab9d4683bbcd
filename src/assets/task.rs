//! Load tasks
//!
//! Fire-and-poll loading that fits macroquad's single-threaded frame loop.
//! The work runs on a background thread and streams progress events followed
//! by exactly one result; the frame loop drains them each tick. Channel order
//! guarantees every progress report is seen before the result.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;

use super::error::{AssetError, AssetResult};

/// Message from a running load
pub enum LoadEvent<T> {
    /// Fraction complete, 0.0..=1.0
    Progress(f32),
    Done(AssetResult<T>),
}

/// Task status (fire-and-poll pattern)
#[derive(Debug)]
pub enum TaskStatus<T> {
    /// Still running, or already consumed
    Pending,
    /// Completed successfully
    Ready(T),
    /// Completed with an error
    Failed(AssetError),
}

/// Producer side handed to the worker
pub struct ProgressSender<T> {
    sender: Sender<LoadEvent<T>>,
}

impl<T> ProgressSender<T> {
    pub fn report(&self, fraction: f32) {
        // Receiver dropped means the zone was torn down; nothing to tell
        let _ = self.sender.send(LoadEvent::Progress(fraction.clamp(0.0, 1.0)));
    }

    pub fn finish(self, result: AssetResult<T>) {
        let _ = self.sender.send(LoadEvent::Done(result));
    }
}

/// A handle to a pending load that can be polled
pub struct LoadTask<T> {
    receiver: Option<Receiver<LoadEvent<T>>>,
}

impl<T: Send + 'static> LoadTask<T> {
    /// Run `work` on a background thread
    pub fn spawn<F>(name: &str, work: F) -> Self
    where
        F: FnOnce(&ProgressSender<T>) -> AssetResult<T> + Send + 'static,
    {
        let (task, sender) = Self::channel();
        let spawned = thread::Builder::new()
            .name(format!("load-{name}"))
            .spawn(move || {
                let result = work(&sender);
                sender.finish(result);
            });
        if let Err(e) = spawned {
            tracing::error!("could not start loader thread for {name}: {e}");
        }
        task
    }
}

impl<T> LoadTask<T> {
    /// Unstarted task plus its producer; used by `spawn` and by tests that
    /// feed events by hand
    pub fn channel() -> (Self, ProgressSender<T>) {
        let (sender, receiver) = channel();
        (Self { receiver: Some(receiver) }, ProgressSender { sender })
    }

    /// Drain queued events. Progress is delivered to `on_progress` in order;
    /// the result, once seen, is returned and the task is spent.
    pub fn poll(&mut self, mut on_progress: impl FnMut(f32)) -> TaskStatus<T> {
        let Some(receiver) = &self.receiver else {
            return TaskStatus::Pending;
        };

        loop {
            match receiver.try_recv() {
                Ok(LoadEvent::Progress(p)) => on_progress(p),
                Ok(LoadEvent::Done(result)) => {
                    self.receiver = None;
                    return match result {
                        Ok(value) => TaskStatus::Ready(value),
                        Err(e) => TaskStatus::Failed(e),
                    };
                }
                Err(TryRecvError::Empty) => return TaskStatus::Pending,
                Err(TryRecvError::Disconnected) => {
                    // Worker panicked or dropped its sender
                    self.receiver = None;
                    return TaskStatus::Failed(AssetError::Cancelled);
                }
            }
        }
    }
}
