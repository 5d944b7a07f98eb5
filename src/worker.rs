//! One-shot background tasks whose results are picked up through a [`PromiseHandle`].

use std::{io, thread};

use crossbeam::channel::{Receiver, Sender, TryRecvError};

/// Creates a connected pair of [`Promise`] and [`PromiseHandle`].
pub fn promise<T>() -> (Promise<T>, PromiseHandle<T>) {
    // Capacity of 1 means that `Promise::fulfill` will never block.
    let (sender, recv) = crossbeam::channel::bounded(1);
    (Promise { inner: sender }, PromiseHandle { recv })
}

/// An empty slot that can be filled with a `T`, fulfilling the promise.
///
/// Fulfilling a [`Promise`] lets the connected [`PromiseHandle`] retrieve the value.
pub struct Promise<T> {
    inner: Sender<T>,
}

impl<T> Promise<T> {
    /// Fulfills the promise with a value, consuming it.
    ///
    /// This method does not block or fail. If the connected [`PromiseHandle`] was dropped, `value`
    /// is dropped and nothing happens.
    pub fn fulfill(self, value: T) {
        self.inner.send(value).ok();
    }
}

/// A handle connected to a [`Promise`] that will eventually resolve to a value of type `T`.
pub struct PromiseHandle<T> {
    recv: Receiver<T>,
}

impl<T> PromiseHandle<T> {
    /// Blocks the calling thread until the [`Promise`] is fulfilled.
    pub fn block(self) -> Result<T, PromiseDropped> {
        self.recv.recv().map_err(|_| PromiseDropped { _priv: () })
    }

    /// Takes the value if the [`Promise`] has been fulfilled, without blocking.
    ///
    /// Returns [`None`] while the promise is still pending, and `Some(Err(_))` if it was dropped
    /// without being fulfilled.
    pub fn try_take(&self) -> Option<Result<T, PromiseDropped>> {
        match self.recv.try_recv() {
            Ok(value) => Some(Ok(value)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PromiseDropped { _priv: () })),
        }
    }
}

/// An error indicating that the connected [`Promise`] object was dropped without being fulfilled.
#[derive(Debug, Clone, Copy)]
pub struct PromiseDropped {
    _priv: (),
}

/// Runs `task` on a new, detached thread named `name` and returns a handle to its result.
///
/// The thread is not joined. If the returned handle is dropped before the task completes, the task
/// still runs to completion and its result is discarded.
pub fn spawn<T, F>(name: &str, task: F) -> io::Result<PromiseHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (promise, handle) = promise();
    let thread_name = name.to_string();
    thread::Builder::new().name(name.into()).spawn(move || {
        log::trace!("task '{thread_name}' starting");
        promise.fulfill(task());
        log::trace!("task '{thread_name}' exiting");
    })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promise_is_fulfilled() {
        let (promise, handle) = promise();
        assert!(handle.try_take().is_none());
        promise.fulfill(5);
        assert_eq!(handle.try_take().unwrap().unwrap(), 5);
    }

    #[test]
    fn dropped_promise() {
        let (promise, handle) = promise::<()>();
        drop(promise);
        assert!(handle.try_take().unwrap().is_err());
        assert!(handle.block().is_err());
    }

    #[test]
    fn spawned_task() {
        let handle = spawn("test-task", || 1 + 1).unwrap();
        assert_eq!(handle.block().unwrap(), 2);
    }

    #[test]
    fn abandoned_task_completes() {
        let (done, done_handle) = promise();
        let handle = spawn("abandoned", move || {
            done.fulfill(());
            "unused"
        })
        .unwrap();
        drop(handle);
        done_handle.block().unwrap();
    }
}
