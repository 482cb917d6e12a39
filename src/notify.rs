//! Completion callbacks and the context they run on
//!
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::warn;

/// Receives the outcome of one submission.
///
/// Both methods consume the callback, so at most one of them runs, at most once.
/// Any `FnOnce(Result<(), String>)` closure is a callback.
pub trait Callback: Send + 'static {
    /// Called when the endpoint accepted the submission
    fn success(self: Box<Self>);

    /// Called when the submission failed, with a description of the failure
    fn failure(self: Box<Self>, error: String);
}

impl<F> Callback for F
where
    F: FnOnce(Result<(), String>) + Send + 'static,
{
    fn success(self: Box<Self>) {
        (*self)(Ok(()))
    }

    fn failure(self: Box<Self>, error: String) {
        (*self)(Err(error))
    }
}

/// Deferred work handed to a [Notifier]
pub type Notification = Box<dyn FnOnce() + Send + 'static>;

/// Context on which completion callbacks are run.
///
/// Submissions complete on a background worker; the notifier decides where the
/// callback itself executes (inline, on a UI thread, on an event loop, ...).
pub trait Notifier: Send + Sync {
    /// Runs or schedules the notification
    fn notify(&self, notification: Notification);
}

/// Runs callbacks directly on the worker that completed the submission
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineNotifier;

impl Notifier for InlineNotifier {
    fn notify(&self, notification: Notification) {
        notification()
    }
}

/// Queues callbacks for a foreground loop that drains a [NotificationQueue].
///
/// Once the queue has been dropped there is no foreground loop left, so
/// callbacks run on the calling worker instead.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: Sender<Notification>,
}

impl ChannelNotifier {
    /// Creates a notifier and the queue its callbacks are delivered to
    pub fn new() -> (Self, NotificationQueue) {
        let (tx, rx) = unbounded();
        (Self { tx }, NotificationQueue { rx })
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(returned) = self.tx.send(notification) {
            warn!("notification queue closed, running callback on worker");
            (returned.into_inner())()
        }
    }
}

/// Foreground end of a [ChannelNotifier]
pub struct NotificationQueue {
    rx: Receiver<Notification>,
}

impl std::fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueue")
            .field("pending", &self.rx.len())
            .finish()
    }
}

impl NotificationQueue {
    /// Runs every callback that is ready, without blocking. Returns the number run.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(notification) = self.rx.try_recv() {
            notification();
            count += 1;
        }
        count
    }

    /// Waits up to `timeout` for one callback and runs it.
    /// Returns false if none arrived in time.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(notification) => {
                notification();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Number of callbacks waiting to run
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no callbacks are waiting
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_closure_callback() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        let cb: Box<dyn Callback> = Box::new(move |r: Result<(), String>| s.lock().push(r));
        cb.success();

        let s = Arc::clone(&seen);
        let cb: Box<dyn Callback> = Box::new(move |r: Result<(), String>| s.lock().push(r));
        cb.failure("boom".to_string());

        assert_eq!(*seen.lock(), vec![Ok(()), Err("boom".to_string())]);
    }

    #[test]
    fn test_inline_notifier_runs_immediately() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        InlineNotifier.notify(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_notifier_defers_to_queue() {
        let (notifier, queue) = ChannelNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = Arc::clone(&count);
            notifier.notify(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(queue.len(), 3);

        assert!(queue.run_next(Duration::from_millis(10)));
        assert_eq!(queue.run_pending(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(queue.is_empty());
        assert!(!queue.run_next(Duration::from_millis(10)));
    }

    #[test]
    fn test_channel_notifier_after_queue_dropped() {
        let (notifier, queue) = ChannelNotifier::new();
        drop(queue);
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        notifier.notify(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
