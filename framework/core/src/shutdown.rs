use std::{borrow::BorrowMut, sync::Arc};

use tokio::sync::broadcast::{Receiver, Sender};
use tokio::sync::Mutex;

/// Broadcasts the end-of-run signal to every part of the harness that needs to wind down.
///
/// The signal is sent exactly once, either by the duration timer or by the operator pressing
/// Ctrl-C. Listeners poll it between units of work, so anything already in flight is allowed to
/// finish naturally.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.sender.send(()) {
            // Will fail if nobody is listening for a shutdown signal, in which case the log
            // message can be ignored.
            log::warn!("Failed to send shutdown signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Point in time check whether the shutdown signal has been received. Once this returns true
    /// no new work should be started.
    pub fn should_shutdown(&mut self) -> bool {
        match self.receiver.try_lock() {
            Ok(mut guard) => {
                match guard.try_recv() {
                    Ok(_) => true,
                    Err(tokio::sync::broadcast::error::TryRecvError::Closed) => true,
                    // If the receiver is empty or lagged then we should not shutdown.
                    Err(_) => false,
                }
            }
            Err(_) => false,
        }
    }

    /// Wait for the shutdown signal. Safe to race against another future to cancel background
    /// work that has no natural completion point.
    pub async fn wait_for_shutdown(&mut self) {
        // A closed channel means the handle is gone, which is as good as a signal.
        let _ = self.receiver.borrow_mut().lock().await.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_sees_nothing_before_signal() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        assert!(!listener.should_shutdown());
    }

    #[tokio::test]
    async fn every_listener_receives_the_signal() {
        let handle = ShutdownHandle::new();
        let mut first = handle.new_listener();
        let mut second = handle.new_listener();

        handle.shutdown();

        assert!(first.should_shutdown());
        assert!(second.should_shutdown());
    }

    #[tokio::test]
    async fn wait_for_shutdown_completes_on_signal() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        let waiter = tokio::spawn(async move {
            listener.wait_for_shutdown().await;
        });

        handle.shutdown();
        waiter.await.expect("waiter task panicked");
    }

    #[tokio::test]
    async fn listener_created_after_signal_is_not_stale() {
        let handle = ShutdownHandle::new();
        // Nobody subscribed yet, so this send is dropped.
        handle.shutdown();

        let mut listener = handle.new_listener();
        assert!(!listener.should_shutdown());
    }
}
