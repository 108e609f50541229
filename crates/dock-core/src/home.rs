//! The controller's home execution context.
//!
//! State that belongs to the home context is only touched by jobs drained
//! from a [`HomeQueue`], one at a time. Work running elsewhere (broker
//! negotiation, process launch, event delivery) hands its result back with
//! [`HomeContext::dispatch`] instead of touching that state directly.

use tokio::sync::mpsc;

/// A unit of work that runs on the home context with exclusive access to `S`.
pub type HomeJob<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Sending side of the home context. Cheap to clone.
pub struct HomeContext<S> {
    tx: mpsc::UnboundedSender<HomeJob<S>>,
}

impl<S> Clone for HomeContext<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> std::fmt::Debug for HomeContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeContext")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S: 'static> HomeContext<S> {
    /// Create a home context and the queue its jobs are drained from.
    #[must_use]
    pub fn channel() -> (Self, HomeQueue<S>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, HomeQueue { rx })
    }

    /// Queue `job` to run on the home context.
    ///
    /// Returns false if the queue has been dropped; the job is discarded.
    pub fn dispatch(&self, job: impl FnOnce(&mut S) + Send + 'static) -> bool {
        self.tx.send(Box::new(job)).is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving side of the home context.
pub struct HomeQueue<S> {
    rx: mpsc::UnboundedReceiver<HomeJob<S>>,
}

impl<S> HomeQueue<S> {
    /// Wait for the next job. `None` once every `HomeContext` is gone.
    pub async fn next(&mut self) -> Option<HomeJob<S>> {
        self.rx.recv().await
    }

    /// Take a job that is already queued, without waiting.
    pub fn try_next(&mut self) -> Option<HomeJob<S>> {
        self.rx.try_recv().ok()
    }
}
