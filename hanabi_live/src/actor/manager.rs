//! Generic single-worker manager with a close flag, drain sentinel and
//! completion barrier.

use super::errors::{ManagerError, ManagerResult};
use async_trait::async_trait;
use log::{debug, error, info};
use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::{mpsc, oneshot, watch};

/// A state domain owned by one manager worker.
#[async_trait]
pub trait Domain: Send + 'static {
    /// Tagged union of every request this domain understands
    type Request: Send + 'static;

    /// Routing key of a request
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + 'static;

    fn kind(request: &Self::Request) -> Self::Kind;

    /// Runs once on the worker after the queue has been drained.
    async fn on_shutdown(&mut self) {}
}

/// Request handler registered for one request kind
pub type Handler<D> = Box<dyn FnMut(&mut D, <D as Domain>::Request) + Send>;

/// Table of handlers, keyed by request kind
pub struct Router<D: Domain> {
    handlers: HashMap<D::Kind, Handler<D>>,
}

impl<D: Domain> Router<D> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `kind`, replacing any earlier registration
    #[must_use]
    pub fn route<F>(mut self, kind: D::Kind, handler: F) -> Self
    where
        F: FnMut(&mut D, D::Request) + Send + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<D: Domain> Default for Router<D> {
    fn default() -> Self {
        Self::new()
    }
}

enum Envelope<R> {
    Request(R),
    Shutdown,
}

/// Handle to a domain worker.
///
/// Cloning is cheap; every clone feeds the same FIFO queue.
pub struct Manager<D: Domain> {
    name: &'static str,
    sender: mpsc::UnboundedSender<Envelope<D::Request>>,
    /// Guards the enqueue so that nothing can slip in behind the sentinel
    closed: Arc<RwLock<bool>>,
    done: watch::Receiver<bool>,
}

impl<D: Domain> Clone for Manager<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            sender: self.sender.clone(),
            closed: self.closed.clone(),
            done: self.done.clone(),
        }
    }
}

impl<D: Domain> fmt::Debug for Manager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<D: Domain> Manager<D> {
    /// Spawn the worker for `state` on the current tokio runtime
    pub fn spawn(name: &'static str, state: D, router: Router<D>) -> Self {
        Self::spawn_cyclic(name, |_| state, router)
    }

    /// Spawn a worker whose state needs a handle to its own queue
    /// (for example to re-enter it from a delayed task).
    pub fn spawn_cyclic<F>(name: &'static str, build: F, router: Router<D>) -> Self
    where
        F: FnOnce(Manager<D>) -> D,
    {
        let (sender, inbox) = mpsc::unbounded_channel();
        let (done_tx, done) = watch::channel(false);

        let manager = Self {
            name,
            sender,
            closed: Arc::new(RwLock::new(false)),
            done,
        };

        let state = build(manager.clone());
        tokio::spawn(listen(name, state, router, inbox, done_tx));

        manager
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a request.
    ///
    /// Never blocks. Fails with [`ManagerError::Closed`] once shutdown began,
    /// in which case no handler will ever see the request.
    pub fn submit(&self, request: D::Request) -> ManagerResult<()> {
        let closed = self.closed.read().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return Err(ManagerError::Closed(self.name));
        }

        self.sender
            .send(Envelope::Request(request))
            .map_err(|_| ManagerError::Closed(self.name))
    }

    /// Submit a request built around a fresh reply slot and wait for the
    /// handler to fill it.
    pub async fn request<T, F>(&self, build: F) -> ManagerResult<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> D::Request,
    {
        let (reply, response) = oneshot::channel();
        self.submit(build(reply))?;
        response.await.map_err(|_| ManagerError::NoReply(self.name))
    }

    /// Close the queue to new requests, let the worker drain everything that
    /// was already queued, and wait until it has exited.
    ///
    /// Safe to call more than once and from several tasks.
    pub async fn shutdown(&self) {
        {
            let mut closed = self.closed.write().unwrap_or_else(PoisonError::into_inner);
            if !*closed {
                *closed = true;
                info!("The {} manager is closed to new requests", self.name);
                // The worker may already be gone if every handle was dropped
                let _ = self.sender.send(Envelope::Shutdown);
            }
        }

        self.wait().await;
    }

    /// Wait until the worker has exited
    pub async fn wait(&self) {
        let mut done = self.done.clone();
        let _ = done.wait_for(|finished| *finished).await;
    }
}

async fn listen<D: Domain>(
    name: &'static str,
    mut state: D,
    mut router: Router<D>,
    mut inbox: mpsc::UnboundedReceiver<Envelope<D::Request>>,
    done: watch::Sender<bool>,
) {
    info!("The {name} manager is listening for requests");

    while let Some(envelope) = inbox.recv().await {
        let request = match envelope {
            Envelope::Request(request) => request,
            Envelope::Shutdown => break,
        };

        let kind = D::kind(&request);
        let Some(handler) = router.handlers.get_mut(&kind) else {
            error!("The {name} manager received an invalid request type of: {kind:?}");
            continue;
        };

        if catch_unwind(AssertUnwindSafe(|| handler(&mut state, request))).is_err() {
            error!("The {name} manager's handler for {kind:?} panicked; request dropped");
        }
    }

    debug!("The {name} manager drained its queue");
    state.on_shutdown().await;

    let _ = done.send(true);
    info!("The {name} manager has stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Log(Vec<u32>);

    enum LogRequest {
        Push(u32),
        Snapshot(oneshot::Sender<Vec<u32>>),
        Unrouted,
    }

    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    enum LogKind {
        Push,
        Snapshot,
        Unrouted,
    }

    impl Domain for Log {
        type Request = LogRequest;
        type Kind = LogKind;

        fn kind(request: &LogRequest) -> LogKind {
            match request {
                LogRequest::Push(_) => LogKind::Push,
                LogRequest::Snapshot(_) => LogKind::Snapshot,
                LogRequest::Unrouted => LogKind::Unrouted,
            }
        }
    }

    fn router() -> Router<Log> {
        Router::new()
            .route(LogKind::Push, |log: &mut Log, request| {
                if let LogRequest::Push(n) = request {
                    log.0.push(n);
                }
            })
            .route(LogKind::Snapshot, |log: &mut Log, request| {
                if let LogRequest::Snapshot(reply) = request {
                    let _ = reply.send(log.0.clone());
                }
            })
    }

    #[test]
    fn test_router_registration() {
        let router = router();
        assert_eq!(router.len(), 2);
        assert!(!router.is_empty());
        assert!(Router::<Log>::default().is_empty());
    }

    #[tokio::test]
    async fn test_requests_run_in_submission_order() {
        let manager = Manager::spawn("log", Log(Vec::new()), router());
        for n in 0..50 {
            manager.submit(LogRequest::Push(n)).unwrap();
        }

        let seen = manager.request(LogRequest::Snapshot).await.unwrap();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_unrouted_kind_does_not_stop_worker() {
        let manager = Manager::spawn("log", Log(Vec::new()), router());
        manager.submit(LogRequest::Unrouted).unwrap();
        manager.submit(LogRequest::Push(7)).unwrap();

        let seen = manager.request(LogRequest::Snapshot).await.unwrap();
        assert_eq!(seen, vec![7]);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let manager = Manager::spawn("log", Log(Vec::new()), router());
        manager.shutdown().await;

        assert!(manager.is_closed());
        assert_eq!(
            manager.submit(LogRequest::Push(1)),
            Err(ManagerError::Closed("log"))
        );
        assert_eq!(
            manager.request(LogRequest::Snapshot).await,
            Err(ManagerError::Closed("log"))
        );
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let manager = Manager::spawn("log", Log(Vec::new()), router());
        manager.shutdown().await;
        manager.shutdown().await;
        manager.wait().await;
    }
}
