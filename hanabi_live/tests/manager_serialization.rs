//! Integration tests for the generic serialized manager.
//!
//! Covers one-at-a-time execution under concurrent submitters, per-submitter
//! ordering, the close/drain handshake, panicking handlers and dropped
//! replies.

use async_trait::async_trait;
use hanabi_live::actor::{Domain, Manager, ManagerError, Router};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::oneshot;

/// Records every job it runs and how many handlers were ever inside at once.
struct Recorder {
    seen: Vec<u64>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    /// Filled by `on_shutdown` with everything that ran
    drained: Arc<Mutex<Vec<u64>>>,
}

enum RecorderRequest {
    Work(u64),
    Panic,
    Forget(oneshot::Sender<()>),
    Seen(oneshot::Sender<Vec<u64>>),
    Unrouted,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum RecorderKind {
    Work,
    Panic,
    Forget,
    Seen,
    Unrouted,
}

#[async_trait]
impl Domain for Recorder {
    type Request = RecorderRequest;
    type Kind = RecorderKind;

    fn kind(request: &RecorderRequest) -> RecorderKind {
        match request {
            RecorderRequest::Work(_) => RecorderKind::Work,
            RecorderRequest::Panic => RecorderKind::Panic,
            RecorderRequest::Forget(_) => RecorderKind::Forget,
            RecorderRequest::Seen(_) => RecorderKind::Seen,
            RecorderRequest::Unrouted => RecorderKind::Unrouted,
        }
    }

    async fn on_shutdown(&mut self) {
        self.drained.lock().unwrap().extend(self.seen.iter().copied());
    }
}

struct Counters {
    max_active: Arc<AtomicUsize>,
    drained: Arc<Mutex<Vec<u64>>>,
}

/// Spawn a recorder with every kind but `Unrouted` registered.
fn spawn_recorder() -> (Manager<Recorder>, Counters) {
    let max_active = Arc::new(AtomicUsize::new(0));
    let drained = Arc::new(Mutex::new(Vec::new()));
    let state = Recorder {
        seen: Vec::new(),
        active: Arc::new(AtomicUsize::new(0)),
        max_active: max_active.clone(),
        drained: drained.clone(),
    };

    let router = Router::new()
        .route(RecorderKind::Work, |recorder: &mut Recorder, request| {
            let RecorderRequest::Work(job) = request else {
                return;
            };
            let now = recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
            recorder.max_active.fetch_max(now, Ordering::SeqCst);
            for _ in 0..100 {
                std::hint::spin_loop();
            }
            recorder.seen.push(job);
            recorder.active.fetch_sub(1, Ordering::SeqCst);
        })
        .route(RecorderKind::Panic, |_: &mut Recorder, _| {
            panic!("handler blew up");
        })
        .route(RecorderKind::Forget, |_: &mut Recorder, request| {
            // Drop the reply slot without answering
            drop(request);
        })
        .route(RecorderKind::Seen, |recorder: &mut Recorder, request| {
            if let RecorderRequest::Seen(reply) = request {
                let _ = reply.send(recorder.seen.clone());
            }
        });

    let manager = Manager::spawn("recorder", state, router);
    (
        manager,
        Counters {
            max_active,
            drained,
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submitters_are_serialized() {
    let (manager, counters) = spawn_recorder();

    let mut submitters = Vec::new();
    for submitter in 0..8u64 {
        let manager = manager.clone();
        submitters.push(tokio::spawn(async move {
            for i in 0..200u64 {
                manager
                    .submit(RecorderRequest::Work(submitter * 1_000 + i))
                    .unwrap();
                if i % 16 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for submitter in submitters {
        submitter.await.unwrap();
    }

    let seen = manager.request(RecorderRequest::Seen).await.unwrap();
    assert_eq!(seen.len(), 8 * 200);
    assert_eq!(counters.max_active.load(Ordering::SeqCst), 1);

    // Each submitter's own jobs ran in the order it sent them
    for submitter in 0..8u64 {
        let mine: Vec<u64> = seen
            .iter()
            .copied()
            .filter(|job| job / 1_000 == submitter)
            .collect();
        let expected: Vec<u64> = (0..200).map(|i| submitter * 1_000 + i).collect();
        assert_eq!(mine, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_accepted_request_runs_before_shutdown_completes() {
    let (manager, counters) = spawn_recorder();

    let mut submitters = Vec::new();
    for submitter in 0..4u64 {
        let manager = manager.clone();
        submitters.push(tokio::spawn(async move {
            let mut accepted = 0usize;
            for i in 0.. {
                match manager.submit(RecorderRequest::Work(submitter * 1_000_000 + i)) {
                    Ok(()) => accepted += 1,
                    Err(e) => {
                        assert_eq!(e, ManagerError::Closed("recorder"));
                        break;
                    }
                }
                tokio::task::yield_now().await;
            }
            accepted
        }));
    }

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    manager.shutdown().await;

    let mut accepted = 0;
    for submitter in submitters {
        accepted += submitter.await.unwrap();
    }

    // Nothing slipped in behind the drain sentinel and nothing was lost
    assert!(accepted > 0);
    assert_eq!(counters.drained.lock().unwrap().len(), accepted);
}

#[tokio::test]
async fn test_requests_fail_closed_after_shutdown() {
    let (manager, counters) = spawn_recorder();
    manager.submit(RecorderRequest::Work(1)).unwrap();
    manager.shutdown().await;

    assert!(manager.is_closed());
    assert_eq!(*counters.drained.lock().unwrap(), vec![1]);
    assert_eq!(
        manager.submit(RecorderRequest::Work(2)),
        Err(ManagerError::Closed("recorder"))
    );
    assert_eq!(
        manager.request(RecorderRequest::Seen).await,
        Err(ManagerError::Closed("recorder"))
    );

    // A second shutdown returns immediately
    manager.shutdown().await;
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_worker() {
    let (manager, _counters) = spawn_recorder();
    manager.submit(RecorderRequest::Work(1)).unwrap();
    manager.submit(RecorderRequest::Panic).unwrap();
    manager.submit(RecorderRequest::Work(2)).unwrap();

    let seen = manager.request(RecorderRequest::Seen).await.unwrap();
    assert_eq!(seen, vec![1, 2]);
}

#[tokio::test]
async fn test_unrouted_kind_is_skipped() {
    let (manager, _counters) = spawn_recorder();
    manager.submit(RecorderRequest::Unrouted).unwrap();
    manager.submit(RecorderRequest::Work(9)).unwrap();

    let seen = manager.request(RecorderRequest::Seen).await.unwrap();
    assert_eq!(seen, vec![9]);
}

#[tokio::test]
async fn test_dropped_reply_is_reported() {
    let (manager, _counters) = spawn_recorder();
    assert_eq!(
        manager.request(RecorderRequest::Forget).await,
        Err(ManagerError::NoReply("recorder"))
    );

    // The worker is still alive
    assert!(manager.request(RecorderRequest::Seen).await.is_ok());
}
