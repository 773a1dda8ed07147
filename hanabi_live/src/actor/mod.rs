//! Serialized state managers.
//!
//! Every state domain (sessions, tables, chat) is owned by exactly one worker
//! task. Callers never touch the state directly: they submit a typed request
//! to the domain's queue and the worker runs the registered handler with
//! exclusive access to the state. Requests to one domain execute one at a
//! time, in arrival order.
//!
//! ## Example
//!
//! ```
//! use hanabi_live::actor::{Domain, Manager, Router};
//! use tokio::sync::oneshot;
//!
//! #[derive(Default)]
//! struct Counter(u64);
//!
//! enum CounterRequest {
//!     Add(u64),
//!     Get(oneshot::Sender<u64>),
//! }
//!
//! #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
//! enum CounterKind {
//!     Add,
//!     Get,
//! }
//!
//! impl Domain for Counter {
//!     type Request = CounterRequest;
//!     type Kind = CounterKind;
//!
//!     fn kind(request: &CounterRequest) -> CounterKind {
//!         match request {
//!             CounterRequest::Add(_) => CounterKind::Add,
//!             CounterRequest::Get(_) => CounterKind::Get,
//!         }
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let router = Router::new()
//!     .route(CounterKind::Add, |counter: &mut Counter, request| {
//!         if let CounterRequest::Add(n) = request {
//!             counter.0 += n;
//!         }
//!     })
//!     .route(CounterKind::Get, |counter: &mut Counter, request| {
//!         if let CounterRequest::Get(reply) = request {
//!             let _ = reply.send(counter.0);
//!         }
//!     });
//!
//! let manager = Manager::spawn("counter", Counter::default(), router);
//! manager.submit(CounterRequest::Add(2)).unwrap();
//! assert_eq!(manager.request(CounterRequest::Get).await.unwrap(), 2);
//!
//! manager.shutdown().await;
//! assert!(manager.submit(CounterRequest::Add(1)).is_err());
//! # }
//! ```

pub mod errors;
pub mod manager;

pub use errors::{ManagerError, ManagerResult};
pub use manager::{Domain, Handler, Manager, Router};
