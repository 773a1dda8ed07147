//! # Hanabi Live
//!
//! The backend core of a real-time, multi-table cooperative card game.
//!
//! Every piece of shared state lives in a *domain* (sessions, tables, chat)
//! owned by exactly one worker task. Callers never touch that state; they
//! enqueue requests on the domain's [`Manager`](actor::Manager), which runs
//! them one at a time in arrival order. The game rules themselves are a plain
//! synchronous state machine, [`Game`](game::Game), owned by the Tables
//! worker.
//!
//! ## Core Modules
//!
//! - [`actor`]: the generic serialized manager
//! - [`game`]: cards, variants, the rules engine, snapshots and views
//! - [`sessions`]: live connections and every push to users
//! - [`table`]: the tables registry and turn timers
//! - [`chat`]: per-room chat history
//! - [`commands`]: parsing and routing of client commands
//! - [`store`] and [`stats`]: the persistence contract and aggregates
//!
//! ## Example
//!
//! ```
//! use hanabi_live::{CoreConfig, Dispatcher, store::MemoryStore};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = CoreConfig::default();
//! let store = Arc::new(MemoryStore::new(config.variants.clone()));
//! let dispatcher = Dispatcher::start(config, store);
//!
//! assert!(dispatcher.tables.get_tables().await.unwrap().is_empty());
//! dispatcher.shutdown().await;
//! # }
//! ```

pub mod actor;
pub mod chat;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod game;
pub mod sessions;
pub mod stats;
pub mod store;
pub mod table;

pub use config::CoreConfig;
pub use dispatcher::Dispatcher;
pub use sessions::UserId;
