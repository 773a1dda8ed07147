//! Tables registry.
//!
//! This module implements:
//! - Tables: the serialized domain that owns every table and its game
//! - Table options, Argon2 table passwords and validation
//! - Join/leave/spectate lifecycle, replays, hypotheticals and tags
//! - Table chat rooms, typing indicators and card notes
//! - Restoring tables archived at shutdown
//! - Turn timers with post-wake revalidation
//!
//! ## Architecture
//!
//! One worker owns the whole collection. Handlers never lock anything; they
//! mutate tables in place and talk to users only by enqueuing requests on
//! the Sessions queue. A turn timer is a detached task that sleeps and then
//! re-enters the Tables queue with the token it was armed with.

pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod models;
pub mod timer;

pub use config::TableOptions;
pub use errors::{TableError, TableResult};
pub use manager::{Tables, TablesManager};
pub use messages::{HypotheticalOp, TableAction, TablesRequest, TablesRequestKind};
pub use models::{
    CardNote, Spectator, Table, TableDescription, TableId, TablePlayer, UserTables,
};
pub use timer::{TimerToken, TurnClock};
