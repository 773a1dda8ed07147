//! Sessions registry.
//!
//! Owns every live connection and is the only path through which the rest
//! of the server pushes notifications to users. Pushes to users without a
//! live connection are dropped.

pub mod messages;
pub mod models;
pub mod registry;

pub use messages::{SessionsRequest, SessionsRequestKind};
pub use models::{
    Connection, Notification, Session, SessionData, Status, UserDescription, UserId,
};
pub use registry::{Sessions, SessionsManager};
