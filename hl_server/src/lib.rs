//! HTTP/WebSocket front end of the Hanabi Live server.
//!
//! The binary wires these modules around a [`hanabi_live::Dispatcher`]; they
//! are exposed as a library so the router can be driven from tests.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
