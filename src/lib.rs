//! OnBoard - live driver status.
//!
//! One driver publishes a waypoint status; any number of viewers poll it.

pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod poller;
pub mod server;
pub mod service;
pub mod store;
